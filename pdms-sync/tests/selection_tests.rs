use pdms_sync::memory::MemoryDocument;
use pdms_sync::{select, DocumentError, HostDocument};
use pdms_types::{CompoundKey, DocumentId, PropertyValue, ShapeId};
use pretty_assertions::assert_eq;

fn key(shape: u32) -> CompoundKey {
    CompoundKey::new(DocumentId::new(1), ShapeId::new(shape))
}

fn document_with(shapes: &[u32]) -> MemoryDocument {
    let document = MemoryDocument::new();
    for shape in shapes {
        document.add_shape(
            key(*shape),
            "FunctionGroup",
            [("FunctionCode", PropertyValue::from(format!("G-{shape}")))],
        );
    }
    document
}

#[tokio::test]
async fn select_focuses_first_key() {
    let document = document_with(&[1, 2, 3]);

    select(&document, &[key(3), key(1)]).await.unwrap();

    assert_eq!(document.current_selection().await, vec![key(3), key(1)]);
}

#[tokio::test]
async fn select_nested_shape() {
    let document = MemoryDocument::new();
    let nested = key(1).child(ShapeId::new(9));
    document.add_shape(nested.clone(), "Material", Vec::<(String, PropertyValue)>::new());

    select(&document, &[nested.clone()]).await.unwrap();
    assert_eq!(document.selection(), vec![nested]);
}

#[tokio::test]
async fn missing_key_fails_whole_selection() {
    let document = document_with(&[1]);
    document.set_selection(vec![key(1)]);

    let err = select(&document, &[key(1), key(2)]).await.unwrap_err();

    assert_eq!(err, DocumentError::ShapeNotFound { key: key(2) });
    assert_eq!(document.selection(), vec![key(1)]);
}

#[tokio::test]
async fn empty_selection_is_rejected() {
    let document = document_with(&[1]);
    let err = select(&document, &[]).await.unwrap_err();
    assert_eq!(err, DocumentError::EmptySelection);
}

#[tokio::test]
async fn removed_shape_leaves_selection() {
    let document = document_with(&[1, 2]);
    select(&document, &[key(1), key(2)]).await.unwrap();

    document.remove_shape(&key(1));

    assert_eq!(document.selection(), vec![key(2)]);
    assert!(!document.contains_shape(&key(1)).await);
}
