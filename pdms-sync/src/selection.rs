use crate::document::HostDocument;
use crate::error::{DocumentError, DocumentResult};
use pdms_types::CompoundKey;
use tracing::debug;

/// Selects the shapes behind `keys` and focuses the view on the first.
///
/// All-or-nothing: every key is checked before the selection is touched,
/// and the first key that does not address a shape fails the call with
/// `ShapeNotFound`.
pub async fn select(document: &dyn HostDocument, keys: &[CompoundKey]) -> DocumentResult<()> {
    if keys.is_empty() {
        return Err(DocumentError::EmptySelection);
    }
    for key in keys {
        if !document.contains_shape(key).await {
            debug!(key = %key, "Selection target missing");
            return Err(DocumentError::ShapeNotFound { key: key.clone() });
        }
    }
    document.select(keys).await?;
    debug!(count = keys.len(), first = %keys[0], "Selected shapes");
    Ok(())
}
