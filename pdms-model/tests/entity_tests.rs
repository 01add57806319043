use pdms_model::{Function, FunctionKind, Material, Project, RemoteEntity};
use pdms_tree::{Hierarchy, TreeNode};
use pdms_types::{EntityKind, FunctionId, MaterialId, ProjectId, RecordId};
use pretty_assertions::assert_eq;
use serde_json::json;

fn function(id: i32, parent: Option<i32>, kind: FunctionKind) -> Function {
    Function {
        id: FunctionId::new(id),
        parent_id: parent.map(FunctionId::new),
        project_id: ProjectId::new(1),
        kind,
        code: format!("F{id}"),
        name: format!("Function {id}"),
        description: None,
    }
}

#[test]
fn function_deserializes_with_optional_fields_missing() {
    let f: Function = serde_json::from_value(json!({
        "id": 7,
        "project_id": 1,
        "kind": "zone",
        "code": "Z01",
        "name": "Water treatment"
    }))
    .unwrap();

    assert_eq!(f.id, FunctionId::new(7));
    assert_eq!(f.parent_id, None);
    assert!(f.is_zone());
    assert_eq!(f.description, None);
}

#[test]
fn material_lookup_keys() {
    let m = Material {
        id: MaterialId::new(100),
        code: "M-100".into(),
        name: "Centrifugal pump".into(),
        description: None,
        category: Some("Pumps".into()),
    };
    assert_eq!(RemoteEntity::id(&m), MaterialId::new(100));
    assert_eq!(m.code(), Some("M-100"));
    assert_eq!(<Material as RemoteEntity>::Id::KIND, EntityKind::Material);
}

#[test]
fn project_has_no_code_lookup() {
    let p = Project {
        id: ProjectId::new(3),
        code: "P3".into(),
        name: "Plant 3".into(),
        description: None,
    };
    assert_eq!(p.code(), None);
    assert_eq!(TreeNode::parent_id(&p), None);
    assert_eq!(p.node_name(), "Plant 3");
}

#[test]
fn functions_form_a_hierarchy() {
    let tree = Hierarchy::build(vec![
        function(3, Some(2), FunctionKind::Element),
        function(1, None, FunctionKind::Zone),
        function(2, Some(1), FunctionKind::Group),
    ])
    .unwrap();

    let lineage: Vec<_> = tree.ancestors(&FunctionId::new(3)).iter().map(|f| f.kind).collect();
    assert_eq!(lineage, vec![FunctionKind::Group, FunctionKind::Zone]);
    assert_eq!(tree.roots()[0].node_name(), "Function 1");
}

#[test]
fn function_kind_display() {
    assert_eq!(FunctionKind::Instrument.to_string(), "instrument");
    assert_eq!(serde_json::to_value(FunctionKind::Group).unwrap(), json!("group"));
}
