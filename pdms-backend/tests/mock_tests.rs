use pdms_backend::mock::MockBackend;
use pdms_backend::{BackendError, PdmsBackend};
use pdms_model::{Function, FunctionKind, Material, SyncBatch, UpstreamRecord};
use pdms_types::{
    CompoundKey, DocumentId, EntityKind, FunctionId, MaterialId, ProjectId, ResolveError, ShapeId,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn zone(id: i32) -> Function {
    Function {
        id: FunctionId::new(id),
        parent_id: None,
        project_id: ProjectId::new(1),
        kind: FunctionKind::Zone,
        code: format!("Z-{id}"),
        name: format!("Zone {id}"),
        description: None,
    }
}

fn material(id: i32, code: &str) -> Material {
    Material {
        id: MaterialId::new(id),
        code: code.to_string(),
        name: code.to_lowercase(),
        description: None,
        category: None,
    }
}

fn key(shape: u32) -> CompoundKey {
    CompoundKey::new(DocumentId::new(1), ShapeId::new(shape))
}

// ── Fetches ─────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_counts_per_lookup() {
    let backend = MockBackend::new();
    backend.insert_function(zone(1));
    backend.insert_material(material(10, "M-10"));

    assert!(backend.fetch_function(FunctionId::new(1)).await.unwrap().is_some());
    assert!(backend.fetch_function(FunctionId::new(1)).await.unwrap().is_some());
    assert!(backend.fetch_function(FunctionId::new(2)).await.unwrap().is_none());
    let by_code = backend.fetch_material_by_code("M-10").await.unwrap();

    assert_eq!(by_code.map(|m| m.id), Some(MaterialId::new(10)));
    assert_eq!(backend.fetch_count("function:1"), 2);
    assert_eq!(backend.fetch_count("function:2"), 1);
    assert_eq!(backend.fetch_count("material-code:M-10"), 1);
    assert_eq!(backend.total_fetches(), 4);
}

#[tokio::test]
async fn injected_fetch_failure_is_returned_and_clearable() {
    let backend = MockBackend::new();
    backend.insert_function(zone(1));
    backend.fail_fetches(Some(BackendError::Timeout));

    let err = backend.fetch_function(FunctionId::new(1)).await.unwrap_err();
    assert_eq!(err, BackendError::Timeout);

    backend.fail_fetches(None);
    assert!(backend.fetch_function(FunctionId::new(1)).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn fetch_delay_is_applied() {
    let backend = MockBackend::new();
    backend.delay_fetches(Some(Duration::from_secs(5)));

    let start = tokio::time::Instant::now();
    backend.fetch_project(ProjectId::new(1)).await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(5));
}

// ── Submissions ─────────────────────────────────────────────────

#[tokio::test]
async fn submit_assigns_ids_to_new_functions() {
    let backend = MockBackend::new();
    backend.insert_function(zone(20));

    let mut batch = SyncBatch::new(Some(ProjectId::new(1)));
    batch.push(
        key(5),
        UpstreamRecord::Function {
            function_id: None,
            parent_id: Some(FunctionId::new(20)),
            kind: FunctionKind::Group,
            code: "G-1".to_string(),
            name: "Group one".to_string(),
            description: None,
        },
    );

    let ack = backend.submit_batch(&batch).await.unwrap();
    let assigned = ack.accepted_for(&key(5)).and_then(|a| a.function_id).unwrap();

    assert_eq!(assigned, FunctionId::new(21));
    assert_eq!(backend.function(assigned).unwrap().parent_id, Some(FunctionId::new(20)));
    assert_eq!(ack.changed[0].kind, EntityKind::Function);
    assert_eq!(ack.changed[0].id, 21);
    assert_eq!(backend.submissions().len(), 1);
}

#[tokio::test]
async fn submit_rejects_unknown_targets() {
    let backend = MockBackend::new();

    let mut batch = SyncBatch::new(None);
    batch.push(
        key(1),
        UpstreamRecord::Function {
            function_id: Some(FunctionId::new(77)),
            parent_id: None,
            kind: FunctionKind::Unit,
            code: "U".to_string(),
            name: "Unit".to_string(),
            description: None,
        },
    );
    batch.push(
        key(2),
        UpstreamRecord::ZoneMaterials {
            zone_id: FunctionId::new(3),
            material_ids: vec![MaterialId::new(1)],
        },
    );

    let ack = backend.submit_batch(&batch).await.unwrap();
    assert!(ack.accepted.is_empty());
    assert_eq!(ack.rejected.len(), 2);
    assert_eq!(ack.rejected[1].key, key(2));
}

#[tokio::test]
async fn submit_stores_zone_materials() {
    let backend = MockBackend::new();
    backend.insert_function(zone(4));

    let mut batch = SyncBatch::new(None);
    batch.push(
        key(9),
        UpstreamRecord::ZoneMaterials {
            zone_id: FunctionId::new(4),
            material_ids: vec![MaterialId::new(1), MaterialId::new(2)],
        },
    );

    let ack = backend.submit_batch(&batch).await.unwrap();
    assert_eq!(ack.accepted.len(), 1);
    assert_eq!(
        backend.zone_materials(FunctionId::new(4)),
        vec![MaterialId::new(1), MaterialId::new(2)]
    );
}

#[tokio::test]
async fn failed_submission_is_still_recorded() {
    let backend = MockBackend::new();
    backend.fail_submissions(Some(BackendError::Network("reset".to_string())));

    let err = backend.submit_batch(&SyncBatch::new(None)).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(backend.submissions().len(), 1);
}

// ── Error mapping ───────────────────────────────────────────────

#[test]
fn backend_errors_map_to_resolve_errors() {
    assert_eq!(
        ResolveError::from(BackendError::Malformed("bad".to_string())),
        ResolveError::Malformed("bad".to_string())
    );
    assert!(matches!(
        ResolveError::from(BackendError::Timeout),
        ResolveError::Transport(_)
    ));
}
