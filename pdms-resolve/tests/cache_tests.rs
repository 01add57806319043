use pdms_model::{ChangedRecord, Function, FunctionKind, Material, Project};
use pdms_resolve::{CacheKey, CachedRecord, ResolveCache};
use pdms_types::{EntityKind, FunctionId, MaterialId, ProjectId, ResolveResult};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

fn function_record(id: i32) -> CachedRecord {
    CachedRecord::Function(Function {
        id: FunctionId::new(id),
        parent_id: None,
        project_id: ProjectId::new(1),
        kind: FunctionKind::Zone,
        code: format!("Z{id}"),
        name: format!("Zone {id}"),
        description: None,
    })
}

fn material_record(id: i32, code: &str) -> CachedRecord {
    CachedRecord::Material(Material {
        id: MaterialId::new(id),
        code: code.to_string(),
        name: code.to_string(),
        description: None,
        category: None,
    })
}

fn project_record(id: i32) -> CachedRecord {
    CachedRecord::Project(Project {
        id: ProjectId::new(id),
        code: format!("P{id}"),
        name: format!("Project {id}"),
        description: None,
    })
}

async fn seed(cache: &ResolveCache, record: CachedRecord) {
    let key = CacheKey::id(record.kind(), record.raw_id());
    let outcome = cache
        .get_or_fetch(key, TIMEOUT, move || async move { Ok(Some(record)) })
        .await;
    assert!(outcome.is_found());
}

// ── Keys ────────────────────────────────────────────────────────

#[test]
fn cache_key_display() {
    assert_eq!(CacheKey::id(EntityKind::Function, 7).to_string(), "function:7");
    assert_eq!(
        CacheKey::code(EntityKind::Material, "M-1").to_string(),
        "material-code:M-1"
    );
}

#[test]
fn cache_keys_compare_by_kind_and_lookup() {
    assert_eq!(
        CacheKey::id(EntityKind::Function, 1),
        CacheKey::id(EntityKind::Function, 1)
    );
    assert_ne!(
        CacheKey::id(EntityKind::Function, 1),
        CacheKey::id(EntityKind::Project, 1)
    );
}

// ── Invalidation ────────────────────────────────────────────────

#[tokio::test]
async fn invalidate_removes_only_that_record() {
    let cache = ResolveCache::new();
    seed(&cache, function_record(1)).await;
    seed(&cache, function_record(2)).await;

    assert!(cache.invalidate(EntityKind::Function, 1));
    assert!(!cache.invalidate(EntityKind::Function, 1));
    assert_eq!(cache.len(), 1);
    assert!(cache.peek(&CacheKey::id(EntityKind::Function, 2)).is_some());
}

#[tokio::test]
async fn invalidate_kind_keeps_other_kinds() {
    let cache = ResolveCache::new();
    seed(&cache, function_record(1)).await;
    seed(&cache, project_record(1)).await;

    cache.invalidate_kind(EntityKind::Function);

    assert_eq!(cache.len(), 1);
    assert!(cache.peek(&CacheKey::id(EntityKind::Project, 1)).is_some());
}

#[tokio::test]
async fn invalidate_changed_reports_cached_records() {
    let cache = ResolveCache::new();
    seed(&cache, function_record(1)).await;

    let dropped = cache.invalidate_changed(&[
        ChangedRecord {
            kind: EntityKind::Function,
            id: 1,
        },
        ChangedRecord {
            kind: EntityKind::Function,
            id: 2,
        },
    ]);

    assert_eq!(
        dropped,
        vec![ChangedRecord {
            kind: EntityKind::Function,
            id: 1
        }]
    );
    assert!(cache.is_empty());
}

#[tokio::test]
async fn clear_empties_cache() {
    let cache = ResolveCache::new();
    seed(&cache, function_record(1)).await;
    seed(&cache, project_record(2)).await;

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.stats().entries, 0);
}

#[tokio::test(start_paused = true)]
async fn invalidation_during_fetch_discards_stale_result() {
    let cache = Arc::new(ResolveCache::new());
    let key = CacheKey::id(EntityKind::Function, 5);

    let fetch = tokio::spawn({
        let cache = Arc::clone(&cache);
        let key = key.clone();
        async move {
            cache
                .get_or_fetch(key, TIMEOUT, || async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(Some(function_record(5)))
                })
                .await
        }
    });
    tokio::task::yield_now().await;
    assert_eq!(cache.in_flight_count(), 1);

    cache.invalidate(EntityKind::Function, 5);
    let outcome = fetch.await.unwrap();

    assert!(outcome.is_found());
    assert!(cache.peek(&key).is_none());
}

#[tokio::test(start_paused = true)]
async fn invalidating_a_material_discards_code_fetch_in_flight() {
    let cache = Arc::new(ResolveCache::new());
    let by_code = CacheKey::code(EntityKind::Material, "M-10");
    let by_id = CacheKey::id(EntityKind::Material, 10);

    let fetch = tokio::spawn({
        let cache = Arc::clone(&cache);
        let key = by_code.clone();
        async move {
            cache
                .get_or_fetch(key, TIMEOUT, || async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(Some(material_record(10, "M-10")))
                })
                .await
        }
    });
    tokio::task::yield_now().await;
    assert_eq!(cache.in_flight_count(), 1);

    cache.invalidate(EntityKind::Material, 10);
    assert_eq!(cache.in_flight_count(), 0);
    let outcome = fetch.await.unwrap();

    assert!(outcome.is_found());
    assert!(cache.peek(&by_code).is_none());
    assert!(cache.peek(&by_id).is_none());
}

#[tokio::test(start_paused = true)]
async fn invalidating_a_material_keeps_other_kinds_in_flight() {
    let cache = Arc::new(ResolveCache::new());
    let key = CacheKey::id(EntityKind::Function, 10);

    let fetch = tokio::spawn({
        let cache = Arc::clone(&cache);
        let key = key.clone();
        async move {
            cache
                .get_or_fetch(key, TIMEOUT, || async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(Some(function_record(10)))
                })
                .await
        }
    });
    tokio::task::yield_now().await;

    cache.invalidate(EntityKind::Material, 10);
    assert_eq!(cache.in_flight_count(), 1);
    fetch.await.unwrap();
    assert!(cache.peek(&key).is_some());
}

// ── Stats ───────────────────────────────────────────────────────

#[tokio::test]
async fn stats_track_hits_and_misses() {
    let cache = ResolveCache::new();
    let key = CacheKey::id(EntityKind::Project, 3);

    for _ in 0..3 {
        cache
            .get_or_fetch(key.clone(), TIMEOUT, || async { Ok(Some(project_record(3))) })
            .await;
    }
    let missing = cache
        .get_or_fetch(CacheKey::id(EntityKind::Project, 4), TIMEOUT, || async {
            Ok(None)
        })
        .await;

    assert_eq!(missing, ResolveResult::NotFound);
    let stats = cache.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.in_flight, 0);
}
