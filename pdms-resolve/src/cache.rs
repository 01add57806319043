//! Process-wide record cache with single-flight fetching.
//!
//! Every lookup goes through [`ResolveCache::get_or_fetch`]:
//!
//! 1. A cached record is returned without touching the backend.
//! 2. If a fetch for the same key is already outstanding, the caller
//!    subscribes to its outcome instead of starting another one.
//! 3. Otherwise the caller becomes the leader: it registers the key as in
//!    flight, runs the fetch under a timeout and broadcasts the outcome.
//!
//! Only `Found` outcomes are stored. `NotFound` and errors are delivered to
//! everyone waiting at that moment and then forgotten, so the next call
//! fetches again.
//!
//! The lock is never held across an await point.

use pdms_backend::BackendResult;
use pdms_model::{ChangedRecord, Function, Material, Project};
use pdms_types::{EntityKind, ResolveError, ResolveResult};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// How a record is addressed in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lookup {
    Id(i32),
    Code(String),
}

/// Cache key: record kind plus id or code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: EntityKind,
    pub lookup: Lookup,
}

impl CacheKey {
    pub fn id(kind: EntityKind, id: i32) -> Self {
        Self {
            kind,
            lookup: Lookup::Id(id),
        }
    }

    pub fn code(kind: EntityKind, code: impl Into<String>) -> Self {
        Self {
            kind,
            lookup: Lookup::Code(code.into()),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lookup {
            Lookup::Id(id) => write!(f, "{}:{id}", self.kind),
            Lookup::Code(code) => write!(f, "{}-code:{code}", self.kind),
        }
    }
}

/// A cached backend record of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedRecord {
    Function(Function),
    Material(Material),
    Project(Project),
}

impl CachedRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Function(_) => EntityKind::Function,
            Self::Material(_) => EntityKind::Material,
            Self::Project(_) => EntityKind::Project,
        }
    }

    pub fn raw_id(&self) -> i32 {
        match self {
            Self::Function(f) => f.id.get(),
            Self::Material(m) => m.id.get(),
            Self::Project(p) => p.id.get(),
        }
    }

    /// Every key this record is reachable under. Materials are also
    /// addressable by code.
    fn keys(&self) -> Vec<CacheKey> {
        let mut keys = vec![CacheKey::id(self.kind(), self.raw_id())];
        if let Self::Material(m) = self {
            keys.push(CacheKey::code(EntityKind::Material, m.code.clone()));
        }
        keys
    }
}

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub entries: usize,
    pub in_flight: usize,
}

type Outcome = ResolveResult<CachedRecord>;

struct Flight {
    id: u64,
    tx: broadcast::Sender<Outcome>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, CachedRecord>,
    in_flight: HashMap<CacheKey, Flight>,
    next_flight: u64,
    hits: u64,
    misses: u64,
    coalesced: u64,
}

enum Slot {
    Hit(CachedRecord),
    Wait(broadcast::Receiver<Outcome>),
    Lead(u64, broadcast::Sender<Outcome>),
}

/// Shared record cache. Create one per process (or per test) and hand it to
/// every resolver.
#[derive(Default)]
pub struct ResolveCache {
    inner: Mutex<Inner>,
}

impl ResolveCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the cached record for `key`, fetching it at most once across
    /// concurrent callers.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, timeout: Duration, fetch: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BackendResult<Option<CachedRecord>>>,
    {
        let slot = {
            let mut inner = self.lock();
            if let Some(record) = inner.entries.get(&key).cloned() {
                inner.hits += 1;
                Slot::Hit(record)
            } else if let Some(flight) = inner.in_flight.get(&key) {
                let rx = flight.tx.subscribe();
                inner.coalesced += 1;
                Slot::Wait(rx)
            } else {
                inner.misses += 1;
                inner.next_flight += 1;
                let id = inner.next_flight;
                let (tx, _) = broadcast::channel(1);
                inner.in_flight.insert(
                    key.clone(),
                    Flight {
                        id,
                        tx: tx.clone(),
                    },
                );
                Slot::Lead(id, tx)
            }
        };

        match slot {
            Slot::Hit(record) => {
                trace!(key = %key, "Cache hit");
                ResolveResult::Found(record)
            }
            Slot::Wait(mut rx) => {
                debug!(key = %key, "Joining in-flight fetch");
                match rx.recv().await {
                    Ok(outcome) => outcome,
                    Err(_) => ResolveResult::Error(ResolveError::Abandoned),
                }
            }
            Slot::Lead(flight, tx) => {
                let mut guard = FlightGuard {
                    cache: self,
                    key: Some(key.clone()),
                    flight,
                };
                debug!(key = %key, "Fetching from backend");

                let outcome = match tokio::time::timeout(timeout, fetch()).await {
                    Ok(Ok(Some(record))) => ResolveResult::Found(record),
                    Ok(Ok(None)) => ResolveResult::NotFound,
                    Ok(Err(err)) => {
                        warn!(key = %key, error = %err, "Backend fetch failed");
                        ResolveResult::Error(err.into())
                    }
                    Err(_) => {
                        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                        warn!(key = %key, timeout_ms = ms, "Backend fetch timed out");
                        ResolveResult::Error(ResolveError::Timeout(ms))
                    }
                };

                guard.key = None;
                self.complete(&key, flight, &outcome);
                let _ = tx.send(outcome.clone());
                outcome
            }
        }
    }

    /// Ends a flight: stores a found record and unregisters the key, unless
    /// the key was invalidated while the fetch was outstanding.
    fn complete(&self, key: &CacheKey, flight: u64, outcome: &Outcome) {
        let mut inner = self.lock();
        let current = inner.in_flight.get(key).is_some_and(|f| f.id == flight);
        if !current {
            debug!(key = %key, "Discarding result of invalidated fetch");
            return;
        }
        inner.in_flight.remove(key);
        if let ResolveResult::Found(record) = outcome {
            for alias in record.keys() {
                inner.entries.insert(alias, record.clone());
            }
            inner.entries.insert(key.clone(), record.clone());
        }
    }

    /// Returns the cached record, if any, without fetching.
    pub fn peek(&self, key: &CacheKey) -> Option<CachedRecord> {
        self.lock().entries.get(key).cloned()
    }

    /// Drops the record with this id, together with any alias (such as a
    /// material code) pointing at it. Returns whether anything was removed.
    ///
    /// Fetches still outstanding for the record, or for any code of the same
    /// kind, complete for their callers but are not cached.
    pub fn invalidate(&self, kind: EntityKind, id: i32) -> bool {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|k, record| !(k.kind == kind && record.raw_id() == id));
        // A code lookup in flight may be for this record; its id is not
        // known until it lands, so all of them are let go.
        inner.in_flight.retain(|k, _| {
            k.kind != kind
                || match &k.lookup {
                    Lookup::Id(other) => *other != id,
                    Lookup::Code(_) => false,
                }
        });
        let removed = inner.entries.len() != before;
        if removed {
            debug!(kind = %kind, id, "Invalidated cache entry");
        }
        removed
    }

    /// Drops the record cached under a code, and its id entry.
    pub fn invalidate_code(&self, kind: EntityKind, code: &str) -> bool {
        let key = CacheKey::code(kind, code);
        let id = {
            let mut inner = self.lock();
            inner.in_flight.remove(&key);
            match inner.entries.get(&key) {
                Some(record) => record.raw_id(),
                None => return false,
            }
        };
        self.invalidate(kind, id)
    }

    /// Drops every record of one kind.
    pub fn invalidate_kind(&self, kind: EntityKind) {
        let mut inner = self.lock();
        inner.entries.retain(|k, _| k.kind != kind);
        inner.in_flight.retain(|k, _| k.kind != kind);
        debug!(kind = %kind, "Invalidated all entries of kind");
    }

    /// Drops every record the backend reported as changed. Returns the
    /// records that were actually cached.
    pub fn invalidate_changed(&self, changed: &[ChangedRecord]) -> Vec<ChangedRecord> {
        changed
            .iter()
            .copied()
            .filter(|c| self.invalidate(c.kind, c.id))
            .collect()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.in_flight.clear();
    }

    /// Number of cached keys (aliases counted separately).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            coalesced: inner.coalesced,
            entries: inner.entries.len(),
            in_flight: inner.in_flight.len(),
        }
    }
}

/// Unregisters a flight whose leader was dropped before completing, which
/// closes the channel and releases waiters with `Abandoned`.
struct FlightGuard<'a> {
    cache: &'a ResolveCache,
    key: Option<CacheKey>,
    flight: u64,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let mut inner = self.cache.lock();
            if inner.in_flight.get(&key).is_some_and(|f| f.id == self.flight) {
                inner.in_flight.remove(&key);
                debug!(key = %key, "Fetch abandoned by leader");
            }
        }
    }
}
