use crate::cache::{CacheKey, CachedRecord, ResolveCache};
use crate::config::ResolverConfig;
use futures::future::BoxFuture;
use pdms_backend::{BackendResult, PdmsBackend};
use pdms_model::{Function, Material, Project, RemoteEntity};
use pdms_types::{EntityKind, FunctionId, RecordId, ResolveError, ResolveResult};
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// A record kind the resolvers know how to fetch and cache.
pub trait Resolvable: RemoteEntity {
    fn fetch(backend: &dyn PdmsBackend, id: Self::Id) -> BoxFuture<'_, BackendResult<Option<Self>>>;

    fn into_record(self) -> CachedRecord;

    fn from_record(record: CachedRecord) -> Option<Self>;
}

impl Resolvable for Function {
    fn fetch(backend: &dyn PdmsBackend, id: FunctionId) -> BoxFuture<'_, BackendResult<Option<Self>>> {
        backend.fetch_function(id)
    }

    fn into_record(self) -> CachedRecord {
        CachedRecord::Function(self)
    }

    fn from_record(record: CachedRecord) -> Option<Self> {
        match record {
            CachedRecord::Function(f) => Some(f),
            _ => None,
        }
    }
}

impl Resolvable for Material {
    fn fetch(
        backend: &dyn PdmsBackend,
        id: pdms_types::MaterialId,
    ) -> BoxFuture<'_, BackendResult<Option<Self>>> {
        backend.fetch_material(id)
    }

    fn into_record(self) -> CachedRecord {
        CachedRecord::Material(self)
    }

    fn from_record(record: CachedRecord) -> Option<Self> {
        match record {
            CachedRecord::Material(m) => Some(m),
            _ => None,
        }
    }
}

impl Resolvable for Project {
    fn fetch(
        backend: &dyn PdmsBackend,
        id: pdms_types::ProjectId,
    ) -> BoxFuture<'_, BackendResult<Option<Self>>> {
        backend.fetch_project(id)
    }

    fn into_record(self) -> CachedRecord {
        CachedRecord::Project(self)
    }

    fn from_record(record: CachedRecord) -> Option<Self> {
        match record {
            CachedRecord::Project(p) => Some(p),
            _ => None,
        }
    }
}

/// Resolves references of one record kind through the shared cache.
pub struct Resolver<E> {
    cache: Arc<ResolveCache>,
    backend: Arc<dyn PdmsBackend>,
    config: ResolverConfig,
    _entity: PhantomData<fn() -> E>,
}

pub type FunctionResolver = Resolver<Function>;
pub type MaterialResolver = Resolver<Material>;
pub type ProjectResolver = Resolver<Project>;

impl<E> Clone for Resolver<E> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            _entity: PhantomData,
        }
    }
}

fn narrow<E: Resolvable>(outcome: ResolveResult<CachedRecord>) -> ResolveResult<E> {
    outcome.and_then(|record| {
        let kind = record.kind();
        match E::from_record(record) {
            Some(entity) => ResolveResult::Found(entity),
            None => ResolveResult::Error(ResolveError::Malformed(format!(
                "expected a {} record, found a {kind}",
                <E::Id as RecordId>::KIND
            ))),
        }
    })
}

impl<E: Resolvable> Resolver<E> {
    pub fn new(
        cache: Arc<ResolveCache>,
        backend: Arc<dyn PdmsBackend>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            cache,
            backend,
            config,
            _entity: PhantomData,
        }
    }

    pub fn cache(&self) -> &Arc<ResolveCache> {
        &self.cache
    }

    /// Resolves an optional reference.
    ///
    /// `None` means no reference was requested and always yields
    /// `Found(None)`.
    pub async fn resolve(&self, id: Option<E::Id>) -> ResolveResult<Option<E>> {
        let Some(id) = id else {
            return ResolveResult::Found(None);
        };
        self.resolve_id(id).await.map(Some)
    }

    /// Resolves a present reference.
    pub async fn resolve_id(&self, id: E::Id) -> ResolveResult<E> {
        let key = CacheKey::id(<E::Id as RecordId>::KIND, id.raw());
        let backend = Arc::clone(&self.backend);
        let outcome = self
            .cache
            .get_or_fetch(key, self.config.fetch_timeout(), move || async move {
                E::fetch(backend.as_ref(), id)
                    .await
                    .map(|found| found.map(E::into_record))
            })
            .await;
        narrow(outcome)
    }

    /// Drops the cached record for `id`.
    pub fn invalidate(&self, id: E::Id) -> bool {
        self.cache.invalidate(<E::Id as RecordId>::KIND, id.raw())
    }
}

impl Resolver<Material> {
    /// Resolves a material by catalogue code. Absent or blank codes yield
    /// `Found(None)`.
    pub async fn resolve_code(&self, code: Option<&str>) -> ResolveResult<Option<Material>> {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return ResolveResult::Found(None);
        };
        let key = CacheKey::code(EntityKind::Material, code);
        let backend = Arc::clone(&self.backend);
        let owned = code.to_string();
        let outcome = self
            .cache
            .get_or_fetch(key, self.config.fetch_timeout(), move || async move {
                backend
                    .fetch_material_by_code(&owned)
                    .await
                    .map(|found| found.map(CachedRecord::Material))
            })
            .await;
        narrow::<Material>(outcome).map(Some)
    }
}

impl Resolver<Function> {
    /// The chain from `id` up to its root function, nearest first.
    ///
    /// A parent the backend does not know ends the chain. Chains longer
    /// than `max_lineage_depth`, or that revisit a function, fail with
    /// `LineageTooDeep`.
    pub async fn lineage(&self, id: FunctionId) -> ResolveResult<Vec<Function>> {
        let mut chain: Vec<Function> = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(id);

        while let Some(current) = next {
            if !seen.insert(current) || chain.len() >= self.config.max_lineage_depth {
                debug!(function = %id, at = %current, "Lineage walk stopped");
                return ResolveResult::Error(ResolveError::LineageTooDeep(format!("function {id}")));
            }
            match self.resolve_id(current).await {
                ResolveResult::Found(function) => {
                    next = function.parent_id;
                    chain.push(function);
                }
                ResolveResult::NotFound if chain.is_empty() => return ResolveResult::NotFound,
                ResolveResult::NotFound => {
                    debug!(function = %current, "Lineage ends at unknown parent");
                    break;
                }
                ResolveResult::Error(err) => return ResolveResult::Error(err),
            }
        }

        ResolveResult::Found(chain)
    }

    /// The nearest enclosing zone, starting with `id` itself.
    pub async fn enclosing_zone(&self, id: FunctionId) -> ResolveResult<Option<Function>> {
        self.lineage(id)
            .await
            .map(|chain| chain.into_iter().find(Function::is_zone))
    }
}

/// The three resolvers over one shared cache.
#[derive(Clone)]
pub struct Resolvers {
    pub functions: FunctionResolver,
    pub materials: MaterialResolver,
    pub projects: ProjectResolver,
}

impl Resolvers {
    /// Creates resolvers with a fresh cache.
    pub fn new(backend: Arc<dyn PdmsBackend>, config: ResolverConfig) -> Self {
        Self::with_cache(Arc::new(ResolveCache::new()), backend, config)
    }

    /// Creates resolvers sharing an existing cache.
    pub fn with_cache(
        cache: Arc<ResolveCache>,
        backend: Arc<dyn PdmsBackend>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            functions: Resolver::new(Arc::clone(&cache), Arc::clone(&backend), config.clone()),
            materials: Resolver::new(Arc::clone(&cache), Arc::clone(&backend), config.clone()),
            projects: Resolver::new(cache, backend, config),
        }
    }

    pub fn cache(&self) -> &Arc<ResolveCache> {
        self.functions.cache()
    }

    pub fn backend(&self) -> &Arc<dyn PdmsBackend> {
        &self.functions.backend
    }
}
