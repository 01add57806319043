//! Reference resolution for PDMS backend records.
//!
//! Shapes reference backend records by id (and materials also by code).
//! The resolvers here turn those references into record snapshots:
//!
//! - [`ResolveCache`] is the explicit, injectable process-wide cache with
//!   single-flight fetching and an invalidation API.
//! - [`Resolver`] resolves one record kind; [`FunctionResolver`],
//!   [`MaterialResolver`] and [`ProjectResolver`] are its instances.
//! - [`Resolvers`] bundles the three over one cache.
//!
//! Every call yields a [`ResolveResult`](pdms_types::ResolveResult): an
//! absent reference is `Found(None)`, a missing record is `NotFound`, and
//! only transport or protocol faults are `Error`.

mod cache;
mod config;
mod resolver;

pub use cache::{CacheKey, CacheStats, CachedRecord, Lookup, ResolveCache};
pub use config::ResolverConfig;
pub use resolver::{
    FunctionResolver, MaterialResolver, ProjectResolver, Resolvable, Resolver, Resolvers,
};
