//! Conduit Core - Contract Types
//!
//! Keys, records, entity maps, filter/sort specifications, requests, results,
//! cancellation and errors shared by every layer. This crate performs no I/O.

pub mod cancellation;
pub mod config;
pub mod error;
pub mod identity;
pub mod map;
pub mod query;
pub mod record;
pub mod request;
pub mod result;
pub mod sort;
pub mod specification;

pub use cancellation::{Cancellation, CancellationSource};
pub use config::PipelineConfig;
pub use error::{ConfigError, KeyError, PipelineError, PipelineResult, StorageError};
pub use identity::{
    new_entity_id, DefaultIdConverter, EntityKey, IdConverter, KeyProvider, KeyValue, RawKey,
    UuidKey, UuidKeyProvider,
};
pub use map::{EntityMap, IdentityMap};
pub use query::{Comparator, FilterDefinition, RecordOrdering, RecordQuery, SortDefinition};
pub use record::{Record, StoreRecord};
pub use request::{CommandRequest, CommandState, ItemQueryRequest, ListQueryRequest};
pub use result::{CommandResult, ItemQueryResult, ListQueryResult};
pub use sort::{RecordSortHandler, SortHandler};
pub use specification::{
    text_equals_ignore_case, AndSpecification, FilterHandler, NotSpecification,
    OrSpecification, PredicateSpecification, RecordFilterHandler, Specification,
    SpecificationExt,
};

// =============================================================================
// PROPERTY TESTS
// =============================================================================
