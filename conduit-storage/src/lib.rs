//! Conduit Storage - Store Contract and In-Memory Implementation
//!
//! Defines the keyed, queryable record-set capability the pipeline needs
//! from a backing store. Any store offering it is pluggable.

pub mod config;
pub mod in_memory;

pub use config::InMemoryStoreConfig;
pub use in_memory::{InMemorySession, InMemoryStore};

use async_trait::async_trait;
use conduit_core::{Cancellation, KeyValue, PipelineResult, RecordQuery, StoreRecord};
use std::collections::BTreeMap;

// ============================================================================
// SESSIONS
// ============================================================================

/// How a session materializes records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionMode {
    /// Non-tracking reads. Mutations are rejected.
    ReadOnly,
    /// Reads and mutations.
    Tracking,
}

/// A store session owned by exactly one pipeline call.
///
/// Dropping the session releases it, on every exit path. Every call takes
/// the request's cancellation signal and returns `PipelineError::Cancelled`
/// once it fires.
#[async_trait]
pub trait StoreSession: Send + Sync {
    fn mode(&self) -> SessionMode;

    /// Rows matching the query's predicates. Ordering and paging are ignored.
    ///
    /// Each call reads its own snapshot; a `count` followed by a `fetch` may
    /// observe different data. Use [`fetch_counted`](Self::fetch_counted)
    /// when the two must agree.
    async fn count<P: StoreRecord>(
        &self,
        query: &RecordQuery<P>,
        cancel: &Cancellation,
    ) -> PipelineResult<usize>;

    /// Execute the query: predicates, then ordering, then skip/take.
    async fn fetch<P: StoreRecord>(
        &self,
        query: &RecordQuery<P>,
        cancel: &Cancellation,
    ) -> PipelineResult<Vec<P>>;

    /// The filtered total and the executed page, read together.
    ///
    /// The provided implementation issues `count` then `fetch` and is only
    /// as consistent as the backend's isolation. Stores that can read both
    /// from one snapshot should override it.
    async fn fetch_counted<P: StoreRecord>(
        &self,
        query: &RecordQuery<P>,
        cancel: &Cancellation,
    ) -> PipelineResult<(usize, Vec<P>)> {
        let total = self.count(query, cancel).await?;
        let rows = self.fetch(query, cancel).await?;
        Ok((total, rows))
    }

    /// Point lookup by primitive key.
    async fn find<P: StoreRecord>(
        &self,
        key: &KeyValue,
        cancel: &Cancellation,
    ) -> PipelineResult<Option<P>>;

    /// Insert a record, assigning its key first when the store generates keys.
    /// Returns the number of affected records.
    async fn insert<P: StoreRecord>(&self, record: &mut P, cancel: &Cancellation)
        -> PipelineResult<u64>;

    async fn update<P: StoreRecord>(&self, record: &P, cancel: &Cancellation) -> PipelineResult<u64>;

    async fn remove<P: StoreRecord>(&self, record: &P, cancel: &Cancellation) -> PipelineResult<u64>;
}

// ============================================================================
// STORE
// ============================================================================

/// A backing store that hands out call-scoped sessions.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    type Session: StoreSession;

    async fn open_session(&self, mode: SessionMode) -> PipelineResult<Self::Session>;

    fn statistics(&self) -> PipelineResult<StoreStatistics>;
}

/// Store statistics for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Sessions currently held by callers
    pub open_sessions: usize,
    /// Sessions handed out since the store was created
    pub sessions_opened: u64,
    /// Row count per record name
    pub tables: BTreeMap<&'static str, usize>,
}

impl StoreStatistics {
    pub fn row_count(&self, record: &str) -> usize {
        self.tables.get(record).copied().unwrap_or(0)
    }
}
