//! In-memory store
//!
//! One table per persistence record type, rows kept in insertion order.
//! Sessions are counted so tests can prove none outlive their call.

use async_trait::async_trait;
use conduit_core::{
    Cancellation, KeyValue, PipelineError, PipelineResult, RecordQuery, StorageError, StoreRecord,
};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::config::InMemoryStoreConfig;
use crate::{RecordStore, SessionMode, StoreSession, StoreStatistics};

// ============================================================================
// TABLES
// ============================================================================

struct Table<P> {
    rows: Vec<P>,
    next_identity: i64,
}

impl<P: StoreRecord> Table<P> {
    fn new(identity_seed: i64) -> Self {
        Self {
            rows: Vec::new(),
            next_identity: identity_seed,
        }
    }

    fn position(&self, key: &KeyValue) -> Option<usize> {
        self.rows.iter().position(|row| row.key_value() == *key)
    }

    /// Returns the number of rows added. Once the identity range is used up
    /// the counter stays at `i64::MAX`, so further generated keys collide
    /// and are rejected like any other duplicate.
    fn insert(&mut self, record: &mut P) -> u64 {
        if P::STORE_ASSIGNED_KEY && record.key_value().is_default() {
            record.assign_key(KeyValue::Int(self.next_identity));
        }

        let key = record.key_value();
        if self.position(&key).is_some() {
            tracing::debug!(record = P::RECORD_NAME, key = %key, "Insert rejected: duplicate key");
            return 0;
        }

        if let (true, KeyValue::Int(value)) = (P::STORE_ASSIGNED_KEY, key) {
            self.next_identity = self.next_identity.max(value.saturating_add(1));
        }
        self.rows.push(record.clone());
        1
    }

    fn update(&mut self, record: &P) -> u64 {
        match self.position(&record.key_value()) {
            Some(index) => {
                self.rows[index] = record.clone();
                1
            }
            None => 0,
        }
    }

    fn remove(&mut self, record: &P) -> u64 {
        match self.position(&record.key_value()) {
            Some(index) => {
                self.rows.remove(index);
                1
            }
            None => 0,
        }
    }
}

trait AnyTable: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn record_name(&self) -> &'static str;
    fn len(&self) -> usize;
}

impl<P: StoreRecord> AnyTable for Table<P> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn record_name(&self) -> &'static str {
        P::RECORD_NAME
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

// ============================================================================
// STORE
// ============================================================================

struct StoreInner {
    tables: RwLock<HashMap<TypeId, Box<dyn AnyTable>>>,
    config: InMemoryStoreConfig,
    open_sessions: AtomicUsize,
    sessions_opened: AtomicU64,
}

/// In-memory store for tests and local composition. Clones share state.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_config(InMemoryStoreConfig::default())
    }

    pub fn with_config(config: InMemoryStoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                tables: RwLock::new(HashMap::new()),
                config,
                open_sessions: AtomicUsize::new(0),
                sessions_opened: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &InMemoryStoreConfig {
        &self.inner.config
    }

    /// Load fixture rows, assigning keys as an insert would. Rows with a
    /// duplicate key are skipped; returns the number loaded.
    pub fn seed<P, I>(&self, records: I) -> PipelineResult<usize>
    where
        P: StoreRecord,
        I: IntoIterator<Item = P>,
    {
        self.write_table::<P, _>(|table| {
            records
                .into_iter()
                .map(|mut record| table.insert(&mut record))
                .sum::<u64>() as usize
        })
    }

    /// Rows currently held for `P`.
    pub fn len<P: StoreRecord>(&self) -> PipelineResult<usize> {
        self.read_table::<P, _>(|rows| rows.len())
    }

    pub fn is_empty<P: StoreRecord>(&self) -> PipelineResult<bool> {
        Ok(self.len::<P>()? == 0)
    }

    /// Clear all stored data.
    pub fn clear(&self) -> PipelineResult<()> {
        let mut tables = self
            .inner
            .tables
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        tables.clear();
        Ok(())
    }

    fn read_table<P: StoreRecord, R>(&self, f: impl FnOnce(&[P]) -> R) -> PipelineResult<R> {
        let tables = self
            .inner
            .tables
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        match tables.get(&TypeId::of::<P>()) {
            None => Ok(f(&[])),
            Some(table) => table
                .as_any()
                .downcast_ref::<Table<P>>()
                .map(|table| f(&table.rows))
                .ok_or_else(|| {
                    StorageError::TableTypeMismatch {
                        record: P::RECORD_NAME,
                    }
                    .into()
                }),
        }
    }

    fn write_table<P: StoreRecord, R>(
        &self,
        f: impl FnOnce(&mut Table<P>) -> R,
    ) -> PipelineResult<R> {
        let mut tables = self
            .inner
            .tables
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let seed = self.inner.config.identity_seed;
        let table = tables
            .entry(TypeId::of::<P>())
            .or_insert_with(|| Box::new(Table::<P>::new(seed)));
        table
            .as_any_mut()
            .downcast_mut::<Table<P>>()
            .map(f)
            .ok_or_else(|| {
                StorageError::TableTypeMismatch {
                    record: P::RECORD_NAME,
                }
                .into()
            })
    }

    /// Every store call passes through here: check the signal, then wait out
    /// the simulated latency unless the signal fires first.
    async fn io_point(&self, cancel: &Cancellation) -> PipelineResult<()> {
        cancel.check()?;
        if let Some(latency) = self.inner.config.latency {
            tokio::select! {
                _ = tokio::time::sleep(latency) => {}
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            }
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("config", &self.inner.config)
            .field("open_sessions", &self.inner.open_sessions.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    type Session = InMemorySession;

    async fn open_session(&self, mode: SessionMode) -> PipelineResult<InMemorySession> {
        self.inner.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(?mode, "Store session opened");
        Ok(InMemorySession {
            store: self.clone(),
            mode,
        })
    }

    fn statistics(&self) -> PipelineResult<StoreStatistics> {
        let tables = self
            .inner
            .tables
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(StoreStatistics {
            open_sessions: self.inner.open_sessions.load(Ordering::SeqCst),
            sessions_opened: self.inner.sessions_opened.load(Ordering::SeqCst),
            tables: tables
                .values()
                .map(|table| (table.record_name(), table.len()))
                .collect(),
        })
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// A call-scoped handle on an [`InMemoryStore`]. Released on drop.
#[derive(Debug)]
pub struct InMemorySession {
    store: InMemoryStore,
    mode: SessionMode,
}

impl InMemorySession {
    fn require_tracking(&self, operation: &'static str) -> PipelineResult<()> {
        match self.mode {
            SessionMode::Tracking => Ok(()),
            SessionMode::ReadOnly => Err(StorageError::ReadOnlySession { operation }.into()),
        }
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.store.inner.open_sessions.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(mode = ?self.mode, "Store session released");
    }
}

#[async_trait]
impl StoreSession for InMemorySession {
    fn mode(&self) -> SessionMode {
        self.mode
    }

    async fn count<P: StoreRecord>(
        &self,
        query: &RecordQuery<P>,
        cancel: &Cancellation,
    ) -> PipelineResult<usize> {
        self.store.io_point(cancel).await?;
        self.store.read_table::<P, _>(|rows| query.count_in(rows))
    }

    async fn fetch<P: StoreRecord>(
        &self,
        query: &RecordQuery<P>,
        cancel: &Cancellation,
    ) -> PipelineResult<Vec<P>> {
        self.store.io_point(cancel).await?;
        self.store.read_table::<P, _>(|rows| query.execute(rows))
    }

    /// Count and page under one read lock.
    async fn fetch_counted<P: StoreRecord>(
        &self,
        query: &RecordQuery<P>,
        cancel: &Cancellation,
    ) -> PipelineResult<(usize, Vec<P>)> {
        self.store.io_point(cancel).await?;
        self.store
            .read_table::<P, _>(|rows| (query.count_in(rows), query.execute(rows)))
    }

    async fn find<P: StoreRecord>(
        &self,
        key: &KeyValue,
        cancel: &Cancellation,
    ) -> PipelineResult<Option<P>> {
        self.store.io_point(cancel).await?;
        self.store
            .read_table::<P, _>(|rows| rows.iter().find(|row| row.key_value() == *key).cloned())
    }

    async fn insert<P: StoreRecord>(
        &self,
        record: &mut P,
        cancel: &Cancellation,
    ) -> PipelineResult<u64> {
        self.require_tracking("insert")?;
        self.store.io_point(cancel).await?;
        self.store.write_table::<P, _>(|table| table.insert(record))
    }

    async fn update<P: StoreRecord>(&self, record: &P, cancel: &Cancellation) -> PipelineResult<u64> {
        self.require_tracking("update")?;
        self.store.io_point(cancel).await?;
        self.store.write_table::<P, _>(|table| table.update(record))
    }

    async fn remove<P: StoreRecord>(&self, record: &P, cancel: &Cancellation) -> PipelineResult<u64> {
        self.require_tracking("remove")?;
        self.store.io_point(cancel).await?;
        self.store.write_table::<P, _>(|table| table.remove(record))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{
        CancellationSource, PredicateSpecification, Record, RecordOrdering, SortDefinition,
    };
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: i64,
        name: String,
    }

    impl Record for Widget {
        const RECORD_NAME: &'static str = "Widget";
    }

    impl StoreRecord for Widget {
        const STORE_ASSIGNED_KEY: bool = true;

        fn key_value(&self) -> KeyValue {
            KeyValue::Int(self.id)
        }

        fn assign_key(&mut self, key: KeyValue) {
            if let Some(id) = key.as_int() {
                self.id = id;
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Label {
        code: i64,
    }

    impl Record for Label {
        const RECORD_NAME: &'static str = "Label";
    }

    impl StoreRecord for Label {
        fn key_value(&self) -> KeyValue {
            KeyValue::Int(self.code)
        }
    }

    fn widget(name: &str) -> Widget {
        Widget {
            id: 0,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_keys_from_seed() {
        let store = InMemoryStore::with_config(InMemoryStoreConfig::default().with_identity_seed(100));
        let session = store.open_session(SessionMode::Tracking).await.unwrap();
        let cancel = Cancellation::none();

        let mut first = widget("first");
        let mut second = widget("second");
        assert_eq!(session.insert(&mut first, &cancel).await.unwrap(), 1);
        assert_eq!(session.insert(&mut second, &cancel).await.unwrap(), 1);
        assert_eq!(first.id, 100);
        assert_eq!(second.id, 101);

        let found: Option<Widget> = session.find(&KeyValue::Int(101), &cancel).await.unwrap();
        assert_eq!(found, Some(second));
    }

    #[tokio::test]
    async fn test_duplicate_insert_affects_nothing() {
        let store = InMemoryStore::new();
        let session = store.open_session(SessionMode::Tracking).await.unwrap();
        let cancel = Cancellation::none();

        let mut label = Label { code: 7 };
        assert_eq!(session.insert(&mut label, &cancel).await.unwrap(), 1);
        assert_eq!(session.insert(&mut label, &cancel).await.unwrap(), 0);
        assert_eq!(store.len::<Label>().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_identity_range_rejects_instead_of_overflowing() {
        let store = InMemoryStore::new();
        let session = store.open_session(SessionMode::Tracking).await.unwrap();
        let cancel = Cancellation::none();

        let mut last = Widget {
            id: i64::MAX,
            name: "last".to_string(),
        };
        assert_eq!(session.insert(&mut last, &cancel).await.unwrap(), 1);

        let mut next = widget("next");
        assert_eq!(session.insert(&mut next, &cancel).await.unwrap(), 0);
        assert_eq!(next.id, i64::MAX);
        assert_eq!(store.len::<Widget>().unwrap(), 1);
    }

    #[test]
    fn test_seed_with_maximum_key_does_not_overflow() {
        let store = InMemoryStore::with_config(
            InMemoryStoreConfig::default().with_identity_seed(i64::MAX),
        );
        assert_eq!(store.seed(vec![widget("a"), widget("b")]).unwrap(), 1);
        assert_eq!(store.len::<Widget>().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_and_remove_of_missing_row_affect_nothing() {
        let store = InMemoryStore::new();
        let session = store.open_session(SessionMode::Tracking).await.unwrap();
        let cancel = Cancellation::none();
        let ghost = Label { code: 404 };

        assert_eq!(session.update(&ghost, &cancel).await.unwrap(), 0);
        assert_eq!(session.remove(&ghost, &cancel).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_and_remove_deletes() {
        let store = InMemoryStore::new();
        store.seed(vec![widget("a"), widget("b")]).unwrap();
        let session = store.open_session(SessionMode::Tracking).await.unwrap();
        let cancel = Cancellation::none();

        let renamed = Widget {
            id: 2,
            name: "bee".to_string(),
        };
        assert_eq!(session.update(&renamed, &cancel).await.unwrap(), 1);
        let found: Option<Widget> = session.find(&KeyValue::Int(2), &cancel).await.unwrap();
        assert_eq!(found.map(|w| w.name), Some("bee".to_string()));

        assert_eq!(session.remove(&renamed, &cancel).await.unwrap(), 1);
        assert_eq!(store.len::<Widget>().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fetch_runs_query_over_insertion_order() {
        let store = InMemoryStore::new();
        store
            .seed(["delta", "alpha", "charlie", "bravo"].into_iter().map(widget))
            .unwrap();
        let session = store.open_session(SessionMode::ReadOnly).await.unwrap();
        let cancel = Cancellation::none();

        let natural: Vec<Widget> = session.fetch(&RecordQuery::all(), &cancel).await.unwrap();
        let names: Vec<&str> = natural.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["delta", "alpha", "charlie", "bravo"]);

        let query = RecordQuery::<Widget>::all()
            .filter(Arc::new(PredicateSpecification::new(|w: &Widget| w.name != "alpha")))
            .order_by(RecordOrdering::<Widget>::new().then_by(
                SortDefinition::ascending("name"),
                Arc::new(|a: &Widget, b: &Widget| a.name.cmp(&b.name)),
            ))
            .page(1, 5);
        assert_eq!(session.count(&query, &cancel).await.unwrap(), 3);
        let page = session.fetch(&query, &cancel).await.unwrap();
        let names: Vec<&str> = page.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["charlie", "delta"]);

        let (total, rows) = session.fetch_counted(&query, &cancel).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows, page);
    }

    #[tokio::test]
    async fn test_unknown_table_is_empty() {
        let store = InMemoryStore::new();
        let session = store.open_session(SessionMode::ReadOnly).await.unwrap();
        let cancel = Cancellation::none();
        assert_eq!(session.count(&RecordQuery::<Label>::all(), &cancel).await.unwrap(), 0);
        let found: Option<Label> = session.find(&KeyValue::Int(1), &cancel).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_read_only_session_rejects_mutations() {
        let store = InMemoryStore::new();
        let session = store.open_session(SessionMode::ReadOnly).await.unwrap();
        let err = session
            .insert(&mut Label { code: 1 }, &Cancellation::none())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Storage(StorageError::ReadOnlySession { operation: "insert" })
        ));
        assert!(store.is_empty::<Label>().unwrap());
    }

    #[tokio::test]
    async fn test_sessions_are_released_on_drop() {
        let store = InMemoryStore::new();
        {
            let _a = store.open_session(SessionMode::ReadOnly).await.unwrap();
            let _b = store.open_session(SessionMode::Tracking).await.unwrap();
            assert_eq!(store.statistics().unwrap().open_sessions, 2);
        }
        let stats = store.statistics().unwrap();
        assert_eq!(stats.open_sessions, 0);
        assert_eq!(stats.sessions_opened, 2);
    }

    #[tokio::test]
    async fn test_statistics_report_rows_per_record() {
        let store = InMemoryStore::new();
        store.seed(vec![widget("a"), widget("b")]).unwrap();
        store.seed(vec![Label { code: 1 }]).unwrap();
        let stats = store.statistics().unwrap();
        assert_eq!(stats.row_count("Widget"), 2);
        assert_eq!(stats.row_count("Label"), 1);
        assert_eq!(stats.row_count("Missing"), 0);

        store.clear().unwrap();
        assert_eq!(store.statistics().unwrap().row_count("Widget"), 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_call_fails_fast() {
        let store = InMemoryStore::new();
        let session = store.open_session(SessionMode::ReadOnly).await.unwrap();
        let source = CancellationSource::new();
        source.cancel();

        let err = session
            .count(&RecordQuery::<Label>::all(), &source.token())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_latency() {
        let store = InMemoryStore::with_config(
            InMemoryStoreConfig::default().with_latency(Duration::from_secs(30)),
        );
        let session = store.open_session(SessionMode::ReadOnly).await.unwrap();
        let source = CancellationSource::new();
        let token = source.token();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            source.cancel();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            session.fetch(&RecordQuery::<Label>::all(), &token),
        )
        .await
        .expect("cancellation should interrupt the simulated latency");
        assert!(outcome.unwrap_err().is_cancelled());
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================
