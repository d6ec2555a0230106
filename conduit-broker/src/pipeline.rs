//! The generic record pipeline
//!
//! One [`RecordPipeline`] serves a (store, domain record, persistence record)
//! triple. It implements all three handler traits: a custom handler set with
//! `with_*_handler` is consulted first, otherwise the default path runs.

use conduit_core::{
    ConfigError, DefaultIdConverter, EntityMap, FilterHandler, IdConverter, IdentityMap,
    PipelineConfig, PipelineError, PipelineResult, Record, SortHandler, StoreRecord,
};
use conduit_storage::RecordStore;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::handler::{CommandHandler, ItemRequestHandler, ListRequestHandler};

pub struct RecordPipeline<S, D: Record, P> {
    pub(crate) store: S,
    pub(crate) mapper: Option<Arc<dyn EntityMap<P, D>>>,
    pub(crate) filter_handler: Option<Arc<dyn FilterHandler<P>>>,
    pub(crate) sort_handler: Option<Arc<dyn SortHandler<P>>>,
    pub(crate) id_converter: Arc<dyn IdConverter>,
    pub(crate) list_handler: Option<Arc<dyn ListRequestHandler<D>>>,
    pub(crate) item_handler: Option<Arc<dyn ItemRequestHandler<D>>>,
    pub(crate) command_handler: Option<Arc<dyn CommandHandler<D>>>,
    pub(crate) config: PipelineConfig,
}

impl<S, D, P> RecordPipeline<S, D, P>
where
    S: RecordStore,
    D: Record,
    P: StoreRecord,
{
    /// A pipeline whose domain and persistence shapes differ.
    /// Requires [`with_mapper`](Self::with_mapper) before use.
    pub fn mapped(store: S) -> Self {
        Self {
            store,
            mapper: None,
            filter_handler: None,
            sort_handler: None,
            id_converter: Arc::new(DefaultIdConverter),
            list_handler: None,
            item_handler: None,
            command_handler: None,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_mapper(mut self, mapper: impl EntityMap<P, D> + 'static) -> Self {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    pub fn with_filter_handler(mut self, handler: impl FilterHandler<P> + 'static) -> Self {
        self.filter_handler = Some(Arc::new(handler));
        self
    }

    pub fn with_sort_handler(mut self, handler: impl SortHandler<P> + 'static) -> Self {
        self.sort_handler = Some(Arc::new(handler));
        self
    }

    pub fn with_id_converter(mut self, converter: impl IdConverter + 'static) -> Self {
        self.id_converter = Arc::new(converter);
        self
    }

    pub fn with_list_handler(mut self, handler: Arc<dyn ListRequestHandler<D>>) -> Self {
        self.list_handler = Some(handler);
        self
    }

    pub fn with_item_handler(mut self, handler: Arc<dyn ItemRequestHandler<D>>) -> Self {
        self.item_handler = Some(handler);
        self
    }

    pub fn with_command_handler(mut self, handler: Arc<dyn CommandHandler<D>>) -> Self {
        self.command_handler = Some(handler);
        self
    }

    /// Replace the runtime settings. Rejects configs that fail
    /// [`PipelineConfig::validate`].
    pub fn with_config(mut self, config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub(crate) fn require_mapper(&self) -> PipelineResult<&Arc<dyn EntityMap<P, D>>> {
        self.mapper.as_ref().ok_or_else(|| {
            self.wiring_defect(ConfigError::MissingMapper {
                domain: D::RECORD_NAME,
                persistence: P::RECORD_NAME,
            })
        })
    }

    /// Log a configuration error before handing it back.
    pub(crate) fn wiring_defect(&self, error: ConfigError) -> PipelineError {
        tracing::error!(record = D::RECORD_NAME, error = %error, "Pipeline is misconfigured");
        error.into()
    }

    /// Record how a default-path request ended.
    pub(crate) fn observe<T>(
        &self,
        operation: &'static str,
        started: Instant,
        outcome: &PipelineResult<T>,
    ) {
        let elapsed = started.elapsed();
        if elapsed > self.config.slow_request_threshold {
            tracing::warn!(
                record = D::RECORD_NAME,
                operation,
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = self.config.slow_request_threshold.as_millis() as u64,
                "Slow request"
            );
        }
        if let Err(e) = outcome {
            if e.is_cancelled() {
                tracing::debug!(record = D::RECORD_NAME, operation, "Request cancelled");
            } else if !e.is_configuration() {
                tracing::warn!(record = D::RECORD_NAME, operation, error = %e, "Request failed");
            }
        }
    }
}

impl<S, D> RecordPipeline<S, D, D>
where
    S: RecordStore,
    D: StoreRecord,
{
    /// A pipeline where the domain record is also the persistence record.
    pub fn unmapped(store: S) -> Self {
        Self::mapped(store).with_mapper(IdentityMap::<D>::new())
    }
}

impl<S, D: Record, P> fmt::Debug for RecordPipeline<S, D, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordPipeline")
            .field("record", &D::RECORD_NAME)
            .field("mapped", &self.mapper.is_some())
            .field("filter_handler", &self.filter_handler.is_some())
            .field("sort_handler", &self.sort_handler.is_some())
            .field("custom_list", &self.list_handler.is_some())
            .field("custom_item", &self.item_handler.is_some())
            .field("custom_command", &self.command_handler.is_some())
            .field("config", &self.config)
            .finish()
    }
}
