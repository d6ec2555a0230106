//! Default list path
//!
//! Filter, count, sort, page, then map. Total count is taken after filtering
//! and before paging, so it never depends on the requested page. The count
//! and the page come from one store read.

use async_trait::async_trait;
use conduit_core::{
    ConfigError, ListQueryRequest, ListQueryResult, PipelineResult, Record, RecordQuery,
    StoreRecord,
};
use conduit_storage::{RecordStore, SessionMode, StoreSession};
use std::time::Instant;

use crate::handler::ListRequestHandler;
use crate::pipeline::RecordPipeline;

impl<S, D, P> RecordPipeline<S, D, P>
where
    S: RecordStore,
    D: Record,
    P: StoreRecord,
{
    async fn default_list(&self, request: &ListQueryRequest) -> PipelineResult<ListQueryResult<D>> {
        let cancel = &request.cancellation;
        cancel.check()?;
        let mapper = self.require_mapper()?;

        let mut query = RecordQuery::<P>::all();
        if !request.filters.is_empty() {
            let handler = self.filter_handler.as_ref().ok_or_else(|| {
                self.wiring_defect(ConfigError::MissingFilterHandler {
                    record: D::RECORD_NAME,
                })
            })?;
            query = handler.apply_filters(&request.filters, query);
        }

        if !request.sorters.is_empty() {
            let handler = self.sort_handler.as_ref().ok_or_else(|| {
                self.wiring_defect(ConfigError::MissingSortHandler {
                    record: D::RECORD_NAME,
                })
            })?;
            for field in handler.unknown_fields(&request.sorters) {
                tracing::warn!(record = D::RECORD_NAME, field, "Ignoring unknown sort field");
            }
            query = handler.apply_sorts(&request.sorters, query);
        } else if let Some(handler) = &self.sort_handler {
            query = handler.apply_default_sort(query);
        }

        if let Some(page_size) = request.page_size() {
            query = query.page(request.start_index, page_size);
        }

        let session = self.store.open_session(SessionMode::ReadOnly).await?;
        let (total_count, rows) = session.fetch_counted(&query, cancel).await?;
        let items = rows.iter().map(|row| mapper.to_domain(row)).collect();
        Ok(ListQueryResult::success(items, total_count))
    }
}

#[async_trait]
impl<S, D, P> ListRequestHandler<D> for RecordPipeline<S, D, P>
where
    S: RecordStore,
    D: Record,
    P: StoreRecord,
{
    async fn list_query(&self, request: ListQueryRequest) -> PipelineResult<ListQueryResult<D>> {
        if let Some(custom) = &self.list_handler {
            return custom.list_query(request).await;
        }

        if self.config.trace_requests {
            tracing::debug!(
                record = D::RECORD_NAME,
                filters = request.filters.len(),
                sorters = request.sorters.len(),
                start_index = request.start_index,
                page_size = request.page_size,
                "List query"
            );
        }

        let started = Instant::now();
        let outcome = self.default_list(&request).await;
        self.observe("list", started, &outcome);
        outcome
    }
}
