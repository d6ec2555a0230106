//! Default item path

use async_trait::async_trait;
use conduit_core::{ItemQueryRequest, ItemQueryResult, PipelineResult, RawKey, Record, StoreRecord};
use conduit_storage::{RecordStore, SessionMode, StoreSession};
use std::time::Instant;

use crate::handler::ItemRequestHandler;
use crate::pipeline::RecordPipeline;

impl<S, D, P> RecordPipeline<S, D, P>
where
    S: RecordStore,
    D: Record,
    P: StoreRecord,
{
    async fn default_item(
        &self,
        request: &ItemQueryRequest<RawKey>,
    ) -> PipelineResult<ItemQueryResult<D>> {
        let cancel = &request.cancellation;
        cancel.check()?;
        let mapper = self.require_mapper()?;

        let Some(key) = self.id_converter.try_convert(&request.key) else {
            return Ok(ItemQueryResult::failure(format!(
                "Could not convert provided value to an Id of {}",
                request.key
            )));
        };

        let session = self.store.open_session(SessionMode::ReadOnly).await?;
        match session.find::<P>(&key, cancel).await? {
            Some(record) => Ok(ItemQueryResult::success(mapper.to_domain(&record))),
            None => Ok(ItemQueryResult::failure(
                "No record retrieved with the Key provided",
            )),
        }
    }
}

#[async_trait]
impl<S, D, P> ItemRequestHandler<D> for RecordPipeline<S, D, P>
where
    S: RecordStore,
    D: Record,
    P: StoreRecord,
{
    async fn item_query(
        &self,
        request: ItemQueryRequest<RawKey>,
    ) -> PipelineResult<ItemQueryResult<D>> {
        if let Some(custom) = &self.item_handler {
            return custom.item_query(request).await;
        }

        if self.config.trace_requests {
            tracing::debug!(record = D::RECORD_NAME, key = %request.key, "Item query");
        }

        let started = Instant::now();
        let outcome = self.default_item(&request).await;
        self.observe("item", started, &outcome);
        outcome
    }
}
