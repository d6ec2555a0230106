//! Handler seams
//!
//! One trait per request shape. A record type can supply its own
//! implementation of any of them to replace the default path.

use async_trait::async_trait;
use conduit_core::{
    CommandRequest, CommandResult, ItemQueryRequest, ItemQueryResult, ListQueryRequest,
    ListQueryResult, PipelineResult, RawKey, Record,
};

#[async_trait]
pub trait ListRequestHandler<D: Record>: Send + Sync {
    async fn list_query(&self, request: ListQueryRequest) -> PipelineResult<ListQueryResult<D>>;
}

/// Item queries arrive with their key already erased to a [`RawKey`].
#[async_trait]
pub trait ItemRequestHandler<D: Record>: Send + Sync {
    async fn item_query(
        &self,
        request: ItemQueryRequest<RawKey>,
    ) -> PipelineResult<ItemQueryResult<D>>;
}

#[async_trait]
pub trait CommandHandler<D: Record>: Send + Sync {
    async fn command(&self, request: CommandRequest<D>) -> PipelineResult<CommandResult>;
}
