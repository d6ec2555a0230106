//! The data broker facade
//!
//! Routes each call to the handlers registered for the requested record
//! type. Routes are fixed when the broker is built; there is no runtime
//! service lookup.

use conduit_core::{
    CommandRequest, CommandResult, ConfigError, EntityKey, ItemQueryRequest, ItemQueryResult,
    ListQueryRequest, ListQueryResult, PipelineError, PipelineResult, Record,
};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::handler::{CommandHandler, ItemRequestHandler, ListRequestHandler};

struct Route<D: Record> {
    list: Arc<dyn ListRequestHandler<D>>,
    item: Arc<dyn ItemRequestHandler<D>>,
    command: Arc<dyn CommandHandler<D>>,
}

struct RouteEntry {
    record: &'static str,
    route: Box<dyn Any + Send + Sync>,
}

/// Single entry point for list queries, item queries and commands.
pub struct DataBroker {
    routes: HashMap<TypeId, RouteEntry>,
}

impl DataBroker {
    pub fn builder() -> DataBrokerBuilder {
        DataBrokerBuilder::default()
    }

    pub async fn list_query<D: Record>(
        &self,
        request: ListQueryRequest,
    ) -> PipelineResult<ListQueryResult<D>> {
        self.route::<D>()?.list.list_query(request).await
    }

    pub async fn item_query<D: Record, K: EntityKey>(
        &self,
        request: ItemQueryRequest<K>,
    ) -> PipelineResult<ItemQueryResult<D>> {
        self.route::<D>()?.item.item_query(request.into_raw()).await
    }

    pub async fn command<D: Record>(
        &self,
        request: CommandRequest<D>,
    ) -> PipelineResult<CommandResult> {
        self.route::<D>()?.command.command(request).await
    }

    pub fn is_registered<D: Record>(&self) -> bool {
        self.routes.contains_key(&TypeId::of::<D>())
    }

    /// Names of the registered record types, sorted.
    pub fn records(&self) -> Vec<&'static str> {
        let mut records: Vec<_> = self.routes.values().map(|entry| entry.record).collect();
        records.sort_unstable();
        records
    }

    fn route<D: Record>(&self) -> PipelineResult<&Route<D>> {
        self.routes
            .get(&TypeId::of::<D>())
            .and_then(|entry| entry.route.downcast_ref::<Route<D>>())
            .ok_or_else(|| {
                let error = ConfigError::UnregisteredRecord {
                    record: D::RECORD_NAME,
                };
                tracing::error!(record = D::RECORD_NAME, error = %error, "No route for record type");
                PipelineError::from(error)
            })
    }
}

impl fmt::Debug for DataBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataBroker")
            .field("records", &self.records())
            .finish()
    }
}

/// Builds a [`DataBroker`] from explicit per-record routes.
#[derive(Default)]
pub struct DataBrokerBuilder {
    routes: HashMap<TypeId, RouteEntry>,
}

impl DataBrokerBuilder {
    /// Route every request shape for `D` to one handler, usually a
    /// `RecordPipeline`. A later route for the same type replaces it.
    pub fn route<D, H>(self, handler: H) -> Self
    where
        D: Record,
        H: ListRequestHandler<D> + ItemRequestHandler<D> + CommandHandler<D> + 'static,
    {
        let handler = Arc::new(handler);
        self.route_handlers::<D>(handler.clone(), handler.clone(), handler)
    }

    /// Route each request shape for `D` to its own handler.
    pub fn route_handlers<D: Record>(
        mut self,
        list: Arc<dyn ListRequestHandler<D>>,
        item: Arc<dyn ItemRequestHandler<D>>,
        command: Arc<dyn CommandHandler<D>>,
    ) -> Self {
        let replaced = self.routes.insert(
            TypeId::of::<D>(),
            RouteEntry {
                record: D::RECORD_NAME,
                route: Box::new(Route { list, item, command }),
            },
        );
        if replaced.is_some() {
            tracing::warn!(record = D::RECORD_NAME, "Replacing existing broker route");
        }
        self
    }

    pub fn build(self) -> DataBroker {
        tracing::info!(routes = self.routes.len(), "Data broker built");
        DataBroker {
            routes: self.routes,
        }
    }
}
