//! Conduit Broker - Handler Resolution and the Data Broker
//!
//! [`DataBroker`] is the facade applications call. Each registered record
//! type routes to handlers, normally a [`RecordPipeline`] that runs the
//! default list, item and command paths unless a custom handler replaces one.

pub mod broker;
mod command;
pub mod handler;
mod item;
mod list;
pub mod pipeline;

pub use broker::{DataBroker, DataBrokerBuilder};
pub use handler::{CommandHandler, ItemRequestHandler, ListRequestHandler};
pub use pipeline::RecordPipeline;
