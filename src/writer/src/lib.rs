//! Writing side of an invocation: the pair store, chunked persistence with
//! compensation, export files and the per-need processor that ties them together.

pub mod coordinator;
pub mod export;
pub mod processor;
pub mod store;

pub use coordinator::{PersistenceCoordinator, RemovalReport, RetryPolicy};
pub use export::{ExportSink, ObjectStoreExporter};
pub use processor::{InvocationSummary, NeedProcessor};
pub use store::{PairStore, WriteOp, dynamodb::DynamoDbPairStore, memory::InMemoryPairStore};
