pub mod engine;

pub use engine::{OperationResult, SyncEngine};
