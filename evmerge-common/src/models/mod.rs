//! Domain models shared by the store, the worker and the HTTP layer

pub mod filter_spec;
pub mod record;
pub mod task;

pub use filter_spec::FilterSpec;
pub use record::{fields, NormalizedRecord, RawRecord};
pub use task::{Task, TaskId, TaskStatus};
