pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interface;

pub use crate::application::service::InsultService;
pub use crate::domain::model::{Insult, LogEntry, StoredInsult};
pub use crate::domain::ports::{DocumentStore, MetricSink};
