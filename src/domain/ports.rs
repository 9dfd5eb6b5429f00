use crate::domain::model::{CategoryScore, Insult, LogEntry, StoredInsult, ViewRow};
use thiserror::Error;

/// Errors surfaced by a document store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document exists at the requested id.
    #[error("document not found")]
    NotFound,
    /// The supplied revision no longer matches the store's current one.
    #[error("document revision conflict")]
    Conflict,
    /// The store answered with something the adapter cannot interpret.
    #[error("invalid store response: {0}")]
    InvalidResponse(String),
    /// The store is unreachable or failed the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of the server-side score-increment transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// Score was incremented by one.
    Updated,
    /// No document at the id.
    NotFound,
    /// A document exists but its type tag is not "insult".
    IncorrectType,
}

/// A revisioned document store holding insult and request-log documents,
/// with precomputed sorted/aggregated views.
///
/// All mutation exclusivity is delegated to the store's revision check;
/// adapters must reject a save whose expected revision is stale with
/// [`StoreError::Conflict`].
pub trait DocumentStore: Send + Sync {
    /// Load an insult by id. `Ok(None)` when absent.
    fn load(&self, id: &str) -> Result<Option<StoredInsult>, StoreError>;

    /// Create a new insult document; the store assigns id and revision.
    fn create(&self, insult: &Insult) -> Result<StoredInsult, StoreError>;

    /// Persist `insult` at `id`, conditional on `expected_rev` still being
    /// the current revision. Returns the new revision on success.
    fn save(&self, id: &str, expected_rev: &str, insult: &Insult) -> Result<String, StoreError>;

    /// Delete the document at `id`.
    fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// All insults, sorted ascending by `(score, id)`. Absent scores sort
    /// as zero.
    fn score_view(&self) -> Result<Vec<ViewRow>, StoreError>;

    /// All insults whose lowercased category equals `category`, sorted
    /// ascending by id.
    fn by_category(&self, category: &str) -> Result<Vec<ViewRow>, StoreError>;

    /// Per-category score sums (absent score counted as zero), in no
    /// particular order.
    fn category_scores(&self) -> Result<Vec<CategoryScore>, StoreError>;

    /// Scan the random-key view from `start`, ascending or descending,
    /// returning the first insult found.
    fn by_random(&self, start: f64, descending: bool) -> Result<Option<StoredInsult>, StoreError>;

    /// Execute the atomic server-side score-increment transform at `id`.
    fn increment_score(&self, id: &str) -> Result<IncrementOutcome, StoreError>;

    /// Append one request-log document.
    fn store_log(&self, entry: &LogEntry) -> Result<(), StoreError>;
}

/// Error raised by a metric sink while reporting.
#[derive(Debug, Error)]
#[error("metric sink error: {0}")]
pub struct SinkError(pub String);

/// Unit a sink wants elapsed times expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
}

/// A fire-and-forget event/metrics sink.
///
/// Delivery failures must never affect the operation being measured;
/// callers catch and log [`SinkError`]s.
pub trait MetricSink: Send + Sync {
    /// Unit this sink wants timer values converted to.
    fn unit(&self) -> TimeUnit {
        TimeUnit::Seconds
    }

    /// Report one event.
    fn send(&self, name: &str, value: f64, tags: &[&str]) -> Result<(), SinkError>;

    /// Human-readable sink name, used when logging delivery failures.
    fn name(&self) -> &str;
}
