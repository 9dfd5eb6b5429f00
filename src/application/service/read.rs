//! Read-side operations: single fetch, list views, categories, random.

use crate::application::error::AppError;
use crate::application::metrics::with_timing;
use crate::domain::model::{KeyKind, StoredInsult};

use super::core::InsultService;
use super::types::PageView;

impl InsultService {
    /// Fetch one insult by id.
    pub fn get(&self, id: &str) -> Result<StoredInsult, AppError> {
        self.store
            .load(id)?
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    /// All insults, paginated ascending by score.
    pub fn list(&self, start: Option<&str>) -> Result<PageView, AppError> {
        with_timing("list insults", &self.sinks, || {
            let cursor = self.decode_cursor(start, KeyKind::Int)?;
            let rows = self.store.score_view()?;
            Ok(self.page_of(&rows, cursor.as_ref()))
        })
    }

    /// Insults of one category, paginated by document id.
    pub fn list_category(&self, category: &str, start: Option<&str>) -> Result<PageView, AppError> {
        with_timing("list category items", &self.sinks, || {
            let cursor = self.decode_cursor(start, KeyKind::Str)?;
            let rows = self.store.by_category(category)?;
            Ok(self.page_of(&rows, cursor.as_ref()))
        })
    }

    /// Category names sorted ascending by their aggregate score.
    pub fn categories(&self) -> Result<Vec<String>, AppError> {
        with_timing("list categories", &self.sinks, || {
            let mut scores = self.store.category_scores()?;
            scores.sort_by(|a, b| {
                a.score
                    .cmp(&b.score)
                    .then_with(|| a.category.cmp(&b.category))
            });
            Ok(scores.into_iter().map(|entry| entry.category).collect())
        })
    }

    /// Best-effort random pick.
    ///
    /// The selection is biased: documents are keyed by a random value
    /// fixed at write time, and when the forward scan from the pivot
    /// comes up empty we fall back to a descending scan, which favors
    /// high keys. This mirrors the documented behavior and is
    /// intentionally not a fair sampler.
    pub fn random(&self) -> Result<StoredInsult, AppError> {
        with_timing("random insult", &self.sinks, || {
            let pivot = rand::random::<f64>();
            if let Some(doc) = self.store.by_random(pivot, false)? {
                return Ok(doc);
            }
            self.store
                .by_random(pivot, true)?
                .ok_or_else(|| AppError::NotFound("no insults stored".to_string()))
        })
    }

    /// Liveness check.
    pub fn health(&self) -> Result<(), AppError> {
        with_timing("health", &self.sinks, || Ok(()))
    }
}
