//! Write-side operations: create, optimistic update, delete, like.

use crate::application::error::AppError;
use crate::application::metrics::{send_counter, with_timing};
use crate::application::retry::{retry_on, RetryError};
use crate::domain::model::{Insult, StoredInsult};
use crate::domain::ports::IncrementOutcome;

use super::core::InsultService;
use super::types::{LikeStatus, UpdateCommand};

/// Total attempts for a conflicting optimistic update before giving up.
const UPDATE_ATTEMPTS: usize = 3;

impl InsultService {
    /// Create a new insult; the store assigns id and revision.
    pub fn create(&self, insult: Insult) -> Result<StoredInsult, AppError> {
        with_timing("new insult", &self.sinks, || {
            Ok(self.store.create(&insult)?)
        })
    }

    /// Apply a partial update under optimistic concurrency.
    ///
    /// Each attempt loads the document fresh, applies the patch, and
    /// saves against the loaded revision. Conflicts are assumed to be
    /// transient concurrent writers and retried up to [`UPDATE_ATTEMPTS`]
    /// times in total; anything else fails on first occurrence.
    pub fn update(&self, id: &str, patch: &UpdateCommand) -> Result<StoredInsult, AppError> {
        let attempt = || {
            let current = self
                .store
                .load(id)?
                .ok_or_else(|| AppError::NotFound(id.to_string()))?;
            let patched = apply_patch(current.insult, patch);
            let rev = self.store.save(id, &current.rev, &patched)?;
            Ok(StoredInsult {
                id: id.to_string(),
                rev,
                insult: patched,
            })
        };

        retry_on(UPDATE_ATTEMPTS, is_conflict, attempt).map_err(|err| match err {
            RetryError::Exhausted(_) => AppError::Conflict(id.to_string()),
            RetryError::Fatal(err) => err,
        })
    }

    /// Delete an insult by id.
    pub fn delete(&self, id: &str) -> Result<(), AppError> {
        self.store.delete(id).map_err(|err| match err {
            crate::domain::ports::StoreError::NotFound => AppError::NotFound(id.to_string()),
            other => other.into(),
        })
    }

    /// Atomic server-side score increment.
    ///
    /// Runs entirely inside the store at write time, so it can never lose
    /// a race with concurrent likes or updates; there is nothing to retry.
    pub fn like(&self, id: &str) -> Result<LikeStatus, AppError> {
        with_timing("like", &self.sinks, || {
            send_counter(&self.sinks, "like", 1.0);
            let status = match self.store.increment_score(id)? {
                IncrementOutcome::Updated => LikeStatus::Updated,
                IncrementOutcome::NotFound => LikeStatus::NotFound,
                IncrementOutcome::IncorrectType => LikeStatus::IncorrectType,
            };
            Ok(status)
        })
    }
}

fn is_conflict(err: &AppError) -> bool {
    matches!(err, AppError::Conflict(_))
}

fn apply_patch(mut insult: Insult, patch: &UpdateCommand) -> Insult {
    if let Some(author) = &patch.author {
        insult.author = author.clone();
    }
    if let Some(text) = &patch.insult {
        insult.insult = text.clone();
    }
    if let Some(category) = &patch.category {
        insult.category = category.clone();
    }
    if let Some(score) = patch.score {
        insult.score = Some(score);
    }
    insult
}
