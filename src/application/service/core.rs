//! Core InsultService struct definition and private helpers.

use crate::application::error::AppError;
use crate::application::pagination::{paginate, Cursor};
use crate::domain::model::{KeyKind, LogEntry, ViewRow};
use crate::domain::ports::{DocumentStore, MetricSink};
use std::sync::Arc;

use super::types::{InsultView, PageView};

/// The main service for managing insult documents.
pub struct InsultService {
    pub(super) store: Arc<dyn DocumentStore>,
    pub(super) sinks: Vec<Arc<dyn MetricSink>>,
    pub(super) page_size: usize,
}

impl InsultService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        sinks: Vec<Arc<dyn MetricSink>>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            sinks,
            page_size,
        }
    }

    /// Record one completed request. Log-write failures never surface.
    pub fn log_request(&self, entry: &LogEntry) {
        if let Err(err) = self.store.store_log(entry) {
            tracing::error!(%err, "failed to store request log entry");
        }
    }

    /// Decode a client cursor token, mapping failures to BadRequest.
    pub(super) fn decode_cursor(
        &self,
        token: Option<&str>,
        expected: KeyKind,
    ) -> Result<Option<Cursor>, AppError> {
        match token {
            Some(token) => Cursor::decode(token, expected)
                .map(Some)
                .map_err(|err| AppError::BadRequest(err.to_string())),
            None => Ok(None),
        }
    }

    /// Cut one page out of a sorted view.
    pub(super) fn page_of(&self, rows: &[ViewRow], start: Option<&Cursor>) -> PageView {
        let page = paginate(rows, self.page_size, start);
        PageView {
            next: page.next.map(|cursor| cursor.encode()),
            insults: page.items.into_iter().map(InsultView::from).collect(),
        }
    }
}
