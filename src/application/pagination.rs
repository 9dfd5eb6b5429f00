//! Cursor-based pagination over sorted view results.
//!
//! A cursor is an opaque token encoding the `(key, id)` pair of the first
//! row the next page should start at. It carries no server-side state, so
//! any page can be re-fetched from the token alone.

use crate::domain::model::{KeyKind, StoredInsult, ViewKey, ViewRow};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected pagination cursor. Always a client-input error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("cursor is not valid base64")]
    Encoding,
    #[error("cursor payload is malformed")]
    Malformed,
    #[error("cursor key type does not match this view")]
    KeyMismatch,
}

/// Position marker derived from a view row's sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub key: ViewKey,
    pub id: String,
}

impl Cursor {
    fn from_row(row: &ViewRow) -> Self {
        Self {
            key: row.key.clone(),
            id: row.doc.id.clone(),
        }
    }

    /// Render as the opaque token handed to clients.
    pub fn encode(&self) -> String {
        let payload = serde_json::json!([self.key, self.id]);
        URL_SAFE_NO_PAD.encode(payload.to_string())
    }

    /// Parse a client-supplied token, checking the key against the view's
    /// expected key type.
    pub fn decode(token: &str, expected: KeyKind) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| CursorError::Encoding)?;
        let (key, id): (ViewKey, String) =
            serde_json::from_slice(&bytes).map_err(|_| CursorError::Malformed)?;
        if key.kind() != expected {
            return Err(CursorError::KeyMismatch);
        }
        Ok(Self { key, id })
    }
}

/// One page of a view plus the token for the next one.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<StoredInsult>,
    pub next: Option<Cursor>,
}

/// Slice a sorted view into a page of at most `page_size` rows, starting
/// at `start` (or the beginning when absent). The next-cursor is taken
/// from the first unconsumed row, or is `None` when the view is
/// exhausted.
///
/// `rows` must already be sorted ascending by `(key, id)`; this is a pure
/// transform and never touches the store.
pub fn paginate(rows: &[ViewRow], page_size: usize, start: Option<&Cursor>) -> Page {
    let from = match start {
        Some(cursor) => rows
            .partition_point(|row| row.sort_key() < (&cursor.key, cursor.id.as_str())),
        None => 0,
    };
    let items = rows
        .iter()
        .skip(from)
        .take(page_size)
        .map(|row| row.doc.clone())
        .collect();
    let next = rows.get(from + page_size).map(Cursor::from_row);
    Page { items, next }
}
