use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type tag carried by insult documents.
pub const INSULT_DOC_TYPE: &str = "insult";
/// Type tag carried by request-log documents.
pub const LOG_DOC_TYPE: &str = "log_entry";

/// Client-owned fields of an insult document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insult {
    pub author: String,
    pub insult: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

/// An insult as held by the store: client fields plus the
/// store-assigned identity and revision token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredInsult {
    pub id: String,
    pub rev: String,
    #[serde(flatten)]
    pub insult: Insult,
}

impl StoredInsult {
    /// Score with the absent-means-zero default applied.
    pub fn effective_score(&self) -> i64 {
        self.insult.score.unwrap_or(0)
    }
}

/// One immutable record per completed HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub method: String,
    pub path: String,
    pub ip: String,
    pub time: DateTime<Utc>,
    pub status: u16,
}

/// Sort key of a view row. Ordering matches the store's collation:
/// integer keys sort before string keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewKey {
    Int(i64),
    Str(String),
}

impl ViewKey {
    pub fn kind(&self) -> KeyKind {
        match self {
            ViewKey::Int(_) => KeyKind::Int,
            ViewKey::Str(_) => KeyKind::Str,
        }
    }
}

/// Expected key type of a view, used to validate decoded cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Int,
    Str,
}

/// A single row of a sorted view, with its document included.
#[derive(Debug, Clone)]
pub struct ViewRow {
    pub key: ViewKey,
    pub doc: StoredInsult,
}

impl ViewRow {
    /// The `(key, id)` pair the view is sorted by.
    pub fn sort_key(&self) -> (&ViewKey, &str) {
        (&self.key, &self.doc.id)
    }
}

/// Aggregate score of one category, summed over its insults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryScore {
    pub category: String,
    pub score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_score_defaults_to_zero() {
        let insult: Insult =
            serde_json::from_str(r#"{"author":"a","insult":"b","category":"c"}"#).unwrap();
        let stored = StoredInsult {
            id: "x".to_string(),
            rev: "1-a".to_string(),
            insult,
        };
        assert_eq!(stored.effective_score(), 0);
        assert!(stored.insult.score.is_none());
    }

    #[test]
    fn int_keys_collate_before_string_keys() {
        assert!(ViewKey::Int(i64::MAX) < ViewKey::Str("".to_string()));
        assert!(ViewKey::Int(-3) < ViewKey::Int(7));
        assert!(ViewKey::Str("jokes".to_string()) < ViewKey::Str("puns".to_string()));
    }
}
