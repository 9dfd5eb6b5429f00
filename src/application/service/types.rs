use crate::domain::model::{Insult, StoredInsult};
use serde::{Deserialize, Serialize};

/// Create-request body. Unknown fields are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewInsult {
    pub author: String,
    pub insult: String,
    pub category: String,
    #[serde(default)]
    pub score: Option<i64>,
}

impl From<NewInsult> for Insult {
    fn from(new: NewInsult) -> Self {
        Insult {
            author: new.author,
            insult: new.insult,
            category: new.category,
            score: new.score,
        }
    }
}

/// Partial update applied to an insult document. Absent fields are left
/// untouched; unknown fields are rejected at deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommand {
    pub author: Option<String>,
    pub insult: Option<String>,
    pub category: Option<String>,
    pub score: Option<i64>,
}

/// Public shape of an insult document.
#[derive(Debug, Clone, Serialize)]
pub struct InsultView {
    pub id: String,
    pub author: String,
    pub insult: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

impl From<StoredInsult> for InsultView {
    fn from(doc: StoredInsult) -> Self {
        Self {
            id: doc.id,
            author: doc.insult.author,
            insult: doc.insult.insult,
            category: doc.insult.category,
            score: doc.insult.score,
        }
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub next: Option<String>,
    pub insults: Vec<InsultView>,
}

/// Create-response body.
#[derive(Debug, Clone, Serialize)]
pub struct IdOnly {
    pub id: String,
}

/// Outcome of the like operation as reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeStatus {
    Updated,
    NotFound,
    IncorrectType,
}

impl LikeStatus {
    pub fn message(self) -> &'static str {
        match self {
            LikeStatus::Updated => "updated",
            LikeStatus::NotFound => "not found",
            LikeStatus::IncorrectType => "incorrect document type",
        }
    }
}
