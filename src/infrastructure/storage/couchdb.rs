//! CouchDB adapter for the document store port.
//!
//! Talks plain HTTP to a CouchDB database holding both insult and
//! request-log documents. The sorted views and the score-increment update
//! function live in one design document that [`CouchDbStore::ensure_setup`]
//! installs at startup.

use crate::domain::model::{
    CategoryScore, Insult, LogEntry, StoredInsult, ViewKey, ViewRow, INSULT_DOC_TYPE, LOG_DOC_TYPE,
};
use crate::domain::ports::{DocumentStore, IncrementOutcome, StoreError};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const DESIGN_DOC: &str = "_design/insults";

const SCORE_MAP: &str = "function (doc) {
  if (doc.doc_type == 'insult') {
    emit(doc.score == null ? 0 : doc.score, null);
  }
}";

const BY_CATEGORY_MAP: &str = "function (doc) {
  if (doc.doc_type == 'insult') {
    emit(doc.category.toLowerCase(), null);
  }
}";

const CATEGORY_BY_SCORE_MAP: &str = "function (doc) {
  if (doc.doc_type == 'insult') {
    emit(doc.category, doc.score == null ? 0 : doc.score);
  }
}";

// Random in a map function is a known flaw: the key is fixed at index
// time, not per query. Kept as-is; the random endpoint is documented as
// biased.
const BY_RANDOM_MAP: &str = "function (doc) {
  if (doc.doc_type == 'insult') {
    emit(Math.random(), null);
  }
}";

const INCREMENT_SCORE_FN: &str = "function (doc, req) {
  if (!doc) {
    return [null, {\"body\": JSON.stringify({\"status\": \"not found\"}), \"code\": 404}];
  }
  if (doc['doc_type'] == 'insult') {
    doc['score'] = (doc['score'] == null ? 0 : doc['score']) + 1;
    return [doc, JSON.stringify({\"status\": \"updated\"})];
  }
  return [null, {\"body\": JSON.stringify({\"status\": \"incorrect document type\"}), \"code\": 412}];
}";

pub struct CouchDbStore {
    client: Client,
    base: String,
    database: String,
}

#[derive(Debug, Deserialize)]
struct CouchDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_rev")]
    rev: String,
    #[serde(flatten)]
    insult: Insult,
}

impl CouchDoc {
    fn into_stored(self) -> StoredInsult {
        StoredInsult {
            id: self.id,
            rev: self.rev,
            insult: self.insult,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WriteAck {
    id: String,
    rev: String,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    key: serde_json::Value,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    doc: Option<CouchDoc>,
}

#[derive(Debug, Deserialize)]
struct ViewResponse {
    rows: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
struct UpdateFnResponse {
    status: String,
}

impl CouchDbStore {
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(Self {
            client,
            base: base_url.into().trim_end_matches('/').to_string(),
            database: database.into(),
        })
    }

    fn db_url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/{}", self.base, self.database)
        } else {
            format!("{}/{}/{}", self.base, self.database, path)
        }
    }

    /// Create the database if missing and install (or refresh) the design
    /// document holding the views and the increment_score update function.
    pub fn ensure_setup(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.db_url(""))
            .send()
            .map_err(store_unreachable)?;
        match response.status() {
            StatusCode::CREATED | StatusCode::PRECONDITION_FAILED => {}
            status => {
                return Err(StoreError::Unavailable(format!(
                    "database creation failed: HTTP {}",
                    status
                )))
            }
        }

        let mut ddoc = json!({
            "views": {
                "score": {"map": SCORE_MAP},
                "by_category": {"map": BY_CATEGORY_MAP, "reduce": "_count"},
                "category_by_score": {"map": CATEGORY_BY_SCORE_MAP, "reduce": "_sum"},
                "by_random": {"map": BY_RANDOM_MAP},
            },
            "updates": {"increment_score": INCREMENT_SCORE_FN},
        });

        // Carry the existing revision so the install is an update, not a
        // conflict, on restart.
        let current = self
            .client
            .get(self.db_url(DESIGN_DOC))
            .send()
            .map_err(store_unreachable)?;
        if current.status().is_success() {
            let body: serde_json::Value = current
                .json()
                .map_err(|err| StoreError::InvalidResponse(err.to_string()))?;
            if let Some(rev) = body.get("_rev") {
                ddoc["_rev"] = rev.clone();
            }
        }

        let response = self
            .client
            .put(self.db_url(DESIGN_DOC))
            .json(&ddoc)
            .send()
            .map_err(store_unreachable)?;
        if !response.status().is_success() {
            return Err(StoreError::Unavailable(format!(
                "design document install failed: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn view_named(
        &self,
        name: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<RawRow>, StoreError> {
        let url = format!("{}/_view/{}", self.db_url(DESIGN_DOC), name);
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .map_err(store_unreachable)?;
        if !response.status().is_success() {
            return Err(StoreError::Unavailable(format!(
                "view {} failed: HTTP {}",
                name,
                response.status()
            )));
        }
        let body: ViewResponse = response
            .json()
            .map_err(|err| StoreError::InvalidResponse(err.to_string()))?;
        Ok(body.rows)
    }

    fn doc_rows(&self, name: &str, params: &[(&str, String)]) -> Result<Vec<ViewRow>, StoreError> {
        let rows = self.view_named(name, params)?;
        rows.into_iter()
            .map(|row| {
                let key = parse_key(&row.key)?;
                let doc = row
                    .doc
                    .ok_or_else(|| {
                        StoreError::InvalidResponse("view row missing document".to_string())
                    })?
                    .into_stored();
                Ok(ViewRow { key, doc })
            })
            .collect()
    }
}

impl DocumentStore for CouchDbStore {
    fn load(&self, id: &str) -> Result<Option<StoredInsult>, StoreError> {
        let response = self
            .client
            .get(self.db_url(id))
            .send()
            .map_err(store_unreachable)?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: serde_json::Value = response
                    .json()
                    .map_err(|err| StoreError::InvalidResponse(err.to_string()))?;
                parse_insult_doc(body)
            }
            status => Err(StoreError::Unavailable(format!(
                "load failed: HTTP {}",
                status
            ))),
        }
    }

    fn create(&self, insult: &Insult) -> Result<StoredInsult, StoreError> {
        #[derive(Serialize)]
        struct NewDoc<'a> {
            doc_type: &'static str,
            #[serde(flatten)]
            insult: &'a Insult,
        }

        let response = self
            .client
            .post(self.db_url(""))
            .json(&NewDoc {
                doc_type: INSULT_DOC_TYPE,
                insult,
            })
            .send()
            .map_err(store_unreachable)?;
        if !response.status().is_success() {
            return Err(StoreError::Unavailable(format!(
                "create failed: HTTP {}",
                response.status()
            )));
        }
        let ack: WriteAck = response
            .json()
            .map_err(|err| StoreError::InvalidResponse(err.to_string()))?;
        Ok(StoredInsult {
            id: ack.id,
            rev: ack.rev,
            insult: insult.clone(),
        })
    }

    fn save(&self, id: &str, expected_rev: &str, insult: &Insult) -> Result<String, StoreError> {
        #[derive(Serialize)]
        struct SaveDoc<'a> {
            #[serde(rename = "_rev")]
            rev: &'a str,
            doc_type: &'static str,
            #[serde(flatten)]
            insult: &'a Insult,
        }

        let response = self
            .client
            .put(self.db_url(id))
            .json(&SaveDoc {
                rev: expected_rev,
                doc_type: INSULT_DOC_TYPE,
                insult,
            })
            .send()
            .map_err(store_unreachable)?;
        match response.status() {
            StatusCode::CONFLICT => Err(StoreError::Conflict),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            status if status.is_success() => {
                let ack: WriteAck = response
                    .json()
                    .map_err(|err| StoreError::InvalidResponse(err.to_string()))?;
                Ok(ack.rev)
            }
            status => Err(StoreError::Unavailable(format!(
                "save failed: HTTP {}",
                status
            ))),
        }
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        // CouchDB requires the current revision to delete.
        let current = self.load(id)?.ok_or(StoreError::NotFound)?;
        let response = self
            .client
            .delete(self.db_url(id))
            .query(&[("rev", current.rev.as_str())])
            .send()
            .map_err(store_unreachable)?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            StatusCode::CONFLICT => Err(StoreError::Conflict),
            status if status.is_success() => Ok(()),
            status => Err(StoreError::Unavailable(format!(
                "delete failed: HTTP {}",
                status
            ))),
        }
    }

    fn score_view(&self) -> Result<Vec<ViewRow>, StoreError> {
        self.doc_rows("score", &[("include_docs", "true".to_string())])
    }

    fn by_category(&self, category: &str) -> Result<Vec<ViewRow>, StoreError> {
        self.doc_rows("by_category", &category_params(category)?)
    }

    fn category_scores(&self) -> Result<Vec<CategoryScore>, StoreError> {
        let rows = self.view_named("category_by_score", &[("group", "true".to_string())])?;
        rows.into_iter()
            .map(|row| {
                let category = row
                    .key
                    .as_str()
                    .ok_or_else(|| {
                        StoreError::InvalidResponse("non-string category key".to_string())
                    })?
                    .to_string();
                let score = row.value.as_i64().ok_or_else(|| {
                    StoreError::InvalidResponse("non-integer category sum".to_string())
                })?;
                Ok(CategoryScore { category, score })
            })
            .collect()
    }

    fn by_random(&self, start: f64, descending: bool) -> Result<Option<StoredInsult>, StoreError> {
        // Keys of this view are floats, not pagination keys; take the
        // document and ignore them.
        let rows = self.view_named("by_random", &random_params(start, descending))?;
        rows.into_iter()
            .next()
            .map(|row| {
                row.doc
                    .map(CouchDoc::into_stored)
                    .ok_or_else(|| {
                        StoreError::InvalidResponse("view row missing document".to_string())
                    })
            })
            .transpose()
    }

    fn increment_score(&self, id: &str) -> Result<IncrementOutcome, StoreError> {
        let url = format!("{}/_update/increment_score/{}", self.db_url(DESIGN_DOC), id);
        let response = self.client.post(url).send().map_err(store_unreachable)?;
        let status = response.status();
        let body = response.bytes().map_err(store_unreachable)?;
        increment_outcome(status, &body)
    }

    fn store_log(&self, entry: &LogEntry) -> Result<(), StoreError> {
        #[derive(Serialize)]
        struct LogDoc<'a> {
            doc_type: &'static str,
            #[serde(flatten)]
            entry: &'a LogEntry,
        }

        let response = self
            .client
            .post(self.db_url(""))
            .json(&LogDoc {
                doc_type: LOG_DOC_TYPE,
                entry,
            })
            .send()
            .map_err(store_unreachable)?;
        if !response.status().is_success() {
            return Err(StoreError::Unavailable(format!(
                "log write failed: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

fn store_unreachable(err: reqwest::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn parse_key(key: &serde_json::Value) -> Result<ViewKey, StoreError> {
    match key {
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(ViewKey::Int)
            .ok_or_else(|| StoreError::InvalidResponse("non-integer view key".to_string())),
        serde_json::Value::String(s) => Ok(ViewKey::Str(s.clone())),
        other => Err(StoreError::InvalidResponse(format!(
            "unsupported view key: {}",
            other
        ))),
    }
}

/// View keys are JSON values, so the category key must be sent as a JSON
/// string. Percent-encoding is left to the HTTP client.
fn category_params(category: &str) -> Result<Vec<(&'static str, String)>, StoreError> {
    let key = serde_json::to_string(category)
        .map_err(|err| StoreError::InvalidResponse(err.to_string()))?;
    Ok(vec![
        ("key", key),
        ("include_docs", "true".to_string()),
        ("reduce", "false".to_string()),
    ])
}

fn random_params(start: f64, descending: bool) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("startkey", start.to_string()),
        ("limit", "1".to_string()),
        ("include_docs", "true".to_string()),
    ];
    if descending {
        params.push(("descending", "true".to_string()));
    }
    params
}

/// Documents share one database, so a fetched id may name a request-log
/// entry. Anything without the insult doc_type reads as absent.
fn parse_insult_doc(body: serde_json::Value) -> Result<Option<StoredInsult>, StoreError> {
    if body.get("doc_type").and_then(serde_json::Value::as_str) != Some(INSULT_DOC_TYPE) {
        return Ok(None);
    }
    let doc: CouchDoc =
        serde_json::from_value(body).map_err(|err| StoreError::InvalidResponse(err.to_string()))?;
    Ok(Some(doc.into_stored()))
}

fn increment_outcome(status: StatusCode, body: &[u8]) -> Result<IncrementOutcome, StoreError> {
    match status {
        StatusCode::NOT_FOUND => Ok(IncrementOutcome::NotFound),
        StatusCode::PRECONDITION_FAILED => Ok(IncrementOutcome::IncorrectType),
        status if status.is_success() => {
            let parsed: UpdateFnResponse = serde_json::from_slice(body)
                .map_err(|err| StoreError::InvalidResponse(err.to_string()))?;
            if parsed.status == "updated" {
                Ok(IncrementOutcome::Updated)
            } else {
                Err(StoreError::InvalidResponse(format!(
                    "increment_score returned status {:?}",
                    parsed.status
                )))
            }
        }
        status => Err(StoreError::Unavailable(format!(
            "increment_score failed: HTTP {}",
            status
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_keys_parse_by_json_type() {
        assert_eq!(parse_key(&json!(7)).unwrap(), ViewKey::Int(7));
        assert_eq!(
            parse_key(&json!("puns")).unwrap(),
            ViewKey::Str("puns".to_string())
        );
        assert!(parse_key(&json!([1, 2])).is_err());
    }

    #[test]
    fn category_query_sends_a_json_string_key() {
        let params = category_params("yo mama").unwrap();
        assert_eq!(
            params,
            vec![
                ("key", "\"yo mama\"".to_string()),
                ("include_docs", "true".to_string()),
                ("reduce", "false".to_string()),
            ]
        );
    }

    #[test]
    fn random_query_adds_descending_only_on_fallback() {
        let forward = random_params(0.25, false);
        assert!(!forward.iter().any(|(name, _)| *name == "descending"));
        let fallback = random_params(0.25, true);
        assert_eq!(fallback.last(), Some(&("descending", "true".to_string())));
    }

    #[test]
    fn loading_a_log_document_reads_as_absent() {
        let body = json!({
            "_id": "abc123",
            "_rev": "1-deadbeef",
            "doc_type": "log_entry",
            "method": "GET",
            "path": "/insult",
            "ip": "127.0.0.1",
            "time": "2026-08-29T00:00:00Z",
            "status": 200,
        });
        assert!(parse_insult_doc(body).unwrap().is_none());
    }

    #[test]
    fn loading_an_insult_document_parses_fields() {
        let body = json!({
            "_id": "abc123",
            "_rev": "2-deadbeef",
            "doc_type": "insult",
            "author": "anon",
            "insult": "you fight like a dairy farmer",
            "category": "pirate",
            "score": 3,
        });
        let doc = parse_insult_doc(body).unwrap().unwrap();
        assert_eq!(doc.id, "abc123");
        assert_eq!(doc.rev, "2-deadbeef");
        assert_eq!(doc.insult.category, "pirate");
        assert_eq!(doc.insult.score, Some(3));
    }

    #[test]
    fn increment_maps_status_before_reading_the_body() {
        assert_eq!(
            increment_outcome(StatusCode::OK, b"{\"status\": \"updated\"}").unwrap(),
            IncrementOutcome::Updated
        );
        assert_eq!(
            increment_outcome(StatusCode::NOT_FOUND, b"{\"status\": \"not found\"}").unwrap(),
            IncrementOutcome::NotFound
        );
        assert_eq!(
            increment_outcome(StatusCode::PRECONDITION_FAILED, b"not json").unwrap(),
            IncrementOutcome::IncorrectType
        );
    }

    #[test]
    fn increment_surfaces_server_errors_as_unavailable() {
        let err =
            increment_outcome(StatusCode::INTERNAL_SERVER_ERROR, b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn increment_rejects_success_with_an_unknown_body() {
        let err = increment_outcome(StatusCode::OK, b"{\"status\": \"??\"}").unwrap_err();
        assert!(matches!(err, StoreError::InvalidResponse(_)));
    }
}
