//! In-process document store with CouchDB-like revision semantics.
//!
//! Used for local development and tests. Both document collections live
//! in one map, distinguished by their type tag, and all mutation runs
//! under a single lock so the increment transform keeps the same
//! conflict-free guarantee the real store gives it.

use crate::domain::model::{CategoryScore, Insult, LogEntry, StoredInsult, ViewKey, ViewRow};
use crate::domain::ports::{DocumentStore, IncrementOutcome, StoreError};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
enum DocBody {
    Insult(Insult),
    Log(LogEntry),
}

#[derive(Debug, Clone)]
struct MemoryDoc {
    rev: String,
    /// Random sort key fixed at write time, mirroring the store-side
    /// random view. This is what makes the random endpoint biased.
    random_key: f64,
    body: DocBody,
}

#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, MemoryDoc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_rev(current: Option<&str>) -> String {
        let generation = current
            .and_then(|rev| rev.split('-').next())
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0);
        format!("{}-{}", generation + 1, Uuid::new_v4().simple())
    }

    fn insult_rows<F>(&self, mut accept: F) -> Vec<(String, Insult, f64)>
    where
        F: FnMut(&Insult) -> bool,
    {
        self.docs
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(id, doc)| match &doc.body {
                DocBody::Insult(insult) if accept(insult) => {
                    Some((id.clone(), insult.clone(), doc.random_key))
                }
                _ => None,
            })
            .collect()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, id: &str) -> Result<Option<StoredInsult>, StoreError> {
        let docs = self.docs.lock().unwrap();
        match docs.get(id) {
            Some(MemoryDoc {
                rev,
                body: DocBody::Insult(insult),
                ..
            }) => Ok(Some(StoredInsult {
                id: id.to_string(),
                rev: rev.clone(),
                insult: insult.clone(),
            })),
            _ => Ok(None),
        }
    }

    fn create(&self, insult: &Insult) -> Result<StoredInsult, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let rev = Self::next_rev(None);
        let mut docs = self.docs.lock().unwrap();
        docs.insert(
            id.clone(),
            MemoryDoc {
                rev: rev.clone(),
                random_key: rand::thread_rng().gen::<f64>(),
                body: DocBody::Insult(insult.clone()),
            },
        );
        Ok(StoredInsult {
            id,
            rev,
            insult: insult.clone(),
        })
    }

    fn save(&self, id: &str, expected_rev: &str, insult: &Insult) -> Result<String, StoreError> {
        let mut docs = self.docs.lock().unwrap();
        let doc = docs.get_mut(id).ok_or(StoreError::NotFound)?;
        if doc.rev != expected_rev {
            return Err(StoreError::Conflict);
        }
        doc.rev = Self::next_rev(Some(&doc.rev));
        doc.body = DocBody::Insult(insult.clone());
        Ok(doc.rev.clone())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().unwrap();
        docs.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    fn score_view(&self) -> Result<Vec<ViewRow>, StoreError> {
        let mut rows: Vec<ViewRow> = self
            .insult_rows(|_| true)
            .into_iter()
            .map(|(id, insult, _)| {
                let doc = StoredInsult {
                    id,
                    rev: String::new(),
                    insult,
                };
                ViewRow {
                    key: ViewKey::Int(doc.effective_score()),
                    doc,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        fill_revs(&mut rows, &self.docs.lock().unwrap());
        Ok(rows)
    }

    fn by_category(&self, category: &str) -> Result<Vec<ViewRow>, StoreError> {
        let mut rows: Vec<ViewRow> = self
            .insult_rows(|insult| insult.category.to_lowercase() == category)
            .into_iter()
            .map(|(id, insult, _)| ViewRow {
                key: ViewKey::Str(insult.category.to_lowercase()),
                doc: StoredInsult {
                    id,
                    rev: String::new(),
                    insult,
                },
            })
            .collect();
        rows.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        fill_revs(&mut rows, &self.docs.lock().unwrap());
        Ok(rows)
    }

    fn category_scores(&self) -> Result<Vec<CategoryScore>, StoreError> {
        let mut sums: HashMap<String, i64> = HashMap::new();
        for (_, insult, _) in self.insult_rows(|_| true) {
            *sums.entry(insult.category.clone()).or_insert(0) += insult.score.unwrap_or(0);
        }
        Ok(sums
            .into_iter()
            .map(|(category, score)| CategoryScore { category, score })
            .collect())
    }

    fn by_random(&self, start: f64, descending: bool) -> Result<Option<StoredInsult>, StoreError> {
        let mut rows = self.insult_rows(|_| true);
        rows.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));
        let hit = if descending {
            rows.iter().rev().find(|(_, _, key)| *key <= start)
        } else {
            rows.iter().find(|(_, _, key)| *key >= start)
        };
        Ok(hit.map(|(id, insult, _)| {
            let rev = self
                .docs
                .lock()
                .unwrap()
                .get(id)
                .map(|doc| doc.rev.clone())
                .unwrap_or_default();
            StoredInsult {
                id: id.clone(),
                rev,
                insult: insult.clone(),
            }
        }))
    }

    fn increment_score(&self, id: &str) -> Result<IncrementOutcome, StoreError> {
        // Single lock for the whole read-modify-write: this is the
        // in-process equivalent of the store-side update transform.
        let mut docs = self.docs.lock().unwrap();
        match docs.get_mut(id) {
            None => Ok(IncrementOutcome::NotFound),
            Some(doc) => match &mut doc.body {
                DocBody::Insult(insult) => {
                    insult.score = Some(insult.score.unwrap_or(0) + 1);
                    doc.rev = Self::next_rev(Some(&doc.rev));
                    Ok(IncrementOutcome::Updated)
                }
                DocBody::Log(_) => Ok(IncrementOutcome::IncorrectType),
            },
        }
    }

    fn store_log(&self, entry: &LogEntry) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().unwrap();
        docs.insert(
            Uuid::new_v4().simple().to_string(),
            MemoryDoc {
                rev: Self::next_rev(None),
                random_key: rand::thread_rng().gen::<f64>(),
                body: DocBody::Log(entry.clone()),
            },
        );
        Ok(())
    }
}

impl MemoryStore {
    /// Insert a request-log document at a known id. Test hook for the
    /// wrong-document-type path of the increment transform.
    #[cfg(test)]
    pub fn insert_log_at(&self, id: &str, entry: &LogEntry) {
        self.docs.lock().unwrap().insert(
            id.to_string(),
            MemoryDoc {
                rev: Self::next_rev(None),
                random_key: 0.0,
                body: DocBody::Log(entry.clone()),
            },
        );
    }

    #[cfg(test)]
    pub fn log_count(&self) -> usize {
        self.docs
            .lock()
            .unwrap()
            .values()
            .filter(|doc| matches!(doc.body, DocBody::Log(_)))
            .count()
    }
}

fn fill_revs(rows: &mut [ViewRow], docs: &HashMap<String, MemoryDoc>) {
    for row in rows {
        if let Some(doc) = docs.get(&row.doc.id) {
            row.doc.rev = doc.rev.clone();
        }
    }
}
