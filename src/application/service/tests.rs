//! Integration tests for InsultService.

use crate::application::error::AppError;
use crate::application::service::{InsultService, LikeStatus, UpdateCommand};
use crate::domain::model::{CategoryScore, Insult, LogEntry, StoredInsult, ViewRow};
use crate::domain::ports::{
    DocumentStore, IncrementOutcome, MetricSink, SinkError, StoreError, TimeUnit,
};
use crate::infrastructure::storage::MemoryStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Store wrapper that injects save conflicts before letting writes
/// through to the in-memory store.
struct ConflictingStore {
    inner: MemoryStore,
    conflicts_remaining: AtomicUsize,
    save_attempts: AtomicUsize,
    fail_unavailable: bool,
}

impl ConflictingStore {
    fn new(conflicts: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            conflicts_remaining: AtomicUsize::new(conflicts),
            save_attempts: AtomicUsize::new(0),
            fail_unavailable: false,
        }
    }

    fn unavailable() -> Self {
        Self {
            inner: MemoryStore::new(),
            conflicts_remaining: AtomicUsize::new(0),
            save_attempts: AtomicUsize::new(0),
            fail_unavailable: true,
        }
    }

    fn save_attempts(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }
}

impl DocumentStore for ConflictingStore {
    fn load(&self, id: &str) -> Result<Option<StoredInsult>, StoreError> {
        self.inner.load(id)
    }

    fn create(&self, insult: &Insult) -> Result<StoredInsult, StoreError> {
        self.inner.create(insult)
    }

    fn save(&self, id: &str, expected_rev: &str, insult: &Insult) -> Result<String, StoreError> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_unavailable {
            return Err(StoreError::Unavailable("store down".to_string()));
        }
        if self
            .conflicts_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Conflict);
        }
        self.inner.save(id, expected_rev, insult)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete(id)
    }

    fn score_view(&self) -> Result<Vec<ViewRow>, StoreError> {
        self.inner.score_view()
    }

    fn by_category(&self, category: &str) -> Result<Vec<ViewRow>, StoreError> {
        self.inner.by_category(category)
    }

    fn category_scores(&self) -> Result<Vec<CategoryScore>, StoreError> {
        self.inner.category_scores()
    }

    fn by_random(&self, start: f64, descending: bool) -> Result<Option<StoredInsult>, StoreError> {
        self.inner.by_random(start, descending)
    }

    fn increment_score(&self, id: &str) -> Result<IncrementOutcome, StoreError> {
        self.inner.increment_score(id)
    }

    fn store_log(&self, entry: &LogEntry) -> Result<(), StoreError> {
        self.inner.store_log(entry)
    }
}

/// Sink that remembers everything it was asked to deliver.
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<(String, Vec<String>)> {
        self.events.lock().unwrap().clone()
    }
}

impl MetricSink for RecordingSink {
    fn unit(&self) -> TimeUnit {
        TimeUnit::Seconds
    }

    fn send(&self, name: &str, _value: f64, tags: &[&str]) -> Result<(), SinkError> {
        self.events.lock().unwrap().push((
            name.to_string(),
            tags.iter().map(|t| t.to_string()).collect(),
        ));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn insult(author: &str, text: &str, category: &str, score: Option<i64>) -> Insult {
    Insult {
        author: author.to_string(),
        insult: text.to_string(),
        category: category.to_string(),
        score,
    }
}

fn service_with(store: Arc<dyn DocumentStore>) -> InsultService {
    InsultService::new(store, Vec::new(), 50)
}

fn memory_service() -> (InsultService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (service_with(store.clone()), store)
}

#[test]
fn create_then_get_returns_the_submitted_fields() {
    let (service, _) = memory_service();

    let created = service.create(insult("A", "B", "C", None)).unwrap();
    assert!(!created.id.is_empty());

    let fetched = service.get(&created.id).unwrap();
    assert_eq!(fetched.insult.author, "A");
    assert_eq!(fetched.insult.insult, "B");
    assert_eq!(fetched.insult.category, "C");
    assert!(fetched.insult.score.is_none());
}

#[test]
fn get_missing_is_not_found() {
    let (service, _) = memory_service();
    assert!(matches!(service.get("nope"), Err(AppError::NotFound(_))));
}

#[test]
fn update_patches_only_the_given_fields() {
    let (service, _) = memory_service();
    let created = service.create(insult("A", "B", "C", Some(4))).unwrap();

    let patch = UpdateCommand {
        insult: Some("sharper".to_string()),
        ..Default::default()
    };
    let updated = service.update(&created.id, &patch).unwrap();

    assert_eq!(updated.insult.insult, "sharper");
    assert_eq!(updated.insult.author, "A");
    assert_eq!(updated.insult.category, "C");
    assert_eq!(updated.insult.score, Some(4));
    assert_ne!(updated.rev, created.rev);
}

#[test]
fn update_missing_is_not_found() {
    let (service, _) = memory_service();
    assert!(matches!(
        service.update("nope", &UpdateCommand::default()),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn update_survives_transient_conflicts() {
    let store = Arc::new(ConflictingStore::new(2));
    let service = service_with(store.clone());
    let created = service.create(insult("A", "B", "C", None)).unwrap();

    let patch = UpdateCommand {
        author: Some("A2".to_string()),
        ..Default::default()
    };
    let updated = service.update(&created.id, &patch).unwrap();

    assert_eq!(updated.insult.author, "A2");
    // Two conflicting attempts, then the successful third.
    assert_eq!(store.save_attempts(), 3);
}

#[test]
fn update_gives_up_after_three_conflicts() {
    let store = Arc::new(ConflictingStore::new(3));
    let service = service_with(store.clone());
    let created = service.create(insult("A", "B", "C", None)).unwrap();

    let err = service
        .update(&created.id, &UpdateCommand::default())
        .unwrap_err();
    match err {
        AppError::Conflict(id) => assert_eq!(id, created.id),
        other => panic!("expected conflict, got {:?}", other),
    }
    assert_eq!(store.save_attempts(), 3);

    // The document is untouched; no partial write happened.
    let current = service.get(&created.id).unwrap();
    assert_eq!(current.rev, created.rev);
}

#[test]
fn non_conflict_store_errors_are_not_retried() {
    let store = Arc::new(ConflictingStore::unavailable());
    let service = service_with(store.clone());
    let created = service.create(insult("A", "B", "C", None)).unwrap();

    let err = service
        .update(&created.id, &UpdateCommand::default())
        .unwrap_err();
    assert!(matches!(err, AppError::Store(_)));
    assert_eq!(store.save_attempts(), 1);
}

#[test]
fn delete_removes_the_document() {
    let (service, _) = memory_service();
    let created = service.create(insult("A", "B", "C", None)).unwrap();

    service.delete(&created.id).unwrap();
    assert!(matches!(
        service.get(&created.id),
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.delete(&created.id),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn like_increments_the_category_aggregate_by_one() {
    let (service, _) = memory_service();
    let created = service.create(insult("A", "B", "C", None)).unwrap();
    service.create(insult("A", "other", "D", Some(10))).unwrap();

    assert_eq!(service.like(&created.id).unwrap(), LikeStatus::Updated);

    // C now aggregates to 1, still below D's 10, so it sorts first.
    assert_eq!(service.categories().unwrap(), vec!["C", "D"]);
    assert_eq!(service.get(&created.id).unwrap().insult.score, Some(1));
}

#[test]
fn like_distinguishes_missing_from_wrong_type() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(store.clone());

    assert_eq!(service.like("missing").unwrap(), LikeStatus::NotFound);

    store.insert_log_at(
        "log-doc",
        &LogEntry {
            method: "GET".to_string(),
            path: "/health".to_string(),
            ip: "127.0.0.1".to_string(),
            time: chrono::Utc::now(),
            status: 200,
        },
    );
    assert_eq!(service.like("log-doc").unwrap(), LikeStatus::IncorrectType);
}

#[test]
fn like_emits_counter_and_timer_events() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::new());
    let service = InsultService::new(store, vec![sink.clone()], 50);
    let created = service.create(insult("A", "B", "C", None)).unwrap();

    sink.events.lock().unwrap().clear();
    service.like(&created.id).unwrap();

    let events = sink.events();
    assert!(events
        .iter()
        .any(|(name, tags)| name == "like" && tags == &["counter".to_string()]));
    assert!(events
        .iter()
        .any(|(name, tags)| name == "like.success" && tags == &["timer".to_string()]));
}

#[test]
fn list_walks_every_insult_exactly_once() {
    let (service, _) = memory_service();
    for i in 0..120 {
        service
            .create(insult("A", &format!("insult {}", i), "C", Some(i)))
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut start: Option<String> = None;
    let mut pages = 0;
    loop {
        let page = service.list(start.as_deref()).unwrap();
        pages += 1;
        seen.extend(page.insults.iter().map(|view| view.id.clone()));
        match page.next {
            Some(next) => start = Some(next),
            None => break,
        }
    }

    assert_eq!(pages, 3);
    assert_eq!(seen.len(), 120);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 120, "pagination repeated a document");
}

#[test]
fn list_is_ordered_by_score() {
    let (service, _) = memory_service();
    service.create(insult("A", "x", "C", Some(9))).unwrap();
    service.create(insult("A", "y", "C", None)).unwrap();
    service.create(insult("A", "z", "C", Some(3))).unwrap();

    let page = service.list(None).unwrap();
    let scores: Vec<Option<i64>> = page.insults.iter().map(|view| view.score).collect();
    assert_eq!(scores, vec![None, Some(3), Some(9)]);
}

#[test]
fn malformed_cursor_is_a_bad_request() {
    let (service, _) = memory_service();
    assert!(matches!(
        service.list(Some("%%%not-a-cursor%%%")),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn category_cursor_does_not_fit_the_score_view() {
    let (service, _) = memory_service();
    for i in 0..60 {
        service
            .create(insult("A", &format!("i{}", i), "puns", None))
            .unwrap();
    }
    let category_page = service.list_category("puns", None).unwrap();
    let token = category_page.next.unwrap();

    assert!(matches!(
        service.list(Some(&token)),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn list_category_only_returns_that_category() {
    let (service, _) = memory_service();
    service.create(insult("A", "x", "Puns", None)).unwrap();
    service.create(insult("A", "y", "puns", None)).unwrap();
    service.create(insult("A", "z", "limericks", None)).unwrap();

    let page = service.list_category("puns", None).unwrap();
    assert_eq!(page.insults.len(), 2);
    assert!(page.next.is_none());
}

#[test]
fn categories_sort_ascending_by_aggregate_score() {
    let (service, _) = memory_service();
    service.create(insult("A", "a", "high", Some(50))).unwrap();
    service.create(insult("A", "b", "low", Some(1))).unwrap();
    service.create(insult("A", "c", "mid", Some(10))).unwrap();
    service.create(insult("A", "d", "mid", Some(5))).unwrap();

    assert_eq!(service.categories().unwrap(), vec!["low", "mid", "high"]);
}

#[test]
fn random_returns_some_document_when_nonempty() {
    let (service, _) = memory_service();
    service.create(insult("A", "only one", "C", None)).unwrap();

    let doc = service.random().unwrap();
    assert_eq!(doc.insult.insult, "only one");
}

#[test]
fn random_on_empty_store_is_not_found() {
    let (service, _) = memory_service();
    assert!(matches!(service.random(), Err(AppError::NotFound(_))));
}

#[test]
fn request_logging_appends_one_document() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(store.clone());

    service.log_request(&LogEntry {
        method: "GET".to_string(),
        path: "/insult".to_string(),
        ip: "10.0.0.1".to_string(),
        time: chrono::Utc::now(),
        status: 200,
    });

    assert_eq!(store.log_count(), 1);
}
