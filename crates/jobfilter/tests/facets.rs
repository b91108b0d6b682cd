mod common;

use common::{at, engine};
use jobfilter::families::{DeadLetterFamily, JobsFamily};
use jobfilter::filters::{FamilyBinding, EMPTY};
use jobfilter::jobs::{JobStatus, NewJob};
use jobfilter::store::{Dataset, MemoryStore, RECORD_COLUMNS};
use jobfilter::FilterError;

use serde_json::json;
use std::sync::Arc;

fn jobs() -> FamilyBinding {
    FamilyBinding::bound(JobsFamily::default())
}

fn classed(queue: Option<&str>, class: &str) -> NewJob {
    NewJob::queued(queue, "adapter_job", at(-1)).with_payload(json!({ "job_class": class }))
}

async fn count(store: &Arc<MemoryStore>, pairs: &[(&str, &str)]) -> i64 {
    engine(store, jobs(), pairs).filtered_count().await.unwrap()
}

#[tokio::test]
async fn queues_label_the_null_queue_and_sort_keys() {
    let store = Arc::new(MemoryStore::new());
    store.insert(NewJob::queued(Some("default"), "A", at(1))).await;
    store.insert(NewJob::queued(Some("mailers"), "B", at(2))).await;
    store.insert(NewJob::queued(None, "C", at(3))).await;

    let queues = engine(&store, jobs(), &[]).queues().await.unwrap();

    assert_eq!(queues.keys(), vec![EMPTY, "default", "mailers"]);
    assert_eq!(queues.get("[none]"), Some(1));
    assert_eq!(queues.get("default"), Some(1));
    assert_eq!(queues.get("mailers"), Some(1));
    assert_eq!(
        serde_json::to_string(&queues).unwrap(),
        r#"{"[none]":1,"default":1,"mailers":1}"#
    );
}

#[tokio::test]
async fn empty_queue_name_merges_with_null() {
    let store = Arc::new(MemoryStore::new());
    store.insert(NewJob::queued(None, "A", at(1))).await;
    store.insert(NewJob::queued(Some(""), "A", at(2))).await;

    let queues = engine(&store, jobs(), &[]).queues().await.unwrap();
    assert_eq!(queues.keys(), vec![EMPTY]);
    assert_eq!(queues.get(EMPTY), Some(2));
}

#[tokio::test]
async fn queues_ignore_every_filter() {
    let store = Arc::new(MemoryStore::new());
    store.insert(NewJob::queued(Some("default"), "A", at(1))).await;
    store
        .insert(NewJob::queued(Some("mailers"), "B", at(2)).with_status(JobStatus::Failed))
        .await;

    let engine = engine(
        &store,
        jobs(),
        &[
            ("queue_name", "mailers"),
            ("state", "failed"),
            ("query", "no such text"),
            ("job_class", "B"),
        ],
    );

    let queues = engine.queues().await.unwrap();
    assert_eq!(queues.total(), 2);
    assert_eq!(engine.filtered_count().await.unwrap(), 0);
}

#[tokio::test]
async fn job_classes_are_scoped_by_queue_only() {
    let store = Arc::new(MemoryStore::new());
    store.insert(classed(Some("mailers"), "WelcomeMail")).await;
    store.insert(classed(Some("mailers"), "WelcomeMail")).await;
    store
        .insert(classed(Some("mailers"), "DigestMail").with_status(JobStatus::Succeeded))
        .await;
    store.insert(classed(Some("default"), "ExportReport")).await;

    let engine = engine(
        &store,
        jobs(),
        &[
            ("queue_name", "mailers"),
            ("job_class", "WelcomeMail"),
            ("state", "running"),
            ("query", "nothing matches this"),
        ],
    );

    let classes = engine.job_classes().await.unwrap();
    assert_eq!(classes.keys(), vec!["DigestMail", "WelcomeMail"]);
    assert_eq!(classes.get("WelcomeMail"), Some(2));
    assert_eq!(classes.get("DigestMail"), Some(1));
}

#[tokio::test]
async fn job_class_falls_back_to_job_type() {
    let store = Arc::new(MemoryStore::new());
    store.insert(NewJob::queued(Some("default"), "PlainJob", at(1))).await;
    store.insert(classed(Some("default"), "AdapterJob")).await;
    store
        .insert(
            NewJob::queued(Some("default"), "NullClass", at(2))
                .with_payload(json!({ "job_class": null })),
        )
        .await;

    let engine = engine(&store, jobs(), &[]);
    let classes = engine.job_classes().await.unwrap();
    assert_eq!(classes.keys(), vec!["AdapterJob", "NullClass", "PlainJob"]);

    let records = engine.records().await.unwrap();
    let mut listed: Vec<_> = records.iter().map(|r| r.job_class.as_str()).collect();
    listed.sort();
    assert_eq!(listed, vec!["AdapterJob", "NullClass", "PlainJob"]);
}

#[tokio::test]
async fn filters_compose_with_and() {
    let store = Arc::new(MemoryStore::new());
    store.insert(classed(Some("mailers"), "WelcomeMail").with_cron_key("welcome:daily")).await;
    store.insert(classed(Some("mailers"), "WelcomeMail")).await;
    store.insert(classed(Some("default"), "WelcomeMail").with_cron_key("welcome:daily")).await;
    store
        .insert(
            classed(Some("mailers"), "WelcomeMail")
                .with_status(JobStatus::Succeeded)
                .finished(at(5)),
        )
        .await;

    assert_eq!(count(&store, &[("queue_name", "mailers")]).await, 3);
    assert_eq!(count(&store, &[("queue_name", "mailers"), ("cron_key", "welcome:daily")]).await, 1);
    assert_eq!(count(&store, &[("job_class", "WelcomeMail"), ("queue_name", "  ")]).await, 4);
    assert_eq!(count(&store, &[("finished_since", "2024-03-01T12:05:00Z")]).await, 1);
    assert_eq!(count(&store, &[("finished_since", "2024-03-01T12:06:00Z")]).await, 0);
    assert_eq!(count(&store, &[("query", "WELCOME:")]).await, 2);
    assert_eq!(count(&store, &[("query", "welcome"), ("queue_name", "default")]).await, 1);
}

#[tokio::test]
async fn states_count_under_every_filter_but_state() {
    let store = Arc::new(MemoryStore::new());
    // Relative to the engine clock `at(0)`.
    store.insert(NewJob::queued(Some("default"), "A", at(-5))).await;
    store.insert(NewJob::queued(Some("default"), "A", at(10))).await;
    store
        .insert(NewJob::queued(Some("default"), "A", at(-5)).with_error("TIMEOUT", "slow"))
        .await;
    store
        .insert(NewJob::queued(Some("default"), "A", at(-5)).with_status(JobStatus::Running))
        .await;
    store
        .insert(NewJob::queued(Some("default"), "A", at(-5)).with_status(JobStatus::Running))
        .await;
    store
        .insert(NewJob::queued(Some("mailers"), "A", at(-5)).with_status(JobStatus::Running))
        .await;

    let engine = engine(&store, jobs(), &[("queue_name", "default"), ("state", "running")]);
    let states = engine.states().await.unwrap();

    assert_eq!(states.len(), engine.state_names().unwrap().len());
    assert_eq!(states.get("queued"), Some(1));
    assert_eq!(states.get("scheduled"), Some(1));
    assert_eq!(states.get("retried"), Some(1));
    assert_eq!(states.get("running"), Some(2));
    assert_eq!(states.get("canceled"), Some(0));
    assert_eq!(states.total(), 5);

    assert_eq!(engine.filtered_count().await.unwrap(), 2);
}

#[tokio::test]
async fn unknown_state_is_rejected_for_jobs() {
    let store = Arc::new(MemoryStore::new());
    store.insert(NewJob::queued(Some("default"), "A", at(1))).await;

    let engine = engine(&store, jobs(), &[("state", "exploded")]);
    let err = engine.filtered_count().await.unwrap_err();
    assert!(matches!(err, FilterError::UnsupportedState { ref state, .. } if state == "exploded"));
    assert!(err.is_client_error());

    // The per-state counts never look at `state`.
    assert!(engine.states().await.is_ok());
}

#[tokio::test]
async fn dead_letter_family_scopes_to_dlq_rows() {
    let store = Arc::new(MemoryStore::new());
    store.insert(NewJob::queued(Some("default"), "A", at(1))).await;
    store
        .insert(NewJob::queued(Some("default"), "A", at(2)).dead_lettered("MAX_ATTEMPTS_EXCEEDED"))
        .await;
    store
        .insert(NewJob::queued(None, "B", at(3)).dead_lettered("NON_RETRYABLE"))
        .await;

    let dlq = FamilyBinding::bound(DeadLetterFamily::default());

    let engine = engine(&store, dlq.clone(), &[]);
    assert_eq!(engine.filtered_count().await.unwrap(), 2);
    assert_eq!(engine.queues().await.unwrap().keys(), vec![EMPTY, "default"]);
    assert_eq!(
        engine.state_names().unwrap(),
        &["max_attempts_exceeded", "non_retryable"]
    );

    let states = engine.states().await.unwrap();
    assert_eq!(states.get("max_attempts_exceeded"), Some(1));
    assert_eq!(states.get("non_retryable"), Some(1));

    let narrowed = common::engine(&store, dlq.clone(), &[("state", "non_retryable")]);
    let records = narrowed.records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].dlq_reason_code.as_deref(), Some("NON_RETRYABLE"));

    // Unknown reasons filter to nothing instead of failing.
    let unknown = common::engine(&store, dlq, &[("state", "exploded")]);
    assert_eq!(unknown.filtered_count().await.unwrap(), 0);
}

#[tokio::test]
async fn facets_group_past_a_column_selection() {
    let store = Arc::new(MemoryStore::new());
    store.insert(classed(Some("mailers"), "WelcomeMail")).await;
    store.insert(classed(Some("mailers"), "DigestMail")).await;
    store.insert(classed(None, "ExportReport")).await;

    let engine = engine(&store, jobs(), &[("queue_name", "mailers")])
        .with_base_query(Dataset::all().select(&RECORD_COLUMNS));

    let classes = engine.job_classes().await.unwrap();
    assert_eq!(classes.keys(), vec!["DigestMail", "WelcomeMail"]);
    assert_eq!(classes.total(), 2);

    let queues = engine.queues().await.unwrap();
    assert_eq!(queues.keys(), vec![EMPTY, "mailers"]);
    assert_eq!(queues.get("mailers"), Some(2));
}

#[tokio::test]
async fn states_follow_row_updates_in_a_fresh_engine() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert(NewJob::queued(Some("default"), "A", at(-5))).await;

    let before = engine(&store, jobs(), &[("state", "queued")]);
    assert_eq!(before.records().await.unwrap().len(), 1);

    let moved = store
        .update(id, |row| row.status = JobStatus::Running.as_str().to_string())
        .await;
    assert!(moved);
    assert!(!store.update(uuid::Uuid::nil(), |_| {}).await);

    // The served page stays as it was read.
    assert_eq!(before.records().await.unwrap().len(), 1);

    let after = engine(&store, jobs(), &[]).states().await.unwrap();
    assert_eq!(after.get("queued"), Some(0));
    assert_eq!(after.get("running"), Some(1));
}
