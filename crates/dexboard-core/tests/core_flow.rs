use std::fs;

use chrono::{Duration, TimeZone, Utc};
use dexboard_core::datastore::{JsonFileRepository, TaskRepository};
use dexboard_core::error::DexError;
use dexboard_core::filter::{FilterCriteria, count_by_status, derive_tags, filter_tasks};
use dexboard_core::store::TaskStore;
use dexboard_core::task::{TaskDraft, TaskPriority, TaskStatus};
use tempfile::tempdir;

fn two_task_board(store: &mut TaskStore<JsonFileRepository>) -> (String, String) {
    let now = Utc
        .with_ymd_and_hms(2025, 4, 20, 0, 0, 0)
        .single()
        .expect("valid timestamp");

    let mut first = TaskDraft::new("Catch Pikachu", TaskStatus::Todo, TaskPriority::High);
    first.tags = vec!["x".to_string()];
    let mut second = TaskDraft::new("Beat Brock", TaskStatus::Done, TaskPriority::Low);
    second.tags = vec!["y".to_string()];

    let a = store.add(first, now).expect("add first");
    let b = store.add(second, now).expect("add second");
    (a.id, b.id)
}

#[test]
fn two_task_scenario_filters_and_derives_tags() {
    let temp = tempdir().expect("tempdir");
    let repo = JsonFileRepository::open(temp.path()).expect("open repository");
    fs::write(&repo.tasks_path, "[]").expect("seed empty collection");

    let mut store = TaskStore::open(repo).expect("open store");
    let (first, _) = two_task_board(&mut store);

    let todo = FilterCriteria {
        status: Some(TaskStatus::Todo),
        ..FilterCriteria::default()
    };
    let filtered = filter_tasks(store.tasks(), &todo);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, first);

    let tags: Vec<String> = derive_tags(store.tasks()).into_iter().collect();
    assert_eq!(tags, ["x", "y"]);

    assert_eq!(filter_tasks(&filtered, &todo), filtered);
    assert_eq!(filter_tasks(store.tasks(), &FilterCriteria::default()), store.tasks());
    assert_eq!(
        count_by_status(store.tasks()).values().sum::<usize>(),
        store.tasks().len()
    );
}

#[test]
fn mutations_survive_a_reopen() {
    let temp = tempdir().expect("tempdir");
    let repo = JsonFileRepository::open(temp.path()).expect("open repository");
    fs::write(&repo.tasks_path, "[]").expect("seed empty collection");

    let mut store = TaskStore::open(repo).expect("open store");
    let (first, second) = two_task_board(&mut store);
    let later = Utc
        .with_ymd_and_hms(2025, 4, 21, 0, 0, 0)
        .single()
        .expect("valid timestamp");
    store
        .change_status(&first, "in progress", later)
        .expect("change status");
    store.delete(&second).expect("delete");

    let reopened =
        TaskStore::open(JsonFileRepository::open(temp.path()).expect("reopen repository"))
            .expect("reopen store");
    assert_eq!(reopened.tasks().len(), 1);
    let task = reopened.get(&first).expect("first task persisted");
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(task.updated_at, later);
    assert_eq!(task.tags, vec!["x".to_string()]);

    let raw = fs::read_to_string(temp.path().join("tasks.json")).expect("read tasks.json");
    assert!(raw.contains("\"status\": \"IN PROGRESS\""));
    assert!(raw.contains("\"createdAt\""));
}

#[test]
fn invalid_status_change_is_rejected_and_not_persisted() {
    let temp = tempdir().expect("tempdir");
    let repo = JsonFileRepository::open(temp.path()).expect("open repository");
    fs::write(&repo.tasks_path, "[]").expect("seed empty collection");

    let mut store = TaskStore::open(repo).expect("open store");
    let (first, _) = two_task_board(&mut store);
    let before = store.get(&first).cloned().expect("task exists");

    let err = store
        .change_status(&first, "ARCHIVED", before.updated_at + Duration::hours(1))
        .expect_err("unknown status");
    assert!(matches!(
        err.downcast_ref::<DexError>(),
        Some(DexError::InvalidArgument(_))
    ));
    assert_eq!(store.get(&first), Some(&before));

    let stored = store
        .repository()
        .load()
        .expect("load")
        .expect("collection stored");
    assert_eq!(stored.iter().find(|t| t.id == first), Some(&before));
}

#[test]
fn fresh_data_dir_starts_from_the_sample_board() {
    let temp = tempdir().expect("tempdir");
    let store = TaskStore::open(JsonFileRepository::open(temp.path()).expect("open repository"))
        .expect("open store");
    assert_eq!(store.tasks().len(), 5);
    assert!(!temp.path().join("tasks.json").exists());
}

#[test]
fn corrupt_file_falls_back_to_sample_board() {
    let temp = tempdir().expect("tempdir");
    let repo = JsonFileRepository::open(temp.path()).expect("open repository");
    fs::write(&repo.tasks_path, "{ not json").expect("write garbage");
    assert!(repo.load().is_err());

    let store = TaskStore::open(repo).expect("open store");
    assert_eq!(store.tasks().len(), 5);
}

#[test]
fn stored_records_breaking_invariants_are_dropped_or_repaired() {
    let temp = tempdir().expect("tempdir");
    let repo = JsonFileRepository::open(temp.path()).expect("open repository");
    fs::write(
        &repo.tasks_path,
        r#"[
  {"id":"a","title":"   ","status":"TO DO","priority":"Low",
   "createdAt":"2025-04-22T00:00:00Z","updatedAt":"2025-04-22T00:00:00Z"},
  {"id":"b","title":"Rewind","status":"DONE","priority":"High",
   "createdAt":"2025-04-22T00:00:00Z","updatedAt":"2025-04-01T00:00:00Z"}
]"#,
    )
    .expect("write stored tasks");

    let store = TaskStore::open(repo).expect("open store");
    assert_eq!(store.tasks().len(), 1);
    assert!(store.get("a").is_none());
    let task = store.get("b").expect("valid task kept");
    assert!(task.updated_at >= task.created_at);
}
