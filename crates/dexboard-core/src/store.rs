use std::collections::HashSet;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::datastore::TaskRepository;
use crate::error::DexError;
use crate::task::{Task, TaskDraft, TaskPatch, TaskStatus, new_task_id};

const SEED_TASKS: &str = r#"[
  {
    "id": "1",
    "title": "Design Pokémon Database Schema",
    "description": "Create an efficient database schema for storing Pokémon data",
    "status": "TO DO",
    "priority": "High",
    "createdAt": "2025-04-20T00:00:00Z",
    "updatedAt": "2025-04-20T00:00:00Z",
    "tags": ["database", "design"]
  },
  {
    "id": "2",
    "title": "Implement Search Functionality",
    "description": "Add search capability to find Pokémon by name, type, or ability",
    "status": "IN PROGRESS",
    "priority": "Medium",
    "createdAt": "2025-04-21T00:00:00Z",
    "updatedAt": "2025-04-22T00:00:00Z",
    "assignee": "Ash Ketchum",
    "dueDate": "2025-04-30T00:00:00Z",
    "tags": ["search", "frontend"]
  },
  {
    "id": "3",
    "title": "Create Evolution Chain Visualization",
    "description": "Design and implement an interactive visualization for Pokémon evolution chains",
    "status": "REVIEW",
    "priority": "Medium",
    "createdAt": "2025-04-18T00:00:00Z",
    "updatedAt": "2025-04-23T00:00:00Z",
    "assignee": "Misty",
    "dueDate": "2025-04-25T00:00:00Z",
    "tags": ["visualization", "UI"]
  },
  {
    "id": "4",
    "title": "Fix Type Effectiveness Calculator",
    "description": "The calculator for Pokémon type matchups has a bug with dual types",
    "status": "TO DO",
    "priority": "Critical",
    "createdAt": "2025-04-23T00:00:00Z",
    "updatedAt": "2025-04-23T00:00:00Z",
    "dueDate": "2025-04-26T00:00:00Z",
    "tags": ["bug", "calculator"]
  },
  {
    "id": "5",
    "title": "Optimize API Response Times",
    "description": "Current response times are too slow. Implement caching and optimize queries.",
    "status": "DONE",
    "priority": "High",
    "createdAt": "2025-04-15T00:00:00Z",
    "updatedAt": "2025-04-22T00:00:00Z",
    "assignee": "Brock",
    "tags": ["performance", "api"]
  }
]"#;

/// Sample board used when nothing has been stored yet.
pub fn seed_tasks() -> anyhow::Result<Vec<Task>> {
    serde_json::from_str(SEED_TASKS).context("failed parsing seed tasks")
}

/// Owns the task collection for one session. Every mutation is written
/// through the repository before it becomes visible; a failed save leaves
/// the in-memory collection untouched.
#[derive(Debug)]
pub struct TaskStore<R: TaskRepository> {
    repo: R,
    tasks: Vec<Task>,
}

impl<R: TaskRepository> TaskStore<R> {
    #[tracing::instrument(skip(repo))]
    pub fn open(repo: R) -> anyhow::Result<Self> {
        let tasks = match repo.load() {
            Ok(Some(tasks)) => sanitize_loaded(tasks),
            Ok(None) => {
                info!("no stored tasks; seeding sample board");
                seed_tasks()?
            }
            Err(err) => {
                let detail = format!("{err:#}");
                error!(error = %detail, "failed to load stored tasks; seeding sample board");
                seed_tasks()?
            }
        };

        debug!(count = tasks.len(), "task store ready");
        Ok(Self { repo, tasks })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    #[tracing::instrument(skip(self, draft, now), fields(title = %draft.title))]
    pub fn add(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> anyhow::Result<Task> {
        let mut task = Task::from_draft(draft, now)?;
        while self.get(&task.id).is_some() {
            task.id = new_task_id();
        }

        let mut next = self.tasks.clone();
        next.push(task.clone());
        self.commit(next)?;

        info!(id = %task.id, "task added");
        Ok(task)
    }

    #[tracing::instrument(skip(self, patch, now))]
    pub fn update(&mut self, id: &str, patch: &TaskPatch, now: DateTime<Utc>) -> anyhow::Result<Task> {
        let idx = self.position(id)?;
        let updated = self.tasks[idx].patched(patch, now)?;

        let mut next = self.tasks.clone();
        next[idx] = updated.clone();
        self.commit(next)?;

        info!(id, "task updated");
        Ok(updated)
    }

    pub fn set_status(&mut self, id: &str, status: TaskStatus, now: DateTime<Utc>) -> anyhow::Result<Task> {
        self.update(id, &TaskPatch::status(status), now)
    }

    /// Status change from untrusted input. An unknown status fails before
    /// the record is looked at.
    #[tracing::instrument(skip(self, now))]
    pub fn change_status(&mut self, id: &str, raw_status: &str, now: DateTime<Utc>) -> anyhow::Result<Task> {
        let status = raw_status.parse::<TaskStatus>().map_err(|err| {
            warn!(id, raw_status, "rejected status change");
            err
        })?;
        self.set_status(id, status, now)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: &str) -> anyhow::Result<Task> {
        let idx = self.position(id)?;

        let mut next = self.tasks.clone();
        let removed = next.remove(idx);
        self.commit(next)?;

        info!(id, remaining = self.tasks.len(), "task deleted");
        Ok(removed)
    }

    fn position(&self, id: &str) -> anyhow::Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| DexError::NotFound(id.to_string()).into())
    }

    fn commit(&mut self, next: Vec<Task>) -> anyhow::Result<()> {
        self.repo.save(&next)?;
        self.tasks = next;
        Ok(())
    }
}

/// Drops stored records that break the task invariants (blank title,
/// repeated id) and repairs an `updated_at` that precedes `created_at`.
fn sanitize_loaded(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    let before = tasks.len();
    let mut kept = Vec::with_capacity(before);

    for mut task in tasks {
        if task.title.trim().is_empty() {
            warn!(id = %task.id, "dropped stored task with blank title");
            continue;
        }
        if !seen.insert(task.id.clone()) {
            warn!(id = %task.id, "dropped stored task with duplicate id");
            continue;
        }
        if task.updated_at < task.created_at {
            warn!(id = %task.id, "stored updatedAt precedes createdAt; clamping");
            task.updated_at = task.created_at;
        }
        kept.push(task);
    }

    if kept.len() != before {
        warn!(before, after = kept.len(), "dropped invalid stored tasks");
    }
    kept
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::datastore::MemoryRepository;
    use crate::task::TaskPriority;

    struct BrokenRepository;

    impl TaskRepository for BrokenRepository {
        fn load(&self) -> anyhow::Result<Option<Vec<Task>>> {
            Err(anyhow::anyhow!("disk on fire"))
        }

        fn save(&mut self, _tasks: &[Task]) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("disk on fire"))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn seeds_when_nothing_is_stored() {
        let store = TaskStore::open(MemoryRepository::default()).unwrap();
        assert_eq!(store.tasks().len(), 5);
        assert_eq!(store.get("2").and_then(|t| t.assignee.as_deref()), Some("Ash Ketchum"));
        assert_eq!(store.repository().save_count(), 0);
    }

    #[test]
    fn seeds_when_load_fails() {
        let store = TaskStore::open(BrokenRepository).unwrap();
        assert_eq!(store.tasks().len(), 5);
    }

    #[test]
    fn failed_save_leaves_collection_unchanged() {
        let mut store = TaskStore::open(BrokenRepository).unwrap();
        let before = store.tasks().to_vec();
        assert!(store.delete("1").is_err());
        assert!(
            store
                .add(TaskDraft::new("x", TaskStatus::Todo, TaskPriority::Low), now())
                .is_err()
        );
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn stored_empty_collection_is_not_reseeded() {
        let store = TaskStore::open(MemoryRepository::with_tasks(vec![])).unwrap();
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn add_assigns_identity_and_persists() {
        let mut store = TaskStore::open(MemoryRepository::with_tasks(vec![])).unwrap();
        let task = store
            .add(TaskDraft::new("Catch 'em all", TaskStatus::Todo, TaskPriority::High), now())
            .unwrap();
        assert!(task.id.starts_with("task-"));
        assert_eq!(task.created_at, now());
        assert_eq!(store.repository().stored().map(|t| t.len()), Some(1));

        let other = store
            .add(TaskDraft::new("Again", TaskStatus::Todo, TaskPriority::Low), now())
            .unwrap();
        assert_ne!(task.id, other.id);
    }

    #[test]
    fn change_status_rejects_unknown_values() {
        let mut store = TaskStore::open(MemoryRepository::default()).unwrap();
        let err = store.change_status("1", "ARCHIVED", now()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DexError>(),
            Some(DexError::InvalidArgument(_))
        ));
        assert_eq!(store.get("1").map(|t| t.status), Some(TaskStatus::Todo));
        assert_eq!(store.repository().save_count(), 0);
    }

    #[test]
    fn change_status_refreshes_updated_at() {
        let mut store = TaskStore::open(MemoryRepository::default()).unwrap();
        let before = store.get("1").map(|t| t.updated_at).unwrap();
        let later = now() + Duration::minutes(5);
        let task = store.change_status("1", "done", later).unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.updated_at >= before);
        assert_eq!(task.updated_at, later);
        assert_eq!(store.get("1"), Some(&task));
    }

    #[test]
    fn unknown_id_is_not_found_and_changes_nothing() {
        let mut store = TaskStore::open(MemoryRepository::default()).unwrap();
        let before = store.tasks().to_vec();

        for err in [
            store.delete("missing").unwrap_err(),
            store.set_status("missing", TaskStatus::Done, now()).unwrap_err(),
            store.update("missing", &TaskPatch::default(), now()).unwrap_err(),
        ] {
            assert_eq!(
                err.downcast_ref::<DexError>(),
                Some(&DexError::NotFound("missing".to_string()))
            );
        }
        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(store.repository().save_count(), 0);
    }

    #[test]
    fn invalid_patch_leaves_record_unchanged() {
        let mut store = TaskStore::open(MemoryRepository::default()).unwrap();
        let patch = TaskPatch {
            title: Some("  ".to_string()),
            ..TaskPatch::default()
        };
        assert!(store.update("3", &patch, now()).is_err());
        assert_eq!(
            store.get("3").map(|t| t.title.as_str()),
            Some("Create Evolution Chain Visualization")
        );
    }

    #[test]
    fn delete_is_a_hard_removal() {
        let mut store = TaskStore::open(MemoryRepository::default()).unwrap();
        let removed = store.delete("5").unwrap();
        assert_eq!(removed.title, "Optimize API Response Times");
        assert!(store.get("5").is_none());
        assert_eq!(store.tasks().len(), 4);
        assert_eq!(store.repository().stored().map(|t| t.len()), Some(4));
    }

    #[test]
    fn duplicate_stored_ids_keep_first() {
        let mut tasks = seed_tasks().unwrap();
        let mut dup = tasks[0].clone();
        dup.title = "shadow".to_string();
        tasks.push(dup);
        let store = TaskStore::open(MemoryRepository::with_tasks(tasks)).unwrap();
        assert_eq!(store.tasks().len(), 5);
        assert_eq!(
            store.get("1").map(|t| t.title.as_str()),
            Some("Design Pokémon Database Schema")
        );
    }

    #[test]
    fn loaded_records_are_checked_against_invariants() {
        let mut tasks = seed_tasks().unwrap();
        tasks[0].title = "   ".to_string();
        tasks[1].created_at = Utc.with_ymd_and_hms(2025, 4, 22, 0, 0, 0).unwrap();
        tasks[1].updated_at = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();

        let store = TaskStore::open(MemoryRepository::with_tasks(tasks)).unwrap();
        assert_eq!(store.tasks().len(), 4);
        assert!(store.get("1").is_none());
        assert!(store.tasks().iter().all(|t| !t.title.trim().is_empty()));
        assert!(store.tasks().iter().all(|t| t.updated_at >= t.created_at));
        let repaired = store.get("2").unwrap();
        assert_eq!(repaired.updated_at, repaired.created_at);
    }
}
