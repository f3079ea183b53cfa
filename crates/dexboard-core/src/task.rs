use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DexError, DexResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskStatus {
    #[serde(rename = "TO DO")]
    Todo,
    #[serde(rename = "IN PROGRESS")]
    InProgress,
    #[serde(rename = "REVIEW")]
    Review,
    #[serde(rename = "DONE")]
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Todo => "TO DO",
            TaskStatus::InProgress => "IN PROGRESS",
            TaskStatus::Review => "REVIEW",
            TaskStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = DexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `_` and `-` stand in for the single space of the label form
        let key = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");

        match key.as_str() {
            "to do" | "todo" => Ok(TaskStatus::Todo),
            "in progress" | "inprogress" => Ok(TaskStatus::InProgress),
            "review" => Ok(TaskStatus::Review),
            "done" => Ok(TaskStatus::Done),
            _ => Err(DexError::invalid(format!("unknown task status: {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Critical,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
            TaskPriority::Critical => "Critical",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskPriority {
    type Err = DexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "critical" => Ok(TaskPriority::Critical),
            _ => Err(DexError::invalid(format!("unknown task priority: {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Everything the caller supplies when creating a task; the store fills in
/// the id and both timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, status: TaskStatus, priority: TaskPriority) -> Self {
        Self {
            title: title.into(),
            description: None,
            status,
            priority,
            due_date: None,
            assignee: None,
            tags: vec![],
        }
    }
}

/// Partial update. The outer `Option` on nullable fields means "leave as
/// is"; `Some(None)` clears the field.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assignee: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Task {
    pub fn from_draft(draft: TaskDraft, now: DateTime<Utc>) -> DexResult<Self> {
        let title = normalize_title(&draft.title)?;
        Ok(Self {
            id: new_task_id(),
            title,
            description: non_blank(draft.description),
            status: draft.status,
            priority: draft.priority,
            created_at: now,
            updated_at: now,
            due_date: draft.due_date,
            assignee: non_blank(draft.assignee),
            tags: normalize_tags(draft.tags),
        })
    }

    /// Merges `patch` into a copy of this task. This task is untouched
    /// when validation fails.
    pub fn patched(&self, patch: &TaskPatch, now: DateTime<Utc>) -> DexResult<Self> {
        let mut next = self.clone();

        if let Some(title) = patch.title.as_deref() {
            next.title = normalize_title(title)?;
        }
        if let Some(description) = patch.description.clone() {
            next.description = non_blank(description);
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(priority) = patch.priority {
            next.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            next.due_date = due_date;
        }
        if let Some(assignee) = patch.assignee.clone() {
            next.assignee = non_blank(assignee);
        }
        if let Some(tags) = patch.tags.clone() {
            next.tags = normalize_tags(tags);
        }

        next.touch(now);
        Ok(next)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        // updated_at never moves backwards, and never before created_at
        self.updated_at = now.max(self.updated_at).max(self.created_at);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Done && self.due_date.map(|due| due < now).unwrap_or(false)
    }
}

pub fn new_task_id() -> String {
    format!("task-{}", Uuid::new_v4().simple())
}

fn normalize_title(raw: &str) -> DexResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DexError::invalid("title is required"));
    }
    Ok(trimmed.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() || out.iter().any(|t| t == trimmed) {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}
