use std::collections::{
  BTreeMap,
  BTreeSet
};

use tracing::trace;

use crate::error::DexResult;
use crate::task::{
  Task,
  TaskPriority,
  TaskStatus
};

/// Independent optional predicates over a task collection. An unset field
/// places no constraint; set fields are ANDed.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct FilterCriteria {
  pub status:   Option<TaskStatus>,
  pub priority: Option<TaskPriority>,
  pub assignee: Option<String>,
  pub tag:      Option<String>,
  pub search:   Option<String>
}

impl FilterCriteria {
  /// Builds criteria from raw user input. Blank strings count as unset;
  /// an unknown status or priority is an error.
  pub fn from_raw(
    status: Option<&str>,
    priority: Option<&str>,
    assignee: Option<&str>,
    tag: Option<&str>,
    search: Option<&str>
  ) -> DexResult<Self> {
    let status = match non_blank(status)
    {
      | Some(raw) => {
        Some(raw.parse::<TaskStatus>()?)
      }
      | None => None
    };
    let priority =
      match non_blank(priority) {
        | Some(raw) => Some(
          raw.parse::<TaskPriority>()?
        ),
        | None => None
      };

    Ok(Self {
      status,
      priority,
      assignee: non_blank(assignee)
        .map(str::to_string),
      tag: non_blank(tag)
        .map(str::to_string),
      search: search
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
    })
  }

  pub fn is_active(&self) -> bool {
    self.status.is_some()
      || self.priority.is_some()
      || self.assignee.is_some()
      || self.tag.is_some()
      || self.search_query().is_some()
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }

  /// Lowercased search query, `None` when the query is blank.
  fn search_query(
    &self
  ) -> Option<String> {
    self
      .search
      .as_deref()
      .filter(|q| !q.trim().is_empty())
      .map(str::to_lowercase)
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    self.matches_with_query(
      task,
      self.search_query().as_deref()
    )
  }

  fn matches_with_query(
    &self,
    task: &Task,
    query: Option<&str>
  ) -> bool {
    if let Some(status) = self.status
      && task.status != status
    {
      return false;
    }

    if let Some(priority) =
      self.priority
      && task.priority != priority
    {
      return false;
    }

    if let Some(assignee) =
      self.assignee.as_deref()
      && task.assignee.as_deref()
        != Some(assignee)
    {
      return false;
    }

    if let Some(tag) =
      self.tag.as_deref()
      && !task.has_tag(tag)
    {
      return false;
    }

    if let Some(query) = query {
      let title_match = task
        .title
        .to_lowercase()
        .contains(query);
      let description_match = task
        .description
        .as_deref()
        .map(|d| {
          d.to_lowercase()
            .contains(query)
        })
        .unwrap_or(false);
      if !title_match
        && !description_match
      {
        return false;
      }
    }

    true
  }
}

/// Order-preserving subset of `tasks` matching every active predicate.
#[tracing::instrument(skip(
  tasks, criteria
))]
pub fn filter_tasks(
  tasks: &[Task],
  criteria: &FilterCriteria
) -> Vec<Task> {
  let query = criteria.search_query();
  let out: Vec<Task> = tasks
    .iter()
    .filter(|task| {
      criteria.matches_with_query(
        task,
        query.as_deref()
      )
    })
    .cloned()
    .collect();

  trace!(
    input = tasks.len(),
    output = out.len(),
    active = criteria.is_active(),
    "filtered tasks"
  );
  out
}

pub fn derive_assignees(
  tasks: &[Task]
) -> BTreeSet<String> {
  tasks
    .iter()
    .filter_map(|task| {
      task.assignee.as_deref()
    })
    .filter(|a| !a.is_empty())
    .map(str::to_string)
    .collect()
}

pub fn derive_tags(
  tasks: &[Task]
) -> BTreeSet<String> {
  tasks
    .iter()
    .flat_map(|task| task.tags.iter())
    .cloned()
    .collect()
}

/// Count per status; every status is present, zero included.
pub fn count_by_status(
  tasks: &[Task]
) -> BTreeMap<TaskStatus, usize> {
  let mut counts: BTreeMap<
    TaskStatus,
    usize
  > = TaskStatus::ALL
    .iter()
    .map(|status| (*status, 0))
    .collect();

  for task in tasks {
    *counts
      .entry(task.status)
      .or_insert(0) += 1;
  }

  counts
}

/// Kanban lanes in status order. Empty lanes are kept.
pub fn group_by_status(
  tasks: &[Task]
) -> Vec<(TaskStatus, Vec<Task>)> {
  TaskStatus::ALL
    .iter()
    .map(|status| {
      let lane = tasks
        .iter()
        .filter(|t| t.status == *status)
        .cloned()
        .collect();
      (*status, lane)
    })
    .collect()
}

fn non_blank(
  value: Option<&str>
) -> Option<&str> {
  value
    .map(str::trim)
    .filter(|v| !v.is_empty())
}
