use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{DexError, DexResult};
use crate::filter::FilterCriteria;
use crate::task::{Task, TaskPriority, TaskStatus};

pub const PAGE_SIZE_OPTIONS: [usize; 4] = [5, 10, 25, 50];
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Title,
    Description,
    Status,
    Priority,
    DueDate,
    Assignee,
    Tags,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Title,
        Column::Description,
        Column::Status,
        Column::Priority,
        Column::DueDate,
        Column::Assignee,
        Column::Tags,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::Title => "TITLE",
            Column::Description => "DESCRIPTION",
            Column::Status => "STATUS",
            Column::Priority => "PRIORITY",
            Column::DueDate => "DUE DATE",
            Column::Assignee => "ASSIGNEE",
            Column::Tags => "TAGS",
        }
    }

    pub fn is_sortable(self) -> bool {
        !matches!(self, Column::Tags)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl FromStr for Column {
    type Err = DexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "title" => Ok(Column::Title),
            "description" | "desc" => Ok(Column::Description),
            "status" => Ok(Column::Status),
            "priority" => Ok(Column::Priority),
            "due" | "duedate" => Ok(Column::DueDate),
            "assignee" => Ok(Column::Assignee),
            "tags" | "tag" => Ok(Column::Tags),
            _ => Err(DexError::invalid(format!("unknown column: {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub column: Column,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Text(String),
    Status(TaskStatus),
    Priority(TaskPriority),
    Time(DateTime<Utc>),
}

fn sort_key(column: Column, task: &Task) -> Option<SortKey> {
    match column {
        Column::Title => Some(SortKey::Text(task.title.to_lowercase())),
        Column::Description => task
            .description
            .as_deref()
            .map(|d| SortKey::Text(d.to_lowercase())),
        Column::Status => Some(SortKey::Status(task.status)),
        Column::Priority => Some(SortKey::Priority(task.priority)),
        Column::DueDate => task.due_date.map(SortKey::Time),
        Column::Assignee => task
            .assignee
            .as_deref()
            .map(|a| SortKey::Text(a.to_lowercase())),
        Column::Tags => None,
    }
}

/// Sorting, filtering and paging state of the task table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    sort: Option<Sort>,
    column_filters: FilterCriteria,
    global_filter: String,
    page_index: usize,
    page_size: usize,
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            sort: None,
            column_filters: FilterCriteria::default(),
            global_filter: String::new(),
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One rendered page of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView<'a> {
    pub rows: Vec<&'a Task>,
    pub total_rows: usize,
    pub page_index: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub can_previous: bool,
    pub can_next: bool,
    /// 1-based first and last row numbers shown; `(0, 0)` when empty.
    pub showing: (usize, usize),
}

impl TableState {
    pub fn sort(&self) -> Option<Sort> {
        self.sort
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn column_filters(&self) -> &FilterCriteria {
        &self.column_filters
    }

    pub fn global_filter(&self) -> &str {
        &self.global_filter
    }

    pub fn set_sort(&mut self, sort: Option<Sort>) -> DexResult<()> {
        if let Some(sort) = sort
            && !sort.column.is_sortable()
        {
            return Err(DexError::invalid(format!(
                "column {} is not sortable",
                sort.column
            )));
        }
        self.sort = sort;
        Ok(())
    }

    /// Cycles the column through ascending, descending and unsorted.
    /// Sorting a different column replaces the previous sort.
    pub fn toggle_sort(&mut self, column: Column) -> DexResult<()> {
        let next = match self.sort {
            Some(Sort {
                column: current,
                direction: SortDirection::Asc,
            }) if current == column => Some(Sort {
                column,
                direction: SortDirection::Desc,
            }),
            Some(Sort {
                column: current,
                direction: SortDirection::Desc,
            }) if current == column => None,
            _ => Some(Sort {
                column,
                direction: SortDirection::Asc,
            }),
        };
        self.set_sort(next)
    }

    /// Column filters are exact-match predicates; any search text on the
    /// criteria is ignored in favour of the global filter.
    pub fn set_column_filters(&mut self, mut criteria: FilterCriteria) {
        criteria.search = None;
        self.column_filters = criteria;
        self.page_index = 0;
    }

    pub fn set_global_filter(&mut self, query: impl Into<String>) {
        self.global_filter = query.into();
        self.page_index = 0;
    }

    pub fn set_page_size(&mut self, size: usize) -> DexResult<()> {
        if !PAGE_SIZE_OPTIONS.contains(&size) {
            return Err(DexError::invalid(format!(
                "page size must be one of {PAGE_SIZE_OPTIONS:?}, got {size}"
            )));
        }
        self.page_size = size;
        self.page_index = 0;
        Ok(())
    }

    pub fn set_page_index(&mut self, index: usize) {
        self.page_index = index;
    }

    pub fn first_page(&mut self) {
        self.page_index = 0;
    }

    pub fn previous_page(&mut self) {
        self.page_index = self.page_index.saturating_sub(1);
    }

    pub fn next_page(&mut self, tasks: &[Task]) {
        let count = self.page_count_for(self.row_count(tasks));
        if self.page_index + 1 < count {
            self.page_index += 1;
        }
    }

    pub fn last_page(&mut self, tasks: &[Task]) {
        let count = self.page_count_for(self.row_count(tasks));
        self.page_index = count.saturating_sub(1);
    }

    pub fn row_count(&self, tasks: &[Task]) -> usize {
        let query = self.global_query();
        tasks
            .iter()
            .filter(|t| self.row_matches(t, query.as_deref()))
            .count()
    }

    pub fn view<'a>(&self, tasks: &'a [Task]) -> TableView<'a> {
        let query = self.global_query();
        let mut rows: Vec<&'a Task> = tasks
            .iter()
            .filter(|t| self.row_matches(t, query.as_deref()))
            .collect();

        if let Some(sort) = self.sort {
            sort_rows(&mut rows, sort);
        }

        let total_rows = rows.len();
        let page_count = self.page_count_for(total_rows);
        let page_index = if page_count == 0 {
            0
        } else {
            self.page_index.min(page_count - 1)
        };

        let start = page_index * self.page_size;
        let end = (start + self.page_size).min(total_rows);
        let page_rows: Vec<&'a Task> = rows
            .get(start..end)
            .map(|page| page.to_vec())
            .unwrap_or_default();

        let showing = if total_rows == 0 {
            (0, 0)
        } else {
            (start + 1, end)
        };

        debug!(
            total_rows,
            page_index,
            page_count,
            sort = ?self.sort,
            "computed table view"
        );

        TableView {
            rows: page_rows,
            total_rows,
            page_index,
            page_size: self.page_size,
            page_count,
            can_previous: page_index > 0,
            can_next: page_index + 1 < page_count,
            showing,
        }
    }

    fn page_count_for(&self, rows: usize) -> usize {
        rows.div_ceil(self.page_size.max(1))
    }

    fn global_query(&self) -> Option<String> {
        if self.global_filter.trim().is_empty() {
            None
        } else {
            Some(self.global_filter.to_lowercase())
        }
    }

    fn row_matches(&self, task: &Task, query: Option<&str>) -> bool {
        if !self.column_filters.matches(task) {
            return false;
        }
        match query {
            Some(query) => global_match(task, query),
            None => true,
        }
    }
}

fn global_match(task: &Task, query: &str) -> bool {
    let contains = |value: &str| value.to_lowercase().contains(query);

    contains(&task.title)
        || task.description.as_deref().is_some_and(contains)
        || contains(task.status.label())
        || contains(task.priority.label())
        || task.assignee.as_deref().is_some_and(contains)
        || task.tags.iter().any(|tag| contains(tag))
}

fn sort_rows(rows: &mut Vec<&Task>, sort: Sort) {
    let mut keyed: Vec<(Option<SortKey>, &Task)> = rows
        .iter()
        .map(|task| (sort_key(sort.column, task), *task))
        .collect();

    // stable: equal keys keep their filtered order
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => sort.direction.apply(a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    *rows = keyed.into_iter().map(|(_, task)| task).collect();
}
