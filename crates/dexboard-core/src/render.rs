use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Local, Utc};
use unicode_width::UnicodeWidthStr;

use crate::catalog::CatalogPage;
use crate::config::Config;
use crate::pagination::{PageLabel, Pager};
use crate::table::{Column, SortDirection, TableView};
use crate::task::{Task, TaskPriority, TaskStatus};

const DESCRIPTION_WIDTH: usize = 40;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, view, sort, now))]
    pub fn print_task_table<W: Write>(
        &self,
        out: &mut W,
        view: &TableView<'_>,
        sort: Option<(Column, SortDirection)>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let headers: Vec<String> = std::iter::once("ID".to_string())
            .chain(Column::ALL.iter().map(|column| {
                let marker = match sort {
                    Some((sorted, SortDirection::Asc)) if sorted == *column => " ^",
                    Some((sorted, SortDirection::Desc)) if sorted == *column => " v",
                    _ => "",
                };
                format!("{}{marker}", column.header())
            }))
            .collect();

        let mut rows = Vec::with_capacity(view.rows.len());
        for task in &view.rows {
            let due = task
                .due_date
                .map(|date| date.with_timezone(&Local).format("%b %-d, %Y").to_string())
                .unwrap_or_else(|| "-".to_string());
            let due = if task.is_overdue(now) {
                self.paint(&due, "31")
            } else {
                due
            };

            let tags = if task.tags.is_empty() {
                "-".to_string()
            } else {
                task.tags
                    .iter()
                    .map(|tag| tag.to_uppercase())
                    .collect::<Vec<_>>()
                    .join(" ")
            };

            rows.push(vec![
                self.paint(&task.id, "33"),
                task.title.clone(),
                truncate(
                    task.description.as_deref().unwrap_or("No description"),
                    DESCRIPTION_WIDTH,
                ),
                self.paint(task.status.label(), status_color(task.status)),
                self.paint(&task.priority.label().to_uppercase(), priority_color(task.priority)),
                due,
                task.assignee.clone().unwrap_or_else(|| "Unassigned".to_string()),
                tags,
            ]);
        }

        if rows.is_empty() {
            writeln!(out, "No tasks found. Try adjusting your filters.")?;
        } else {
            write_table(&mut *out, headers, rows)?;
        }

        writeln!(
            out,
            "Showing {} to {} of {} results | Page {} of {} | Rows per page: {}",
            view.showing.0,
            view.showing.1,
            view.total_rows,
            if view.page_count == 0 { 0 } else { view.page_index + 1 },
            view.page_count,
            view.page_size,
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, out, lanes))]
    pub fn print_board<W: Write>(
        &self,
        out: &mut W,
        lanes: &[(TaskStatus, Vec<Task>)],
    ) -> anyhow::Result<()> {
        for (status, tasks) in lanes {
            writeln!(
                out,
                "{} ({})",
                self.paint(status.label(), status_color(*status)),
                tasks.len()
            )?;
            if tasks.is_empty() {
                writeln!(out, "  No tasks")?;
            }
            for task in tasks {
                let assignee = task
                    .assignee
                    .as_deref()
                    .map(|a| format!(" @{a}"))
                    .unwrap_or_default();
                writeln!(
                    out,
                    "  [{}] {}{}  ({})",
                    task.priority.label().to_uppercase(),
                    task.title,
                    assignee,
                    task.id
                )?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, out, task))]
    pub fn print_task_info<W: Write>(&self, out: &mut W, task: &Task) -> anyhow::Result<()> {
        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        writeln!(
            out,
            "description {}",
            task.description.as_deref().unwrap_or_default()
        )?;
        writeln!(out, "status      {}", task.status)?;
        writeln!(out, "priority    {}", task.priority)?;
        writeln!(
            out,
            "assignee    {}",
            task.assignee.as_deref().unwrap_or_default()
        )?;
        writeln!(out, "tags        {}", task.tags.join(", "))?;
        writeln!(out, "created     {}", task.created_at.to_rfc3339())?;
        writeln!(out, "updated     {}", task.updated_at.to_rfc3339())?;
        if let Some(due) = task.due_date {
            writeln!(out, "due         {}", due.to_rfc3339())?;
        }
        Ok(())
    }

    pub fn print_summary<W: Write>(
        &self,
        out: &mut W,
        counts: &BTreeMap<TaskStatus, usize>,
        assignees: &BTreeSet<String>,
        tags: &BTreeSet<String>,
    ) -> anyhow::Result<()> {
        let rows = counts
            .iter()
            .map(|(status, count)| vec![status.label().to_string(), count.to_string()])
            .collect();
        write_table(&mut *out, vec!["Status".to_string(), "Tasks".to_string()], rows)?;
        writeln!(out)?;
        writeln!(out, "Assignees: {}", join_or_dash(assignees))?;
        writeln!(out, "Tags:      {}", join_or_dash(tags))?;
        Ok(())
    }

    pub fn print_catalog_page<W: Write>(
        &self,
        out: &mut W,
        page: &CatalogPage,
        pager: &Pager,
    ) -> anyhow::Result<()> {
        if page.entries.is_empty() {
            writeln!(out, "No Pokémon on this page.")?;
        } else {
            let rows = page
                .entries
                .iter()
                .map(|entry| {
                    vec![
                        format!("#{}", entry.id),
                        capitalize(&entry.name),
                        entry.image_url.clone().unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect();
            write_table(
                &mut *out,
                vec!["ID".to_string(), "NAME".to_string(), "IMAGE".to_string()],
                rows,
            )?;
        }
        if let Some(total) = page.total_count {
            writeln!(out, "{total} Pokémon")?;
        }
        self.print_pager(out, pager)
    }

    pub fn print_pager<W: Write>(&self, out: &mut W, pager: &Pager) -> anyhow::Result<()> {
        let labels: Vec<String> = pager
            .window()
            .into_iter()
            .map(|label| match label {
                PageLabel::Page(n) if pager.is_current(n) => self.paint(&format!("[{n}]"), "44"),
                other => other.to_string(),
            })
            .collect();

        let prev = pager.previous();
        let next = pager.next();
        writeln!(
            out,
            "{} {} {}",
            nav_label("<", prev.target, prev.disabled),
            labels.join(" "),
            nav_label(">", next.target, next.disabled)
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn nav_label(arrow: &str, target: u32, disabled: bool) -> String {
    if disabled {
        format!("({arrow})")
    } else {
        format!("{arrow}{target}")
    }
}

fn status_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "37",
        TaskStatus::InProgress => "34",
        TaskStatus::Review => "33",
        TaskStatus::Done => "32",
    }
}

fn priority_color(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "37",
        TaskPriority::Medium => "34",
        TaskPriority::High => "33",
        TaskPriority::Critical => "31",
    }
}

fn join_or_dash(values: &BTreeSet<String>) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn truncate(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + 3 > max_width {
            break;
        }
        out.push(ch);
        width += ch_width;
    }
    out.push_str("...");
    out
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
