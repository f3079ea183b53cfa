use std::fs;
use std::io::Write;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::catalog::{CatalogPage, CatalogRequest};
use crate::cli::{AddArgs, Command, EditArgs, FilterArgs, ListArgs, PagesArgs};
use crate::config::Config;
use crate::datastore::TaskRepository;
use crate::datetime::parse_due_date;
use crate::error::DexError;
use crate::filter::{
    FilterCriteria, count_by_status, derive_assignees, derive_tags, filter_tasks, group_by_status,
};
use crate::pagination::{Pager, page_count, parse_page_param};
use crate::render::Renderer;
use crate::store::TaskStore;
use crate::table::{Column, TableState};
use crate::task::{TaskDraft, TaskPatch, TaskPriority, TaskStatus};

#[instrument(skip(store, cfg, renderer, out, command, now))]
pub fn dispatch<R: TaskRepository, W: Write>(
    store: &mut TaskStore<R>,
    cfg: &Config,
    renderer: &Renderer,
    out: &mut W,
    command: Command,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");

    match command {
        Command::List(args) => cmd_list(store, cfg, renderer, out, args, now),
        Command::Board(args) => cmd_board(store, renderer, out, &args),
        Command::Add(args) => cmd_add(store, out, args, now),
        Command::Edit(args) => cmd_edit(store, out, args, now),
        Command::Status { id, status } => {
            let task = store.change_status(&id, &status, now)?;
            writeln!(out, "Task {} is now {}.", task.id, task.status)?;
            Ok(())
        }
        Command::Delete { id } => {
            let task = store.delete(&id)?;
            writeln!(out, "Deleted task {} ({}).", task.id, task.title)?;
            Ok(())
        }
        Command::Show { id } => {
            let task = store
                .get(&id)
                .ok_or_else(|| DexError::NotFound(id.clone()))?;
            renderer.print_task_info(out, task)
        }
        Command::Summary => {
            let tasks = store.tasks();
            renderer.print_summary(
                out,
                &count_by_status(tasks),
                &derive_assignees(tasks),
                &derive_tags(tasks),
            )
        }
        Command::Pages(args) => cmd_pages(cfg, renderer, out, args),
        Command::CatalogRequest { page, limit } => {
            let page = parse_page_param(page.as_deref());
            let limit = limit.unwrap_or(cfg.catalog.page_limit);
            let request = CatalogRequest::for_page(page, limit);
            writeln!(out, "{}", request.to_json()?)?;
            Ok(())
        }
        Command::CatalogPage {
            response,
            page,
            limit,
        } => {
            let raw = fs::read_to_string(&response)
                .with_context(|| format!("failed reading {}", response.display()))?;
            let catalog = CatalogPage::from_response(&raw)?;
            let limit = limit.unwrap_or(cfg.catalog.page_limit);
            let pager = Pager::new(
                parse_page_param(page.as_deref()),
                catalog.total_pages(limit).unwrap_or(1),
            );
            renderer.print_catalog_page(out, &catalog, &pager)
        }
    }
}

fn criteria_from(args: &FilterArgs) -> anyhow::Result<FilterCriteria> {
    FilterCriteria::from_raw(
        args.status.as_deref(),
        args.priority.as_deref(),
        args.assignee.as_deref(),
        args.tag.as_deref(),
        args.search.as_deref(),
    )
    .context("invalid filter")
}

#[instrument(skip(store, cfg, renderer, out, args, now))]
fn cmd_list<R: TaskRepository, W: Write>(
    store: &TaskStore<R>,
    cfg: &Config,
    renderer: &Renderer,
    out: &mut W,
    args: ListArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let criteria = criteria_from(&args.filters)?;
    // title/description search narrows the rows; the exact-match
    // predicates live on the table state
    let searched = filter_tasks(
        store.tasks(),
        &FilterCriteria {
            search: criteria.search.clone(),
            ..FilterCriteria::default()
        },
    );

    let mut state = TableState::default();
    state.set_page_size(args.page_size.unwrap_or(cfg.table.page_size))?;
    state.set_column_filters(criteria.clone());

    if let Some(raw) = args.sort.as_deref() {
        let column: Column = raw.parse()?;
        state.toggle_sort(column)?;
        if args.desc {
            state.toggle_sort(column)?;
        }
    }
    if let Some(query) = args.global {
        state.set_global_filter(query);
    }
    state.set_page_index(args.page.saturating_sub(1));

    let view = state.view(&searched);
    info!(
        total = store.tasks().len(),
        filtered = view.total_rows,
        shown = view.rows.len(),
        "command list"
    );

    if view.total_rows == 0 && !criteria.is_active() && state.global_filter().is_empty() {
        writeln!(out, "No tasks yet. Get started by creating a new task.")?;
        return Ok(());
    }

    let sort = state.sort().map(|s| (s.column, s.direction));
    renderer.print_task_table(out, &view, sort, now)
}

fn cmd_board<R: TaskRepository, W: Write>(
    store: &TaskStore<R>,
    renderer: &Renderer,
    out: &mut W,
    args: &FilterArgs,
) -> anyhow::Result<()> {
    let criteria = criteria_from(args)?;
    let filtered = filter_tasks(store.tasks(), &criteria);
    renderer.print_board(out, &group_by_status(&filtered))
}

#[instrument(skip(store, out, args, now))]
fn cmd_add<R: TaskRepository, W: Write>(
    store: &mut TaskStore<R>,
    out: &mut W,
    args: AddArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let status: TaskStatus = args.status.parse()?;
    let priority: TaskPriority = args.priority.parse()?;

    let mut draft = TaskDraft::new(args.title, status, priority);
    draft.description = args.description;
    draft.assignee = args.assignee;
    draft.tags = args.tags;
    draft.due_date = args.due.as_deref().map(parse_due_date).transpose()?;

    let task = store.add(draft, now)?;
    writeln!(out, "Created task {}.", task.id)?;
    Ok(())
}

#[instrument(skip(store, out, args, now), fields(id = %args.id))]
fn cmd_edit<R: TaskRepository, W: Write>(
    store: &mut TaskStore<R>,
    out: &mut W,
    args: EditArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let patch = edit_patch(&args)?;
    if patch.is_empty() {
        return Err(anyhow!("nothing to change for task {}", args.id));
    }

    let task = store.update(&args.id, &patch, now)?;
    writeln!(out, "Updated task {}.", task.id)?;
    Ok(())
}

fn edit_patch(args: &EditArgs) -> anyhow::Result<TaskPatch> {
    let due_date = if args.clear_due {
        Some(None)
    } else {
        args.due
            .as_deref()
            .map(parse_due_date)
            .transpose()?
            .map(Some)
    };

    let assignee = if args.clear_assignee {
        Some(None)
    } else {
        args.assignee.clone().map(Some)
    };

    let tags = if args.clear_tags {
        Some(vec![])
    } else if args.tags.is_empty() {
        None
    } else {
        Some(args.tags.clone())
    };

    Ok(TaskPatch {
        title: args.title.clone(),
        description: if args.clear_description {
            Some(None)
        } else {
            args.description.clone().map(Some)
        },
        status: args.status.as_deref().map(str::parse::<TaskStatus>).transpose()?,
        priority: args
            .priority
            .as_deref()
            .map(str::parse::<TaskPriority>)
            .transpose()?,
        due_date,
        assignee,
        tags,
    })
}

fn cmd_pages<W: Write>(
    cfg: &Config,
    renderer: &Renderer,
    out: &mut W,
    args: PagesArgs,
) -> anyhow::Result<()> {
    let total = match (args.total, args.items) {
        (Some(total), _) => total,
        (None, Some(items)) => page_count(items, args.limit.unwrap_or(cfg.catalog.page_limit)),
        (None, None) => return Err(anyhow!("pass a page total or --items")),
    };

    let pager = Pager::new(args.current, total);
    debug!(current = pager.current(), total, "computed pager");
    renderer.print_pager(out, &pager)
}
