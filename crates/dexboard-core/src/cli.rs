use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dexboard",
    version,
    about = "Task board and Pokémon catalog pager",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Table view with sorting and paging.
    List(ListArgs),
    /// Kanban lanes, one per status.
    Board(FilterArgs),
    Add(AddArgs),
    Edit(EditArgs),
    /// Change a task's status.
    Status { id: String, status: String },
    Delete { id: String },
    Show { id: String },
    /// Counts per status plus known assignees and tags.
    Summary,
    /// Page-link window for a paged list.
    Pages(PagesArgs),
    /// Prints the JSON body of the catalog list query for a page.
    CatalogRequest {
        /// 1-based page, as in `?page=`.
        page: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Lists a saved catalog query response with its page links.
    CatalogPage {
        response: PathBuf,
        /// 1-based page the response was fetched for.
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long)]
    pub tag: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Column to sort by.
    #[arg(long)]
    pub sort: Option<String>,

    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// 1-based page of the table.
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    #[arg(long)]
    pub page_size: Option<usize>,

    /// Search every column.
    #[arg(long)]
    pub global: Option<String>,
}

impl Default for ListArgs {
    fn default() -> Self {
        Self {
            filters: FilterArgs::default(),
            sort: None,
            desc: false,
            page: 1,
            page_size: None,
            global: None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, default_value = "TO DO")]
    pub status: String,
    #[arg(long, default_value = "Medium")]
    pub priority: String,
    /// YYYY-MM-DD or RFC 3339.
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long = "tag", action = ArgAction::Append)]
    pub tags: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,
    #[arg(long)]
    pub clear_description: bool,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<String>,
    #[arg(long)]
    pub clear_due: bool,
    #[arg(long, conflicts_with = "clear_assignee")]
    pub assignee: Option<String>,
    #[arg(long)]
    pub clear_assignee: bool,
    /// Replaces the tag list.
    #[arg(long = "tag", action = ArgAction::Append)]
    pub tags: Vec<String>,
    #[arg(long)]
    pub clear_tags: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PagesArgs {
    pub current: u32,
    /// Total pages; omit when passing `--items`.
    #[arg(required_unless_present = "items")]
    pub total: Option<u32>,
    #[arg(long, conflicts_with = "total")]
    pub items: Option<u64>,
    #[arg(long)]
    pub limit: Option<u32>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        GlobalCli::command().debug_assert();
    }

    #[test]
    fn parses_list_with_filters_and_sort() {
        let cli = GlobalCli::parse_from([
            "dexboard", "-v", "list", "--status", "todo", "--sort", "due", "--desc", "--page", "2",
        ]);
        assert_eq!(cli.verbose, 1);
        let Some(Command::List(args)) = cli.command else {
            panic!("expected list command");
        };
        assert_eq!(args.filters.status.as_deref(), Some("todo"));
        assert_eq!(args.sort.as_deref(), Some("due"));
        assert!(args.desc);
        assert_eq!(args.page, 2);
    }

    #[test]
    fn add_defaults_match_the_form() {
        let cli = GlobalCli::parse_from(["dexboard", "add", "Train", "--tag", "a", "--tag", "b"]);
        let Some(Command::Add(args)) = cli.command else {
            panic!("expected add command");
        };
        assert_eq!(args.status, "TO DO");
        assert_eq!(args.priority, "Medium");
        assert_eq!(args.tags, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn rc_overrides_are_key_values() {
        let cli = GlobalCli::parse_from(["dexboard", "--rc", "color=off", "summary"]);
        assert_eq!(cli.rc_overrides.len(), 1);
        assert_eq!(cli.rc_overrides[0].key, "color");
        assert!(GlobalCli::try_parse_from(["dexboard", "--rc", "color", "summary"]).is_err());
    }

    #[test]
    fn pages_needs_total_or_items() {
        assert!(GlobalCli::try_parse_from(["dexboard", "pages", "3"]).is_err());
        assert!(GlobalCli::try_parse_from(["dexboard", "pages", "3", "10"]).is_ok());
        assert!(GlobalCli::try_parse_from(["dexboard", "pages", "3", "--items", "1302"]).is_ok());
    }
}
