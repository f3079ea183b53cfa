use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::task::Task;

const TASKS_FILE: &str = "tasks.json";

/// Persistence collaborator for [`crate::store::TaskStore`].
pub trait TaskRepository {
    /// `Ok(None)` means nothing has been stored yet.
    fn load(&self) -> anyhow::Result<Option<Vec<Task>>>;

    fn save(&mut self, tasks: &[Task]) -> anyhow::Result<()>;
}

/// Stores the whole collection as one JSON array, the same shape the web
/// client kept under its `tasks` key.
#[derive(Debug)]
pub struct JsonFileRepository {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
}

impl JsonFileRepository {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join(TASKS_FILE);

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
        })
    }
}

impl TaskRepository for JsonFileRepository {
    #[tracing::instrument(skip(self))]
    fn load(&self) -> anyhow::Result<Option<Vec<Task>>> {
        if !self.tasks_path.exists() {
            debug!(file = %self.tasks_path.display(), "no stored tasks yet");
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.tasks_path)
            .with_context(|| format!("failed reading {}", self.tasks_path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let tasks: Vec<Task> = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.tasks_path.display()))?;
        debug!(count = tasks.len(), "loaded tasks");
        Ok(Some(tasks))
    }

    #[tracing::instrument(skip(self, tasks))]
    fn save(&mut self, tasks: &[Task]) -> anyhow::Result<()> {
        save_json_atomic(&self.tasks_path, tasks).context("failed to save tasks.json")
    }
}

/// Keeps the collection in memory only.
#[derive(Debug, Default, Clone)]
pub struct MemoryRepository {
    stored: Option<Vec<Task>>,
    saves: usize,
}

impl MemoryRepository {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            stored: Some(tasks),
            saves: 0,
        }
    }

    pub fn stored(&self) -> Option<&[Task]> {
        self.stored.as_deref()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl TaskRepository for MemoryRepository {
    fn load(&self) -> anyhow::Result<Option<Vec<Task>>> {
        Ok(self.stored.clone())
    }

    fn save(&mut self, tasks: &[Task]) -> anyhow::Result<()> {
        self.stored = Some(tasks.to_vec());
        self.saves += 1;
        Ok(())
    }
}

#[tracing::instrument(skip(path, tasks))]
fn save_json_atomic(path: &Path, tasks: &[Task]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = tasks.len(), "saving json atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, tasks)?;
    writeln!(temp)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
