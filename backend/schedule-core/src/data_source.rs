// src/data_source.rs
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{Assignment, Position, PositionId, Task, TaskId, Worker, WorkerId};

pub const POSITIONS_FILE: &str = "positions.json";
pub const WORKERS_FILE: &str = "workers.json";
pub const TASKS_FILE: &str = "tasks.json";
pub const ASSIGNMENTS_FILE: &str = "assignments.json";

#[derive(Error, Debug)]
pub enum DataAccessError {
    #[error("Data file not found: {file}")]
    FileNotFound { file: String },

    #[error("Cannot read file {file}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {file}: {source}")]
    InvalidJson {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected list in {file}, got {found}")]
    NotAList { file: String, found: &'static str },

    #[error("Invalid {file} data structure: {source}")]
    InvalidRecord {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate {entity} id {id}")]
    DuplicateId { entity: &'static str, id: i64 },
}

/// Read access to the four collections the schedule table is built from.
pub trait ScheduleSource {
    fn assignments(&self) -> &[Assignment];
    fn task(&self, id: TaskId) -> Option<&Task>;
    fn worker(&self, id: WorkerId) -> Option<&Worker>;
    fn position(&self, id: PositionId) -> Option<&Position>;
}

/// Immutable, id-indexed copy of the datasets.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    positions: HashMap<PositionId, Position>,
    workers: HashMap<WorkerId, Worker>,
    tasks: HashMap<TaskId, Task>,
    assignments: Vec<Assignment>,
}

impl Snapshot {
    pub fn new(
        positions: Vec<Position>,
        workers: Vec<Worker>,
        tasks: Vec<Task>,
        assignments: Vec<Assignment>,
    ) -> Result<Self, DataAccessError> {
        Ok(Self {
            positions: index_by_id("position", positions, |p| p.id)?,
            workers: index_by_id("worker", workers, |w| w.id)?,
            tasks: index_by_id("task", tasks, |t| t.id)?,
            assignments,
        })
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl ScheduleSource for Snapshot {
    fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    fn worker(&self, id: WorkerId) -> Option<&Worker> {
        self.workers.get(&id)
    }

    fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }
}

fn index_by_id<T>(
    entity: &'static str,
    items: Vec<T>,
    id_of: impl Fn(&T) -> i64,
) -> Result<HashMap<i64, T>, DataAccessError> {
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        let id = id_of(&item);
        if index.insert(id, item).is_some() {
            return Err(DataAccessError::DuplicateId { entity, id });
        }
    }
    Ok(index)
}

/// Produces a fresh snapshot on demand.
pub trait SnapshotLoader: Send + Sync {
    fn load(&self) -> Result<Snapshot, DataAccessError>;
}

/// Loads the datasets from `<data_dir>/{positions,workers,tasks,assignments}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    data_dir: PathBuf,
}

impl JsonFileLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn load_list<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, DataAccessError> {
        let path = self.data_dir.join(file);
        if !path.exists() {
            return Err(DataAccessError::FileNotFound {
                file: file.to_string(),
            });
        }

        let json_string = fs::read_to_string(&path).map_err(|source| DataAccessError::Io {
            file: file.to_string(),
            source,
        })?;
        let value: Value =
            serde_json::from_str(&json_string).map_err(|source| DataAccessError::InvalidJson {
                file: file.to_string(),
                source,
            })?;
        if !value.is_array() {
            return Err(DataAccessError::NotAList {
                file: file.to_string(),
                found: json_type_name(&value),
            });
        }

        let items: Vec<T> =
            serde_json::from_value(value).map_err(|source| DataAccessError::InvalidRecord {
                file: file.to_string(),
                source,
            })?;
        info!("Successfully loaded {} items from {}", items.len(), file);
        Ok(items)
    }
}

impl SnapshotLoader for JsonFileLoader {
    fn load(&self) -> Result<Snapshot, DataAccessError> {
        debug!("Loading schedule datasets from {:?}", self.data_dir);
        Snapshot::new(
            self.load_list(POSITIONS_FILE)?,
            self.load_list(WORKERS_FILE)?,
            self.load_list(TASKS_FILE)?,
            self.load_list(ASSIGNMENTS_FILE)?,
        )
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Lazily loaded snapshot shared across requests.
///
/// At most one load happens per refresh; concurrent first callers block on
/// the write lock and then all receive the same `Arc<Snapshot>`.
pub struct SnapshotCache {
    loader: Box<dyn SnapshotLoader>,
    slot: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotCache {
    pub fn new(loader: impl SnapshotLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            slot: RwLock::new(None),
        }
    }

    // The slot is only ever replaced by a fully built snapshot, so a lock
    // poisoned by a panicking loader still guards consistent state.
    fn read_slot(&self) -> RwLockReadGuard<'_, Option<Arc<Snapshot>>> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Option<Arc<Snapshot>>> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot>, DataAccessError> {
        if let Some(snapshot) = self.read_slot().as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let mut slot = self.write_slot();
        // Another caller may have loaded while we waited for the write lock.
        if let Some(snapshot) = slot.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = Arc::new(self.loader.load()?);
        debug!(
            positions = snapshot.position_count(),
            workers = snapshot.worker_count(),
            tasks = snapshot.task_count(),
            assignments = snapshot.assignments().len(),
            "Cached schedule snapshot"
        );
        *slot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Drops the cached snapshot so the next access reloads it.
    pub fn refresh(&self) {
        *self.write_slot() = None;
        info!("Data cache cleared");
    }

    pub fn is_loaded(&self) -> bool {
        self.read_slot().is_some()
    }
}
