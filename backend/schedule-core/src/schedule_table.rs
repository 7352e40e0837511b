// src/schedule_table.rs
use chrono::NaiveDate;
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::data_source::ScheduleSource;
use crate::models::{PositionId, PositionKey, TaskId, WorkerId, EMPTY_POSITION_NAME};

const TASK_DATE_FORMAT: &str = "%Y-%m-%d";
const COLUMN_DATE_FORMAT: &str = "%-d %b %y";
const NAME_COLUMN: &str = "Name";

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Task {task_id} referenced by assignment for worker {worker_id} not found")]
    MissingTask { task_id: TaskId, worker_id: WorkerId },

    #[error("Worker {worker_id} assigned to task {task_id} not found")]
    MissingWorker { worker_id: WorkerId, task_id: TaskId },

    #[error("Position {position_id} not found")]
    MissingPosition { position_id: PositionId },

    #[error("Invalid date format '{date}': expected YYYY-MM-DD")]
    MalformedDate { date: String },

    #[error("Invalid date format '{date}': {source}")]
    InvalidDate {
        date: String,
        #[source]
        source: chrono::ParseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Position,
    Worker,
}

/// One line of the table. Serializes as `[name, hours...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Not serialized; marks where each position group starts.
    pub(crate) kind: RowKind,
    pub name: String,
    pub hours: Vec<u64>,
}

impl Serialize for TableRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(1 + self.hours.len()))?;
        seq.serialize_element(&self.name)?;
        for hours in &self.hours {
            seq.serialize_element(hours)?;
        }
        seq.end()
    }
}

/// Worked hours pivoted by date: each position row is followed by the rows
/// of the workers who did that position's tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleTable {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl ScheduleTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the table as CSV, header first. An empty table writes nothing.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        if !self.columns.is_empty() {
            wtr.write_record(&self.columns)?;
        }
        for row in &self.rows {
            let record = std::iter::once(row.name.clone())
                .chain(row.hours.iter().map(|h| h.to_string()));
            wtr.write_record(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

// chrono's %Y takes any digit count and a leading sign, so the shape is
// checked first: a 4-digit year, then 1-2 digit month and day.
fn has_task_date_shape(date: &str) -> bool {
    let digits = |part: &str, min: usize, max: usize| {
        (min..=max).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
    };
    let mut parts = date.split('-');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(year), Some(month), Some(day), None) => {
            digits(year, 4, 4) && digits(month, 1, 2) && digits(day, 1, 2)
        }
        _ => false,
    }
}

/// Parses a task date (`YYYY-MM-DD`).
pub fn parse_task_date(date: &str) -> Result<NaiveDate, ProcessingError> {
    if !has_task_date_shape(date) {
        return Err(ProcessingError::MalformedDate {
            date: date.to_string(),
        });
    }
    NaiveDate::parse_from_str(date, TASK_DATE_FORMAT).map_err(|source| {
        ProcessingError::InvalidDate {
            date: date.to_string(),
            source,
        }
    })
}

/// Formats a task date as a column header, e.g. `2025-01-15` -> `15 Jan 25`.
pub fn format_date(date: &str) -> Result<String, ProcessingError> {
    Ok(format_column_date(parse_task_date(date)?))
}

fn format_column_date(date: NaiveDate) -> String {
    date.format(COLUMN_DATE_FORMAT).to_string()
}

#[derive(Default)]
struct HoursAccumulator {
    dates: BTreeSet<NaiveDate>,
    // Keyed per position so a worker split across positions adds up in each group.
    worker_date_hours: HashMap<(PositionKey, WorkerId), HashMap<NaiveDate, u64>>,
    position_workers: BTreeMap<PositionKey, BTreeSet<WorkerId>>,
    position_date_hours: HashMap<PositionKey, HashMap<NaiveDate, u64>>,
}

impl HoursAccumulator {
    fn add(&mut self, worker_id: WorkerId, position: PositionKey, date: NaiveDate, hours: u64) {
        *self
            .worker_date_hours
            .entry((position, worker_id))
            .or_default()
            .entry(date)
            .or_insert(0) += hours;
        self.dates.insert(date);
        self.position_workers
            .entry(position)
            .or_default()
            .insert(worker_id);
        *self
            .position_date_hours
            .entry(position)
            .or_default()
            .entry(date)
            .or_insert(0) += hours;
    }
}

fn hours_by_date(
    date_hours: Option<&HashMap<NaiveDate, u64>>,
    dates: &[NaiveDate],
) -> Vec<u64> {
    dates
        .iter()
        .map(|date| date_hours.and_then(|h| h.get(date)).copied().unwrap_or(0))
        .collect()
}

/// Builds the schedule table from a consistent set of collections.
///
/// Hours are booked against the position of the task, falling back to the
/// "Empty Position" group for tasks without one. A worker row under a
/// position holds the hours that worker spent on that position's tasks, so
/// each position row is the sum of its worker rows. A worker who did tasks
/// for two positions therefore appears under both, each row holding only
/// that position's share rather than the worker's full total. Positions are ordered by
/// id with the empty group last; workers within a position by id. Any
/// dangling reference or unparseable date fails the whole computation.
pub fn compute_schedule_table<S: ScheduleSource + ?Sized>(
    source: &S,
) -> Result<ScheduleTable, ProcessingError> {
    info!("Starting schedule data processing");
    let result = build_table(source);
    match &result {
        Ok(table) => info!(
            rows = table.rows.len(),
            dates = table.columns.len().saturating_sub(1),
            "Schedule data processing finished"
        ),
        Err(e) => error!("Schedule processing failed: {}", e),
    }
    result
}

fn build_table<S: ScheduleSource + ?Sized>(source: &S) -> Result<ScheduleTable, ProcessingError> {
    let mut acc = HoursAccumulator::default();
    let mut worker_names: HashMap<WorkerId, &str> = HashMap::new();

    for assignment in source.assignments() {
        let task = source
            .task(assignment.task_id)
            .ok_or(ProcessingError::MissingTask {
                task_id: assignment.task_id,
                worker_id: assignment.worker_id,
            })?;
        let worker = source
            .worker(assignment.worker_id)
            .ok_or(ProcessingError::MissingWorker {
                worker_id: assignment.worker_id,
                task_id: assignment.task_id,
            })?;
        worker_names.insert(assignment.worker_id, worker.name.as_str());

        let date = parse_task_date(&task.date)?;
        acc.add(
            assignment.worker_id,
            PositionKey::from(task.position_id),
            date,
            u64::from(task.duration),
        );
    }

    if acc.position_workers.is_empty() {
        debug!("No assignments found, returning empty schedule table");
        return Ok(ScheduleTable::default());
    }

    let dates: Vec<NaiveDate> = acc.dates.iter().copied().collect();
    let mut rows = Vec::new();

    for (position, worker_ids) in &acc.position_workers {
        let position_name = match *position {
            PositionKey::Assigned(position_id) => source
                .position(position_id)
                .map(|p| p.name.clone())
                .ok_or(ProcessingError::MissingPosition { position_id })?,
            PositionKey::Unassigned => EMPTY_POSITION_NAME.to_string(),
        };
        rows.push(TableRow {
            kind: RowKind::Position,
            name: position_name,
            hours: hours_by_date(acc.position_date_hours.get(position), &dates),
        });

        for worker_id in worker_ids {
            rows.push(TableRow {
                kind: RowKind::Worker,
                name: worker_names[worker_id].to_string(),
                hours: hours_by_date(
                    acc.worker_date_hours.get(&(*position, *worker_id)),
                    &dates,
                ),
            });
        }
    }

    let columns = std::iter::once(NAME_COLUMN.to_string())
        .chain(dates.iter().map(|date| format_column_date(*date)))
        .collect();

    Ok(ScheduleTable { columns, rows })
}
