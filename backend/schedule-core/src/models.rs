// src/models.rs
use serde::Deserialize;

pub type PositionId = i64;
pub type WorkerId = i64;
pub type TaskId = i64;

/// Display label for the bucket holding work done without a position.
pub const EMPTY_POSITION_NAME: &str = "Empty Position";

/// A job role such as Supervisor, Welder or Fitter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub name: String,
}

/// A worker and their home position.
///
/// `position_id` is only informational: hours are booked against the
/// position of the task a worker was assigned to, not this one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    #[serde(default)]
    pub position_id: Option<PositionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub position_id: Option<PositionId>,
    pub duration: u32, // Hours
    pub date: String,  // YYYY-MM-DD, parsed when aggregated
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Assignment {
    pub task_id: TaskId,
    pub worker_id: WorkerId,
}

/// Grouping key for position rows.
///
/// The variant order matters: the derived `Ord` puts every real position
/// (ascending by id) before `Unassigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PositionKey {
    Assigned(PositionId),
    Unassigned,
}

impl From<Option<PositionId>> for PositionKey {
    fn from(position_id: Option<PositionId>) -> Self {
        match position_id {
            Some(id) => PositionKey::Assigned(id),
            None => PositionKey::Unassigned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unassigned_sorts_after_every_position() {
        let mut keys = vec![
            PositionKey::Unassigned,
            PositionKey::Assigned(i64::MAX),
            PositionKey::Assigned(-3),
            PositionKey::Assigned(2),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                PositionKey::Assigned(-3),
                PositionKey::Assigned(2),
                PositionKey::Assigned(i64::MAX),
                PositionKey::Unassigned,
            ]
        );
    }

    #[test]
    fn test_null_and_missing_position_id_deserialize_to_none() {
        let task: Task =
            serde_json::from_str(r#"{"id": 1, "position_id": null, "duration": 5, "date": "2025-01-15"}"#)
                .unwrap();
        assert_eq!(task.position_id, None);

        let worker: Worker = serde_json::from_str(r#"{"id": 7, "name": "Dana"}"#).unwrap();
        assert_eq!(worker.position_id, None);
        assert_eq!(PositionKey::from(worker.position_id), PositionKey::Unassigned);
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        let result: Result<Task, _> =
            serde_json::from_str(r#"{"id": 1, "position_id": 1, "duration": -2, "date": "2025-01-15"}"#);
        assert!(result.is_err(), "Negative durations should not deserialize");
    }
}
