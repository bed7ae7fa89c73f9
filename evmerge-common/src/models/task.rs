//! Task state machine
//!
//! pending → in_progress → completed | failed, strictly forward, no retries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{FilterSpec, NormalizedRecord};
use crate::Error;

/// Store-assigned task identifier
pub type TaskId = i64;

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created and queued, not yet picked up
    Pending,
    /// Picked up by the worker
    InProgress,
    /// Records appended, terminal
    Completed,
    /// A data source could not be loaded, terminal
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// The only state this one may be entered from
    ///
    /// `Pending` is initial and has no predecessor.
    pub fn predecessor(&self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Pending => None,
            TaskStatus::InProgress => Some(TaskStatus::Pending),
            TaskStatus::Completed | TaskStatus::Failed => Some(TaskStatus::InProgress),
        }
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        next.predecessor() == Some(*self)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(Error::Internal(format!("Unknown task status: {}", other))),
        }
    }
}

/// A unit of asynchronous merge work and its output
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    pub filter: FilterSpec,
    pub records: Vec<NormalizedRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    #[test]
    fn test_only_forward_transitions_allowed() {
        let allowed: Vec<(TaskStatus, TaskStatus)> = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (TaskStatus::Pending, TaskStatus::InProgress),
                (TaskStatus::InProgress, TaskStatus::Completed),
                (TaskStatus::InProgress, TaskStatus::Failed),
            ]
        );
    }

    #[test]
    fn test_status_strings_match_wire_format() {
        for status in ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("in progress".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }
}
