//! Task record and the values it is built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{TaskId, TaskStatus};
use crate::error::QueueError;

/// Opaque structured payload. Interpreted only by the handler for the task's kind.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Closed set of task kinds; selects the execution handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Email,
    DataProcessing,
    FileConversion,
    ApiCall,
    ReportGeneration,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Email,
        TaskKind::DataProcessing,
        TaskKind::FileConversion,
        TaskKind::ApiCall,
        TaskKind::ReportGeneration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Email => "email",
            TaskKind::DataProcessing => "data_processing",
            TaskKind::FileConversion => "file_conversion",
            TaskKind::ApiCall => "api_call",
            TaskKind::ReportGeneration => "report_generation",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown task kind: {s}"))
    }
}

/// Scheduling priority in `1..=10`; higher is served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Priority(u8);

impl Priority {
    pub const MIN: Priority = Priority(1);
    pub const MAX: Priority = Priority(10);

    pub fn new(value: i64) -> Result<Self, QueueError> {
        if (Self::MIN.0 as i64..=Self::MAX.0 as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(QueueError::InvalidPriority(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<i64> for Priority {
    type Error = QueueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for i64 {
    fn from(p: Priority) -> Self {
        p.0 as i64
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a submitter provides. Priority is kept raw so that range checking
/// happens in exactly one place, `TaskQueue::create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default = "default_priority")]
    pub priority: i64,
}

fn default_priority() -> i64 {
    Priority::default().get() as i64
}

impl NewTask {
    pub fn new(name: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            name: name.into(),
            kind,
            payload: Payload::new(),
            priority: default_priority(),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }
}

/// The full task record, stored as one self-describing JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub payload: Payload,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub progress: u8,
}

impl Task {
    pub fn new(
        id: TaskId,
        name: String,
        kind: TaskKind,
        payload: Payload,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            status: TaskStatus::Pending,
            payload,
            priority,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            error: None,
            retry_count: 0,
            progress: 0,
        }
    }

    /// Merge the set fields of `patch` and refresh `updated_at`.
    pub fn apply(&mut self, patch: &TaskPatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(error) = &patch.error {
            self.error = Some(error.clone());
        }
        if let Some(progress) = patch.progress {
            self.progress = progress.min(100);
        }
        if let Some(started_at) = patch.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = Some(completed_at);
        }
        self.updated_at = now;
    }
}

/// Partial update of the mutable task fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub error: Option<String>,
    pub progress: Option<u8>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }
}
