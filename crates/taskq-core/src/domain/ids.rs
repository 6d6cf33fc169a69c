//! Task identifiers.
//!
//! Ids are ULIDs: sortable by creation time, generated without coordination,
//! 128-bit. `TaskId` wraps one so that a task id cannot be confused with any
//! other string flowing through the system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

const PREFIX: &str = "task-";

/// Identifier of a task. Assigned once at creation and never reused.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Ulid);

impl TaskId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for TaskId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.0)
    }
}

/// Accepts both the bare ULID and the `task-` prefixed display form.
impl FromStr for TaskId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(PREFIX).unwrap_or(s);
        Ulid::from_string(raw).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_has_prefix_and_parses_back() {
        let id = TaskId::from_ulid(Ulid::new());
        let shown = id.to_string();
        assert!(shown.starts_with("task-"));
        assert_eq!(shown.parse::<TaskId>().unwrap(), id);
        assert_eq!(id.as_ulid().to_string().parse::<TaskId>().unwrap(), id);
    }

    #[test]
    fn serializes_as_bare_string() {
        let ulid = Ulid::new();
        let id = TaskId::from_ulid(ulid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{ulid}\""));
    }

    #[test]
    fn ids_sort_by_creation_time() {
        let a = TaskId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = TaskId::from_ulid(Ulid::new());
        assert!(a < b);
    }

    #[test]
    fn rejects_garbage() {
        assert!("task-not-a-ulid".parse::<TaskId>().is_err());
    }
}
