//! Execution status vocabulary
//!
//! Statuses arrive as free-form, case-insensitive strings. Parsing is total:
//! unknown values are kept verbatim as `Other` with priority 0.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of one execution record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExecStatus {
    Succeeded,
    Completed,
    Failed,
    Error,
    Running,
    Rejected,
    Accepted,
    Pending,
    Skipped,
    Routed,
    Timeout,
    Scheduled,
    Other(String),
}

impl ExecStatus {
    /// Parse a raw status (trimmed, case-insensitive)
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "succeeded" => ExecStatus::Succeeded,
            "completed" => ExecStatus::Completed,
            "failed" => ExecStatus::Failed,
            "error" => ExecStatus::Error,
            "running" => ExecStatus::Running,
            "rejected" => ExecStatus::Rejected,
            "accepted" => ExecStatus::Accepted,
            "pending" => ExecStatus::Pending,
            "skipped" => ExecStatus::Skipped,
            "routed" => ExecStatus::Routed,
            "timeout" => ExecStatus::Timeout,
            "scheduled" => ExecStatus::Scheduled,
            _ => ExecStatus::Other(normalized),
        }
    }

    /// Reconciliation tier. Higher wins; equal tiers fall back to recency.
    ///
    /// `Rejected` shares tier 3 with `Running`. Terminality is decided
    /// separately by [`ExecStatus::is_terminal`].
    pub fn priority(&self) -> u8 {
        match self {
            ExecStatus::Succeeded | ExecStatus::Completed => 5,
            ExecStatus::Failed | ExecStatus::Error => 4,
            ExecStatus::Running | ExecStatus::Rejected => 3,
            ExecStatus::Accepted => 2,
            ExecStatus::Pending | ExecStatus::Skipped | ExecStatus::Routed => 1,
            _ => 0,
        }
    }

    /// Whether this status closes an execution
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecStatus::Succeeded
                | ExecStatus::Completed
                | ExecStatus::Failed
                | ExecStatus::Error
                | ExecStatus::Rejected
                | ExecStatus::Skipped
        )
    }

    /// Final outcome as understood by `finalOnly` routing rules
    pub fn is_final_outcome(&self) -> bool {
        matches!(
            self,
            ExecStatus::Succeeded
                | ExecStatus::Completed
                | ExecStatus::Error
                | ExecStatus::Failed
                | ExecStatus::Timeout
                | ExecStatus::Routed
        )
    }

    /// Statuses that make an execution count as an alert even without severity
    pub fn is_failure(&self) -> bool {
        matches!(self, ExecStatus::Failed | ExecStatus::Error | ExecStatus::Timeout)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExecStatus::Succeeded => "succeeded",
            ExecStatus::Completed => "completed",
            ExecStatus::Failed => "failed",
            ExecStatus::Error => "error",
            ExecStatus::Running => "running",
            ExecStatus::Rejected => "rejected",
            ExecStatus::Accepted => "accepted",
            ExecStatus::Pending => "pending",
            ExecStatus::Skipped => "skipped",
            ExecStatus::Routed => "routed",
            ExecStatus::Timeout => "timeout",
            ExecStatus::Scheduled => "scheduled",
            ExecStatus::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ExecStatus {
    fn from(raw: &str) -> Self {
        ExecStatus::parse(raw)
    }
}

impl Serialize for ExecStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExecStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(ExecStatus::parse(raw.as_deref().unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(ExecStatus::parse("  SUCCEEDED "), ExecStatus::Succeeded);
        assert_eq!(ExecStatus::parse("Accepted"), ExecStatus::Accepted);
        assert_eq!(ExecStatus::parse("Weird"), ExecStatus::Other("weird".into()));
    }

    #[test]
    fn test_priority_tiers() {
        assert_eq!(ExecStatus::Succeeded.priority(), 5);
        assert_eq!(ExecStatus::Completed.priority(), 5);
        assert_eq!(ExecStatus::Error.priority(), 4);
        assert_eq!(ExecStatus::Rejected.priority(), 3);
        assert_eq!(ExecStatus::Running.priority(), 3);
        assert_eq!(ExecStatus::Accepted.priority(), 2);
        assert_eq!(ExecStatus::Routed.priority(), 1);
        assert_eq!(ExecStatus::parse("").priority(), 0);
    }

    #[test]
    fn test_terminal_independent_of_priority() {
        assert!(ExecStatus::Rejected.is_terminal());
        assert!(ExecStatus::Skipped.is_terminal());
        assert!(!ExecStatus::Running.is_terminal());
        assert!(!ExecStatus::Routed.is_terminal());
    }
}
