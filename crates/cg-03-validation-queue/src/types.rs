//! Queue item and priority shapes (§4.4).

use serde::{Deserialize, Serialize};
use shared_types::entities::{Finding, Severity};

/// Scheduling priority a finding is enqueued with, derived from its
/// severity (§4.4 "Severity -> priority map").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// `CRITICAL -> high, HIGH -> medium, else low`.
    #[must_use]
    pub fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Self::High,
            Severity::High => Self::Medium,
            Severity::Medium | Severity::Low | Severity::Info => Self::Low,
        }
    }

    /// Lower rank sorts first; used as the primary sort key for the
    /// priority FIFO (§4.4 "sorted insert by (priorityRank ASC,
    /// enqueuedAt ASC)").
    fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// A single work item in the validation queue.
///
/// `id` is the finding's id: the queue dedups by this key (invariant 8,
/// §4.4 "rejects duplicates by id").
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: String,
    pub finding: Finding,
    pub priority: Priority,
    pub enqueued_at: i64,
    pub attempts: u32,
}

impl QueueItem {
    #[must_use]
    pub fn new(finding: Finding, enqueued_at: i64) -> Self {
        let priority = Priority::from_severity(finding.severity);
        Self {
            id: finding.id.clone(),
            finding,
            priority,
            enqueued_at,
            attempts: 0,
        }
    }
}

/// Snapshot of queue/rate/budget state (§4.4 "Stats").
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub active: usize,
    pub completed: u64,
    pub failed: u64,
    pub total_cost: f64,
    pub budget_remaining: f64,
    pub rate_window_used: usize,
    pub rate_window_capacity: usize,
    pub paused: bool,
}
