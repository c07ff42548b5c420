//! # Service lifecycle status.
//!
//! ```text
//! Constructing ──► Constructed ──► Starting ──► Running ──► Stopping ──► Stopped
//!      │                │              │           │            │
//!      └────────────────┴──────────────┴─────┬─────┴────────────┘
//!                                            ▼
//!                                          Error   (terminal, sticky)
//! ```
//!
//! Transitions only move forward. `Error` is reachable from any state and is
//! never left once entered.

use std::fmt;

/// Lifecycle state of a single service.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// The constructor is running.
    Constructing = 0,
    /// The value exists; nothing was started yet.
    Constructed = 1,
    /// Dependencies and then the service itself are starting.
    Starting = 2,
    /// Started successfully.
    Running = 3,
    /// Stop in progress.
    Stopping = 4,
    /// Stopped successfully.
    Stopped = 5,
    /// Failed; see the service error tree.
    Error = 6,
}

impl Status {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Status::Constructing,
            1 => Status::Constructed,
            2 => Status::Starting,
            3 => Status::Running,
            4 => Status::Stopping,
            5 => Status::Stopped,
            _ => Status::Error,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Status::Constructing => "constructing",
            Status::Constructed => "constructed",
            Status::Starting => "starting",
            Status::Running => "running",
            Status::Stopping => "stopping",
            Status::Stopped => "stopped",
            Status::Error => "error",
        }
    }

    /// True once the service went through start and may still have to stop.
    ///
    /// Used by the stop ordering gate: only such dependents are waited for.
    pub(crate) fn is_live(&self) -> bool {
        matches!(self, Status::Starting | Status::Running | Status::Stopping)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
