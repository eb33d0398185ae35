//! Job records and their lifecycle.

use std::fmt;

use nos_core::{Address, Amount, ContentRef};
use serde::{Deserialize, Serialize};

use crate::error::JobsError;
use crate::market::Market;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Listed and waiting for a node.
    Queued,
    /// Assigned to a node.
    Running,
    /// Finished and paid out.
    Done,
    /// Abandoned by its node; open for claim or recovery.
    Quit,
}

impl JobStatus {
    /// Checks if a transition to the target status is valid.
    #[must_use]
    pub const fn can_transition_to(&self, target: &Self) -> bool {
        use JobStatus::{Done, Queued, Quit, Running};

        matches!(
            (self, target),
            (Queued | Quit, Running) | (Running, Done | Quit)
        )
    }

    /// Returns true if the job has settled and holds no escrow.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Quit => write!(f, "quit"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "done" => Ok(Self::Done),
            "quit" => Ok(Self::Quit),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Where a matched job record should be written.
///
/// Enqueue paths never consume the slot, so callers that only expect to wait
/// in the queue pass [`JobSlot::Placeholder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum JobSlot {
    /// No job account; a match through this slot is rejected.
    Placeholder,
    /// A previously unused job key.
    Fresh(Address),
}

impl JobSlot {
    /// The supplied key, if any.
    #[must_use]
    pub const fn key(&self) -> Option<&Address> {
        match self {
            Self::Placeholder => None,
            Self::Fresh(key) => Some(key),
        }
    }
}

/// A job account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Market the job belongs to.
    pub market: Address,
    /// Identity that listed and paid for the job.
    pub project: Address,
    /// Identity currently assigned to run it.
    pub node: Address,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Job specification; replaced by the result on finish.
    pub payload: ContentRef,
    /// Escrowed price.
    pub price: Amount,
    /// Unix time the job started running; zero before.
    pub time_start: i64,
    /// Unix time the job finished; zero before.
    pub time_end: i64,
}

impl Job {
    /// Creates a job that starts running at `now`.
    #[must_use]
    pub const fn running(
        market: Address,
        project: Address,
        node: Address,
        payload: ContentRef,
        price: Amount,
        now: i64,
    ) -> Self {
        Self {
            market,
            project,
            node,
            status: JobStatus::Running,
            payload,
            price,
            time_start: now,
            time_end: 0,
        }
    }

    /// Moves the job to `target`.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::JobInWrongState` if the table forbids the move.
    pub fn transition_to(&mut self, target: JobStatus) -> Result<(), JobsError> {
        if self.status.can_transition_to(&target) {
            self.status = target;
            Ok(())
        } else {
            Err(JobsError::JobInWrongState)
        }
    }

    /// Returns true if the job has been running longer than the market allows.
    #[must_use]
    pub fn is_timed_out(&self, market: &Market, now: i64) -> bool {
        self.status == JobStatus::Running
            && now >= self.time_start.saturating_add(market.config.job_timeout)
    }

    /// Earliest time `clean` may reclaim the record.
    #[must_use]
    pub const fn expires_at(&self, job_expiration: i64) -> i64 {
        self.time_end.saturating_add(job_expiration)
    }
}
