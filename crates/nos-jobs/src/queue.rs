//! The market queue.
//!
//! A market holds either waiting jobs or waiting nodes, never both. The
//! variant carries the kind, so a mixed queue cannot be represented, and an
//! emptied queue always collapses back to [`Queue::Empty`].

use std::collections::VecDeque;
use std::fmt;

use nos_core::{Address, Amount, ContentRef};
use serde::{Deserialize, Serialize};

use crate::error::JobsError;

/// Kind of entries a queue currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueType {
    /// No entries.
    Empty,
    /// Waiting jobs.
    JobQueue,
    /// Waiting nodes.
    NodeQueue,
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::JobQueue => write!(f, "job"),
            Self::NodeQueue => write!(f, "node"),
        }
    }
}

/// A job waiting for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedJob {
    /// Project that listed the job.
    pub user: Address,
    /// Job specification.
    pub payload: ContentRef,
    /// Amount escrowed at listing.
    pub price: Amount,
}

/// FIFO of waiting jobs or waiting nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "entries", rename_all = "snake_case")]
pub enum Queue {
    /// Nothing waiting.
    #[default]
    Empty,
    /// Jobs waiting for nodes; never empty.
    Jobs(VecDeque<QueuedJob>),
    /// Nodes waiting for jobs; never empty.
    Nodes(VecDeque<Address>),
}

impl Queue {
    /// Kind of the queued entries.
    #[must_use]
    pub const fn queue_type(&self) -> QueueType {
        match self {
            Self::Empty => QueueType::Empty,
            Self::Jobs(_) => QueueType::JobQueue,
            Self::Nodes(_) => QueueType::NodeQueue,
        }
    }

    /// Number of waiting entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Jobs(jobs) => jobs.len(),
            Self::Nodes(nodes) => nodes.len(),
        }
    }

    /// Returns true if nothing waits.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The node at the head of a node queue.
    #[must_use]
    pub fn front_node(&self) -> Option<&Address> {
        match self {
            Self::Nodes(nodes) => nodes.front(),
            _ => None,
        }
    }

    /// The job at the head of a job queue.
    #[must_use]
    pub fn front_job(&self) -> Option<&QueuedJob> {
        match self {
            Self::Jobs(jobs) => jobs.front(),
            _ => None,
        }
    }

    /// Returns true if `node` is waiting.
    #[must_use]
    pub fn contains_node(&self, node: &Address) -> bool {
        matches!(self, Self::Nodes(nodes) if nodes.contains(node))
    }

    /// Appends a job; returns its 1-based position.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::QueueMismatch` if nodes are waiting.
    pub fn push_job(&mut self, job: QueuedJob) -> Result<usize, JobsError> {
        match self {
            Self::Empty => {
                *self = Self::Jobs(VecDeque::from([job]));
                Ok(1)
            }
            Self::Jobs(jobs) => {
                jobs.push_back(job);
                Ok(jobs.len())
            }
            Self::Nodes(_) => Err(JobsError::QueueMismatch(QueueType::NodeQueue)),
        }
    }

    /// Appends a node; returns its 1-based position.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::QueueMismatch` if jobs are waiting.
    pub fn push_node(&mut self, node: Address) -> Result<usize, JobsError> {
        match self {
            Self::Empty => {
                *self = Self::Nodes(VecDeque::from([node]));
                Ok(1)
            }
            Self::Nodes(nodes) => {
                nodes.push_back(node);
                Ok(nodes.len())
            }
            Self::Jobs(_) => Err(JobsError::QueueMismatch(QueueType::JobQueue)),
        }
    }

    /// Removes the head of a job queue.
    pub fn pop_job(&mut self) -> Option<QueuedJob> {
        let Self::Jobs(jobs) = self else {
            return None;
        };
        let job = jobs.pop_front();
        if jobs.is_empty() {
            *self = Self::Empty;
        }
        job
    }

    /// Removes the head of a node queue.
    pub fn pop_node(&mut self) -> Option<Address> {
        let Self::Nodes(nodes) = self else {
            return None;
        };
        let node = nodes.pop_front();
        if nodes.is_empty() {
            *self = Self::Empty;
        }
        node
    }

    /// Sum of the escrow carried by waiting jobs.
    #[must_use]
    pub fn escrowed(&self) -> Amount {
        match self {
            Self::Jobs(jobs) => jobs.iter().fold(Amount::ZERO, |total, job| {
                total.checked_add(job.price).unwrap_or(Amount::MAX)
            }),
            _ => Amount::ZERO,
        }
    }
}
