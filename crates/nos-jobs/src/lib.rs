//! # nos-jobs
//!
//! The Nosana job market: a state machine matching projects that pay for
//! compute with nodes that provide it.
//!
//! This crate provides:
//!
//! - Markets with a single FIFO queue of waiting jobs or waiting nodes
//! - The job lifecycle (`Running`, `Done`, `Quit`) with escrowed payment
//! - Stake and NFT based node admission
//! - Signed instruction dispatch and structured job queries
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use nos_core::{Address, Amount, ContentRef, ManualClock};
//! use nos_jobs::{JobSlot, JobsProgram, MarketConfig, NodeCredentials, Outcome, ProgramConfig};
//!
//! let mut program = JobsProgram::new(ProgramConfig::default(), Arc::new(ManualClock::new(0)));
//! let (owner, market) = (Address::unique(), Address::unique());
//! program.open(owner, market, Address::unique(), MarketConfig::default()).unwrap();
//!
//! let project = Address::unique();
//! program.airdrop(project, Amount::from_nos(10)).unwrap();
//! program.list(project, market, JobSlot::Placeholder, ContentRef::from_content(b"job")).unwrap();
//!
//! let node = Address::unique();
//! program.airdrop(node, Amount::from_nos(10)).unwrap();
//! let stake = program.stake(node, Amount::from_nos(10), nos_token::DURATION_MIN).unwrap();
//!
//! let job = Address::unique();
//! let outcome = program
//!     .work(node, market, JobSlot::Fresh(job), &NodeCredentials::stake_only(stake))
//!     .unwrap();
//! assert!(matches!(outcome, Outcome::JobMatched { .. }));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod config;
pub mod error;
pub mod instruction;
pub mod job;
pub mod market;
pub mod program;
pub mod query;
pub mod queue;
pub mod shared;

pub use access::{AccessControl, NodeCredentials};
pub use config::{JobType, MarketConfig, ProgramConfig, DEFAULT_FEE_DIVISOR};
pub use error::JobsError;
pub use instruction::{Instruction, Outcome, SignedInstruction};
pub use job::{Job, JobSlot, JobStatus};
pub use market::{vault_address, Market};
pub use program::{JobsProgram, ProgramState};
pub use query::JobFilter;
pub use queue::{Queue, QueueType, QueuedJob};
pub use shared::SharedProgram;
