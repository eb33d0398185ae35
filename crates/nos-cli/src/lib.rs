//! # nos-cli
//!
//! Command-line interface for the Nosana job market.
//!
//! Provides commands for:
//! - Key management, NOS airdrops, staking, and access NFTs
//! - Market lifecycle (open, update, close)
//! - Job lifecycle (list, work, finish, quit, claim, clean, recover)
//! - Market and job queries
//!
//! # Architecture
//!
//! Every invocation resumes the program from a JSON snapshot in the state
//! directory, signs the instruction with a key from the local keyring, and
//! writes the snapshot back only if the instruction commits.
//!
//! ```text
//! ┌──────────────┐  signed instruction  ┌─────────────┐
//! │ nosana-jobs  │─────────────────────►│ JobsProgram │
//! └──────┬───────┘                      └──────┬──────┘
//!        │ keyring.json                        │ state.json
//!        └──────────── state dir ◄─────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod persist;
pub mod session;

pub use cli::{Cli, Commands, Format, JobArgs, MarketArgs, SlotArgs};
pub use error::CliError;
pub use output::OutputFormat;
pub use session::Session;
