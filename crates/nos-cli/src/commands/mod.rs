//! CLI command implementations.
//!
//! Each submodule implements a group of CLI commands:
//! - [`setup`] - Keys, airdrops, stake, and access NFTs
//! - [`market`] - Market lifecycle
//! - [`job`] - Job lifecycle and queries

pub mod job;
pub mod market;
pub mod setup;

pub use job::JobCommand;
pub use market::MarketCommand;
pub use setup::SetupCommand;
