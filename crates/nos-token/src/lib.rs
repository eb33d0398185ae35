//! # nos-token
//!
//! The value-custody and access-control records the job market consumes.
//!
//! This crate provides:
//! - [`Ledger`] - token accounts with atomic batch transfers (escrow vaults
//!   are ordinary token accounts owned by a derived address)
//! - [`Staking`] - stake accounts that gate node admission
//! - [`MetadataRegistry`] - NFT metadata with verified collections, used as
//!   node access credentials
//! - [`RewardPool`] - fee sharing weighted by stake xNOS
//!
//! Everything here is an in-memory simulation of the on-ledger programs,
//! serializable so a whole world can be snapshotted to disk.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ledger;
pub mod metadata;
pub mod rewards;
pub mod staking;

pub use error::{LedgerError, RewardError, StakingError};
pub use ledger::{associated_address, Ledger, TokenAccount, Transfer};
pub use metadata::{metadata_address, Collection, Metadata, MetadataRegistry, Nft};
pub use rewards::{RewardEntry, RewardPool, INITIAL_RATE, NOS_TOTAL_SUPPLY};
pub use staking::{
    stake_address, stake_vault_address, StakeAccount, Staking, DURATION_MAX, DURATION_MIN,
    SECONDS_PER_DAY, STAKE_MINIMUM,
};
