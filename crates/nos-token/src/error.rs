//! Error types for token custody, staking and rewards.

use nos_core::{Address, Amount};
use thiserror::Error;

/// Errors raised by the token ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Token account does not exist.
    #[error("token account not found: {0}")]
    AccountNotFound(Address),

    /// Token account already exists.
    #[error("token account already exists: {0}")]
    AccountExists(Address),

    /// Source account cannot cover the debit.
    #[error("insufficient funds in {account}: have {have}, need {need}")]
    InsufficientFunds {
        /// Debited account.
        account: Address,
        /// Current balance.
        have: Amount,
        /// Required balance.
        need: Amount,
    },

    /// Source and destination hold different mints.
    #[error("mint mismatch between {from} and {to}")]
    MintMismatch {
        /// Source account.
        from: Address,
        /// Destination account.
        to: Address,
    },

    /// Signer does not own the account.
    #[error("{authority} does not own token account {account}")]
    OwnerMismatch {
        /// Account being debited or closed.
        account: Address,
        /// Signer that attempted the operation.
        authority: Address,
    },

    /// Account still holds tokens.
    #[error("token account {0} is not empty")]
    AccountNotEmpty(Address),

    /// Arithmetic overflow.
    #[error("amount overflow")]
    Overflow,
}

/// Errors raised by the staking records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakingError {
    /// Requested duration below the minimum.
    #[error("stake duration too short")]
    DurationTooShort,

    /// Requested duration above the maximum.
    #[error("stake duration too long")]
    DurationTooLong,

    /// Stake amount at or below the minimum.
    #[error("stake amount not enough")]
    AmountNotEnough,

    /// Authority already has a stake.
    #[error("stake already exists for {0}")]
    AlreadyExists(Address),

    /// No stake for the authority.
    #[error("stake not found for {0}")]
    NotFound(Address),

    /// Stake is already unstaked.
    #[error("stake already unstaked")]
    AlreadyUnstaked,

    /// Token movement failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errors raised by the reward pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewardError {
    /// Stake is unstaked or carries no weight.
    #[error("stake of {0} is not active")]
    StakeInactive(Address),

    /// Authority already has a reward entry.
    #[error("reward entry already exists for {0}")]
    AlreadyEntered(Address),

    /// No reward entry for the authority.
    #[error("reward entry not found for {0}")]
    NotFound(Address),

    /// Fee added while nobody is entered.
    #[error("reward pool has no entries")]
    Empty,

    /// Arithmetic overflow.
    #[error("reward overflow")]
    Overflow,
}
