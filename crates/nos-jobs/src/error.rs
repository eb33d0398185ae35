//! Error types for nos-jobs.
//!
//! Every rejected operation maps to exactly one variant and leaves no state
//! behind.

use nos_core::Address;
use nos_token::{LedgerError, StakingError};
use thiserror::Error;

use crate::queue::QueueType;

/// Errors that can occur in job market operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobsError {
    /// Signer does not hold the required role.
    #[error("unauthorized")]
    Unauthorized,

    /// The job's status does not allow this operation.
    #[error("job in wrong state")]
    JobInWrongState,

    /// The supplied job slot cannot hold a new job.
    #[error("job constraint not satisfied")]
    JobConstraintNotSatisfied,

    /// The job's expiration window has not elapsed.
    #[error("job not expired")]
    JobNotExpired,

    /// The node already waits in this market's queue.
    #[error("node already queued")]
    NodeAlreadyQueued,

    /// The credential metadata account is missing or malformed.
    #[error("node nft wrong metadata")]
    NodeNftWrongMetadata,

    /// The credential NFT is not held by the signer.
    #[error("node nft wrong owner")]
    NodeNftWrongOwner,

    /// The credential NFT is not part of the market's verified collection.
    #[error("node key invalid collection")]
    NodeKeyInvalidCollection,

    /// The node's stake is below the market minimum.
    #[error("node not enough stake")]
    NodeNotEnoughStake,

    /// The node's stake is unstaked.
    #[error("node no stake")]
    NodeNoStake,

    /// The market vault still holds escrow.
    #[error("vault not empty")]
    VaultNotEmpty,

    /// Nodes are still waiting in the market queue.
    #[error("queue not empty")]
    QueueNotEmpty,

    /// The account key was already used.
    #[error("account already in use: {0}")]
    AccountInUse(Address),

    /// No market at this key.
    #[error("market not found: {0}")]
    MarketNotFound(Address),

    /// No job at this key.
    #[error("job not found: {0}")]
    JobNotFound(Address),

    /// The queue holds the other entry kind.
    #[error("queue holds {0} entries")]
    QueueMismatch(QueueType),

    /// The instruction signature did not verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// Encoding an instruction failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Token movement failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A stake operation failed.
    #[error("staking error: {0}")]
    Staking(#[from] StakingError),
}
