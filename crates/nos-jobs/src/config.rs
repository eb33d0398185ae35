//! Program-wide and per-market configuration.

use std::fmt;

use nos_core::{find_program_address, Address, Amount};
use serde::{Deserialize, Serialize};

/// Default platform fee divisor: a tenth of the job price.
pub const DEFAULT_FEE_DIVISOR: u64 = 10;

/// Program-wide settings shared by every market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    /// Mint of the payment token.
    pub mint: Address,
    /// Fee charged on `list` is `price / fee_divisor`; zero disables fees.
    pub fee_divisor: u64,
    /// Token account receiving platform fees.
    pub fee_collector: Address,
}

impl ProgramConfig {
    /// Platform fee for a job of the given price.
    #[must_use]
    pub fn fee_for(&self, price: Amount) -> Amount {
        price.checked_div(self.fee_divisor).unwrap_or(Amount::ZERO)
    }
}

impl Default for ProgramConfig {
    fn default() -> Self {
        let mint = find_program_address(&[b"mint", b"NOS"]);
        Self {
            mint,
            fee_divisor: DEFAULT_FEE_DIVISOR,
            fee_collector: find_program_address(&[b"fees", mint.as_bytes()]),
        }
    }
}

/// Hardware class a market's jobs target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// No particular class.
    #[default]
    Default,
    /// Small CPU jobs.
    Small,
    /// Medium CPU jobs.
    Medium,
    /// Large CPU jobs.
    Large,
    /// GPU jobs.
    Gpu,
    /// Unclassified.
    Unknown,
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
            Self::Gpu => write!(f, "gpu"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Market configuration, set by `open` and replaced by `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Seconds after completion before a finished job may be cleaned.
    pub job_expiration: i64,
    /// Price escrowed per job.
    pub job_price: Amount,
    /// Seconds a running job may take.
    pub job_timeout: i64,
    /// Hardware class.
    pub job_type: JobType,
    /// Minimum stake for node admission.
    pub node_stake_minimum: Amount,
    /// Required NFT collection; [`Address::SYSTEM`] means no restriction.
    pub node_access_key: Address,
}

impl MarketConfig {
    /// Returns true if admission requires a collection NFT.
    #[must_use]
    pub fn requires_access_key(&self) -> bool {
        !self.node_access_key.is_system()
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            job_expiration: 24 * 60 * 60,
            job_price: Amount::from_nos(1),
            job_timeout: 60 * 60,
            job_type: JobType::Default,
            node_stake_minimum: Amount::ZERO,
            node_access_key: Address::SYSTEM,
        }
    }
}
