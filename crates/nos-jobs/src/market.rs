//! Market records.

use nos_core::{find_program_address, Address};
use serde::{Deserialize, Serialize};

use crate::config::MarketConfig;
use crate::queue::{Queue, QueueType};

/// Returns the escrow vault address of `market` for `mint`.
#[must_use]
pub fn vault_address(market: &Address, mint: &Address) -> Address {
    find_program_address(&[b"vault", market.as_bytes(), mint.as_bytes()])
}

/// A market account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Identity allowed to update and close the market.
    pub authority: Address,
    /// Escrow token account, owned by itself.
    pub vault: Address,
    /// Reserved job key that can never hold a running job.
    pub placeholder: Address,
    /// Current configuration.
    pub config: MarketConfig,
    /// Waiting jobs or waiting nodes.
    pub queue: Queue,
}

impl Market {
    /// Creates a market with an empty queue.
    #[must_use]
    pub fn new(authority: Address, vault: Address, placeholder: Address, config: MarketConfig) -> Self {
        Self {
            authority,
            vault,
            placeholder,
            config,
            queue: Queue::Empty,
        }
    }

    /// Kind of the queued entries.
    #[must_use]
    pub const fn queue_type(&self) -> QueueType {
        self.queue.queue_type()
    }
}
