//! Node admission checks.
//!
//! Nodes prove eligibility with a stake account and, for gated markets, an
//! NFT from the market's verified collection. `work` admits nodes to a
//! market; `claim` re-admits a node to take over an abandoned job and always
//! requires the NFT.

use nos_core::{Address, Amount};
use nos_token::{metadata_address, stake_address, Ledger, Metadata, MetadataRegistry, Staking, TokenAccount};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MarketConfig;
use crate::error::JobsError;

/// Accounts a node presents for admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCredentials {
    /// The node's stake account.
    pub stake: Address,
    /// Token account holding the node's access NFT.
    #[serde(default)]
    pub nft: Option<Address>,
    /// Metadata account of the NFT's mint.
    #[serde(default)]
    pub metadata: Option<Address>,
}

impl NodeCredentials {
    /// Credentials with only a stake account.
    #[must_use]
    pub const fn stake_only(stake: Address) -> Self {
        Self {
            stake,
            nft: None,
            metadata: None,
        }
    }

    /// Adds an NFT and its metadata account.
    #[must_use]
    pub const fn with_nft(mut self, nft: Address, metadata: Address) -> Self {
        self.nft = Some(nft);
        self.metadata = Some(metadata);
        self
    }
}

/// Read-only view over the collaborators consulted for admission.
#[derive(Debug, Clone, Copy)]
pub struct AccessControl<'a> {
    ledger: &'a Ledger,
    staking: &'a Staking,
    registry: &'a MetadataRegistry,
}

impl<'a> AccessControl<'a> {
    /// Creates a view over the given collaborators.
    #[must_use]
    pub const fn new(ledger: &'a Ledger, staking: &'a Staking, registry: &'a MetadataRegistry) -> Self {
        Self {
            ledger,
            staking,
            registry,
        }
    }

    /// Admission for `work`.
    ///
    /// # Errors
    ///
    /// Stake failures first, then NFT ownership, metadata and collection when
    /// the market is gated.
    pub fn admit(
        &self,
        node: &Address,
        credentials: &NodeCredentials,
        config: &MarketConfig,
    ) -> Result<(), JobsError> {
        self.check_stake(node, credentials, config.node_stake_minimum)?;
        if config.requires_access_key() {
            let nft = self.check_nft(node, credentials)?;
            let metadata = self.check_metadata(credentials, Some(nft))?;
            check_collection(metadata, &config.node_access_key)?;
        }
        debug!(node = %node, "node admitted");
        Ok(())
    }

    /// Admission for `claim`.
    ///
    /// # Errors
    ///
    /// Metadata presence first, then stake, NFT ownership, the NFT/metadata
    /// mint match and collection.
    pub fn admit_claim(
        &self,
        node: &Address,
        credentials: &NodeCredentials,
        config: &MarketConfig,
    ) -> Result<(), JobsError> {
        let metadata = self.check_metadata(credentials, None)?;
        self.check_stake(node, credentials, config.node_stake_minimum)?;
        let nft = self.check_nft(node, credentials)?;
        if nft.mint != metadata.mint {
            return Err(JobsError::NodeNftWrongMetadata);
        }
        if config.requires_access_key() {
            check_collection(metadata, &config.node_access_key)?;
        }
        debug!(node = %node, "node admitted for claim");
        Ok(())
    }

    fn check_stake(
        &self,
        node: &Address,
        credentials: &NodeCredentials,
        minimum: Amount,
    ) -> Result<(), JobsError> {
        if credentials.stake != stake_address(node, self.staking.mint()) {
            return Err(JobsError::Unauthorized);
        }
        let stake = self
            .staking
            .get(&credentials.stake)
            .ok_or(JobsError::NodeNoStake)?;
        if stake.authority != *node {
            return Err(JobsError::Unauthorized);
        }
        if stake.is_unstaked() {
            return Err(JobsError::NodeNoStake);
        }
        if stake.amount < minimum {
            return Err(JobsError::NodeNotEnoughStake);
        }
        Ok(())
    }

    fn check_nft(
        &self,
        node: &Address,
        credentials: &NodeCredentials,
    ) -> Result<&'a TokenAccount, JobsError> {
        let account = credentials
            .nft
            .and_then(|key| self.ledger.account(&key))
            .ok_or(JobsError::NodeNftWrongOwner)?;
        if account.owner != *node || account.amount != Amount::from_units(1) {
            return Err(JobsError::NodeNftWrongOwner);
        }
        Ok(account)
    }

    /// The metadata record must exist and, when the NFT is known, sit at the
    /// address derived from its mint.
    fn check_metadata(
        &self,
        credentials: &NodeCredentials,
        nft: Option<&TokenAccount>,
    ) -> Result<&'a Metadata, JobsError> {
        let address = credentials.metadata.ok_or(JobsError::NodeNftWrongMetadata)?;
        if nft.is_some_and(|nft| metadata_address(&nft.mint) != address) {
            return Err(JobsError::NodeNftWrongMetadata);
        }
        self.registry
            .get(&address)
            .ok_or(JobsError::NodeNftWrongMetadata)
    }
}

fn check_collection(metadata: &Metadata, access_key: &Address) -> Result<(), JobsError> {
    if metadata.in_verified_collection(access_key) {
        Ok(())
    } else {
        Err(JobsError::NodeKeyInvalidCollection)
    }
}
