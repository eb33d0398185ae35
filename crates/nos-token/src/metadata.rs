//! NFT metadata records.
//!
//! An NFT is a token account holding the single unit of a fresh mint. Its
//! metadata record lives at an address derived from the mint and may name a
//! collection; markets restrict admission to NFTs of a verified collection.

use std::collections::BTreeMap;

use nos_core::{find_program_address, Address, Amount};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::LedgerError;
use crate::ledger::Ledger;

/// Returns the metadata address for `mint`.
#[must_use]
pub fn metadata_address(mint: &Address) -> Address {
    find_program_address(&[b"metadata", mint.as_bytes()])
}

/// Collection membership of an NFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Collection key.
    pub key: Address,
    /// Whether the collection authority verified membership.
    pub verified: bool,
}

/// Metadata for one mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Mint this record describes.
    pub mint: Address,
    /// Display name.
    pub name: String,
    /// Collection membership, if any.
    pub collection: Option<Collection>,
}

impl Metadata {
    /// Returns true if the NFT belongs to the verified collection `key`.
    #[must_use]
    pub fn in_verified_collection(&self, key: &Address) -> bool {
        self.collection
            .is_some_and(|c| c.verified && c.key == *key)
    }
}

/// Handles to a freshly minted NFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nft {
    /// The 1-supply mint.
    pub mint: Address,
    /// Token account holding the unit.
    pub account: Address,
    /// Metadata record address.
    pub metadata: Address,
}

/// All metadata records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRegistry {
    entries: BTreeMap<Address, Metadata>,
}

impl MetadataRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a metadata record by its address.
    #[must_use]
    pub fn get(&self, address: &Address) -> Option<&Metadata> {
        self.entries.get(address)
    }

    /// Mints a new NFT to `owner`, optionally as a verified collection member.
    ///
    /// # Errors
    ///
    /// Returns an error if the token account cannot be created or funded.
    pub fn create_nft(
        &mut self,
        ledger: &mut Ledger,
        owner: Address,
        name: impl Into<String>,
        collection: Option<Address>,
    ) -> Result<Nft, LedgerError> {
        let mint = Address::unique();
        let account = ledger.get_or_create_associated(owner, mint);
        ledger.mint_to(&account, Amount::from_units(1))?;

        let metadata = metadata_address(&mint);
        self.entries.insert(
            metadata,
            Metadata {
                mint,
                name: name.into(),
                collection: collection.map(|key| Collection {
                    key,
                    verified: true,
                }),
            },
        );

        info!(owner = %owner, mint = %mint, "nft minted");
        Ok(Nft {
            mint,
            account,
            metadata,
        })
    }
}
