//! Stake accounts.
//!
//! A node locks NOS for a chosen duration; the locked amount gates admission
//! to markets. Tokens sit in a per-stake vault owned by the vault address.

use std::collections::BTreeMap;

use nos_core::{find_program_address, Address, Amount};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StakingError;
use crate::ledger::{Ledger, Transfer};

/// Seconds in a day.
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Shortest allowed stake duration (2 weeks).
pub const DURATION_MIN: u64 = 14 * SECONDS_PER_DAY;

/// Longest allowed stake duration (1 year).
pub const DURATION_MAX: u64 = 365 * SECONDS_PER_DAY;

/// A stake must exceed this amount.
pub const STAKE_MINIMUM: Amount = Amount::from_nos(1);

const XNOS_PRECISION: u128 = 1_000_000_000_000_000;
const XNOS_DIV: u128 = 4 * DURATION_MAX as u128 / 12;

/// Returns the stake account address for `authority`.
#[must_use]
pub fn stake_address(authority: &Address, mint: &Address) -> Address {
    find_program_address(&[b"stake", mint.as_bytes(), authority.as_bytes()])
}

/// Returns the token vault address backing the stake of `authority`.
#[must_use]
pub fn stake_vault_address(authority: &Address, mint: &Address) -> Address {
    find_program_address(&[b"vault", mint.as_bytes(), authority.as_bytes()])
}

/// A node's stake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeAccount {
    /// Locked amount.
    pub amount: Amount,
    /// Owner of the stake.
    pub authority: Address,
    /// Lock duration in seconds.
    pub duration: u64,
    /// Unix time of unstake, zero while staked.
    pub time_unstake: i64,
    /// Token vault holding the locked amount.
    pub vault: Address,
    /// Duration-weighted stake.
    pub xnos: u128,
}

impl StakeAccount {
    /// Returns true once the owner has started unstaking.
    #[must_use]
    pub const fn is_unstaked(&self) -> bool {
        self.time_unstake != 0
    }

    fn update_xnos(&mut self) {
        self.xnos = if self.is_unstaked() {
            0
        } else {
            (u128::from(self.duration) * XNOS_PRECISION / XNOS_DIV + XNOS_PRECISION)
                * u128::from(self.amount.as_units())
                / XNOS_PRECISION
        };
    }
}

/// All stake accounts for one mint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staking {
    mint: Address,
    stakes: BTreeMap<Address, StakeAccount>,
}

impl Staking {
    /// Creates an empty staking registry for `mint`.
    #[must_use]
    pub fn new(mint: Address) -> Self {
        Self {
            mint,
            stakes: BTreeMap::new(),
        }
    }

    /// The staked mint.
    #[must_use]
    pub const fn mint(&self) -> &Address {
        &self.mint
    }

    /// Looks up a stake account by its address.
    #[must_use]
    pub fn get(&self, address: &Address) -> Option<&StakeAccount> {
        self.stakes.get(address)
    }

    /// Looks up the stake of `authority`.
    #[must_use]
    pub fn of(&self, authority: &Address) -> Option<&StakeAccount> {
        self.stakes.get(&stake_address(authority, &self.mint))
    }

    /// Locks `amount` from `from` for `duration` seconds.
    ///
    /// # Errors
    ///
    /// Fails on out-of-range duration or amount, an existing stake, or a
    /// failed token transfer.
    pub fn stake(
        &mut self,
        ledger: &mut Ledger,
        authority: Address,
        from: Address,
        amount: Amount,
        duration: u64,
    ) -> Result<Address, StakingError> {
        if duration < DURATION_MIN {
            return Err(StakingError::DurationTooShort);
        }
        if duration > DURATION_MAX {
            return Err(StakingError::DurationTooLong);
        }
        if amount <= STAKE_MINIMUM {
            return Err(StakingError::AmountNotEnough);
        }
        let address = stake_address(&authority, &self.mint);
        if self.stakes.contains_key(&address) {
            return Err(StakingError::AlreadyExists(authority));
        }

        let vault = stake_vault_address(&authority, &self.mint);
        let created = ledger.account(&vault).is_none();
        if created {
            ledger.create_account(vault, vault, self.mint)?;
        }
        if let Err(e) = ledger.transfer(Transfer {
            from,
            to: vault,
            authority,
            amount,
        }) {
            if created {
                ledger.close_account(&vault, &vault)?;
            }
            return Err(e.into());
        }

        let mut stake = StakeAccount {
            amount,
            authority,
            duration,
            time_unstake: 0,
            vault,
            xnos: 0,
        };
        stake.update_xnos();
        self.stakes.insert(address, stake);

        info!(authority = %authority, amount = %amount, duration, "stake created");
        Ok(address)
    }

    /// Adds `amount` to an active stake.
    ///
    /// # Errors
    ///
    /// Fails if the stake is missing, unstaked, or the transfer fails.
    pub fn topup(
        &mut self,
        ledger: &mut Ledger,
        authority: Address,
        from: Address,
        amount: Amount,
    ) -> Result<(), StakingError> {
        let address = stake_address(&authority, &self.mint);
        let stake = self
            .stakes
            .get(&address)
            .ok_or(StakingError::NotFound(authority))?;
        if stake.is_unstaked() {
            return Err(StakingError::AlreadyUnstaked);
        }
        let total = stake
            .amount
            .checked_add(amount)
            .ok_or(crate::LedgerError::Overflow)?;
        ledger.transfer(Transfer {
            from,
            to: stake.vault,
            authority,
            amount,
        })?;

        if let Some(stake) = self.stakes.get_mut(&address) {
            stake.amount = total;
            stake.update_xnos();
        }
        Ok(())
    }

    /// Lengthens an active stake by `duration` seconds.
    ///
    /// # Errors
    ///
    /// Fails if the stake is missing or unstaked, or the new duration is out
    /// of range.
    pub fn extend(&mut self, authority: &Address, duration: u64) -> Result<(), StakingError> {
        let stake = self
            .stakes
            .get_mut(&stake_address(authority, &self.mint))
            .ok_or(StakingError::NotFound(*authority))?;
        if stake.is_unstaked() {
            return Err(StakingError::AlreadyUnstaked);
        }
        if duration == 0 {
            return Err(StakingError::DurationTooShort);
        }
        if stake.duration.saturating_add(duration) > DURATION_MAX {
            return Err(StakingError::DurationTooLong);
        }
        stake.duration += duration;
        stake.update_xnos();
        Ok(())
    }

    /// Starts unstaking at `now`; the stake no longer qualifies for admission.
    ///
    /// # Errors
    ///
    /// Fails if the stake is missing or already unstaked.
    pub fn unstake(&mut self, authority: &Address, now: i64) -> Result<(), StakingError> {
        let stake = self
            .stakes
            .get_mut(&stake_address(authority, &self.mint))
            .ok_or(StakingError::NotFound(*authority))?;
        if stake.is_unstaked() {
            return Err(StakingError::AlreadyUnstaked);
        }
        stake.time_unstake = now;
        stake.update_xnos();
        info!(authority = %authority, "stake unstaked");
        Ok(())
    }
}
