//! Fee-sharing reward pool.
//!
//! Stakers enter the pool with their xNOS weight. Fees paid into the pool
//! are shared pro rata by lowering a global rate: each entry holds a fixed
//! reflection, and `reflection / rate` grows as the rate falls. An entry's
//! reward is that value minus the xNOS it entered with.

use std::collections::BTreeMap;

use nos_core::amount::UNITS_PER_NOS;
use nos_core::{Address, Amount};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RewardError;
use crate::staking::StakeAccount;

/// Total NOS supply in base units.
pub const NOS_TOTAL_SUPPLY: u128 = 100_000_000 * UNITS_PER_NOS as u128;

/// Starting rate: the largest clean multiple that keeps
/// `NOS_TOTAL_SUPPLY * rate` within `u128`.
pub const INITIAL_RATE: u128 = (u128::MAX - (u128::MAX % NOS_TOTAL_SUPPLY)) / NOS_TOTAL_SUPPLY;

/// One staker's share of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEntry {
    /// Reflection fixed at entry or last sync.
    pub reflection: u128,
    /// xNOS weight at entry or last sync.
    pub xnos: u128,
}

/// Reward pool over all entered stakers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPool {
    rate: u128,
    total_reflection: u128,
    total_xnos: u128,
    entries: BTreeMap<Address, RewardEntry>,
}

impl Default for RewardPool {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardPool {
    /// Creates an empty pool.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rate: INITIAL_RATE,
            total_reflection: 0,
            total_xnos: 0,
            entries: BTreeMap::new(),
        }
    }

    /// Current rate.
    #[must_use]
    pub const fn rate(&self) -> u128 {
        self.rate
    }

    /// Sum of xNOS plus distributed fees held by the pool.
    #[must_use]
    pub const fn total_xnos(&self) -> u128 {
        self.total_xnos
    }

    /// The entry of `authority`, if entered.
    #[must_use]
    pub fn entry(&self, authority: &Address) -> Option<&RewardEntry> {
        self.entries.get(authority)
    }

    /// Enters `stake` into the pool with its current xNOS.
    ///
    /// # Errors
    ///
    /// Fails if the stake is unstaked or already entered.
    pub fn enter(&mut self, stake: &StakeAccount) -> Result<(), RewardError> {
        if stake.is_unstaked() || stake.xnos == 0 {
            return Err(RewardError::StakeInactive(stake.authority));
        }
        if self.entries.contains_key(&stake.authority) {
            return Err(RewardError::AlreadyEntered(stake.authority));
        }
        let entry = self.add_entry(stake.xnos)?;
        self.entries.insert(stake.authority, entry);
        info!(authority = %stake.authority, xnos = stake.xnos, "reward entry created");
        Ok(())
    }

    /// Shares `fee` across every entry by weight.
    ///
    /// # Errors
    ///
    /// Fails with `RewardError::Empty` when nobody has entered.
    pub fn add_fee(&mut self, fee: Amount) -> Result<(), RewardError> {
        if self.total_xnos == 0 {
            return Err(RewardError::Empty);
        }
        self.total_xnos = self
            .total_xnos
            .checked_add(u128::from(fee.as_units()))
            .ok_or(RewardError::Overflow)?;
        self.rate = self.total_reflection / self.total_xnos;
        debug!(fee = %fee, rate = self.rate, "fee added to reward pool");
        Ok(())
    }

    /// Reward accrued by `authority` since entry or last claim.
    #[must_use]
    pub fn pending(&self, authority: &Address) -> Option<Amount> {
        self.entries
            .get(authority)
            .map(|entry| self.accrued(entry))
    }

    /// Pays out the accrued reward and re-enters at the stake's current
    /// xNOS. Also picks up a `topup` or `extend` since the last sync.
    ///
    /// # Errors
    ///
    /// Fails if `stake` has not entered.
    pub fn claim(&mut self, stake: &StakeAccount) -> Result<Amount, RewardError> {
        let amount = self.remove(&stake.authority)?;
        if stake.xnos > 0 {
            let entry = self.add_entry(stake.xnos)?;
            self.entries.insert(stake.authority, entry);
        }
        info!(authority = %stake.authority, amount = %amount, "reward claimed");
        Ok(amount)
    }

    /// Leaves the pool, paying out the accrued reward.
    ///
    /// # Errors
    ///
    /// Fails if `authority` has not entered.
    pub fn close(&mut self, authority: &Address) -> Result<Amount, RewardError> {
        let amount = self.remove(authority)?;
        info!(authority = %authority, amount = %amount, "reward entry closed");
        Ok(amount)
    }

    fn accrued(&self, entry: &RewardEntry) -> Amount {
        let value = entry.reflection / self.rate;
        let reward = value.saturating_sub(entry.xnos);
        Amount::from_units(u64::try_from(reward).unwrap_or(u64::MAX))
    }

    fn add_entry(&mut self, xnos: u128) -> Result<RewardEntry, RewardError> {
        let reflection = xnos.checked_mul(self.rate).ok_or(RewardError::Overflow)?;
        self.total_reflection = self
            .total_reflection
            .checked_add(reflection)
            .ok_or(RewardError::Overflow)?;
        self.total_xnos = self
            .total_xnos
            .checked_add(xnos)
            .ok_or(RewardError::Overflow)?;
        Ok(RewardEntry { reflection, xnos })
    }

    fn remove(&mut self, authority: &Address) -> Result<Amount, RewardError> {
        let entry = self
            .entries
            .remove(authority)
            .ok_or(RewardError::NotFound(*authority))?;
        let amount = self.accrued(&entry);
        // The entry's share of total_xnos is its weight plus what it earned.
        let share = entry.xnos.saturating_add(u128::from(amount.as_units()));
        self.total_xnos = self.total_xnos.saturating_sub(share);
        self.total_reflection = self.total_reflection.saturating_sub(entry.reflection);
        Ok(amount)
    }
}
