//! Token custody.
//!
//! Balances live in token accounts, each bound to one owner and one mint.
//! Escrow vaults are plain token accounts whose owner is the vault's own
//! derived address, so only the program acting for that address can debit
//! them.

use std::collections::BTreeMap;

use nos_core::{find_program_address, Address, Amount};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LedgerError;

/// Returns the associated token account address for `owner` and `mint`.
#[must_use]
pub fn associated_address(owner: &Address, mint: &Address) -> Address {
    find_program_address(&[b"associated-token", owner.as_bytes(), mint.as_bytes()])
}

/// A token account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    /// Address allowed to debit or close this account.
    pub owner: Address,
    /// Mint of the tokens held.
    pub mint: Address,
    /// Current balance.
    pub amount: Amount,
}

/// One leg of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// Debited account.
    pub from: Address,
    /// Credited account.
    pub to: Address,
    /// Signer authorizing the debit; must own `from`.
    pub authority: Address,
    /// Amount moved.
    pub amount: Amount,
}

/// In-memory token ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    accounts: BTreeMap<Address, TokenAccount>,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token account at `address`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountExists` if the address is taken.
    pub fn create_account(
        &mut self,
        address: Address,
        owner: Address,
        mint: Address,
    ) -> Result<(), LedgerError> {
        if self.accounts.contains_key(&address) {
            return Err(LedgerError::AccountExists(address));
        }
        self.accounts.insert(
            address,
            TokenAccount {
                owner,
                mint,
                amount: Amount::ZERO,
            },
        );
        debug!(account = %address, owner = %owner, mint = %mint, "token account created");
        Ok(())
    }

    /// Creates the account at `address` unless it already exists.
    pub fn ensure_account(&mut self, address: Address, owner: Address, mint: Address) -> Address {
        self.accounts.entry(address).or_insert(TokenAccount {
            owner,
            mint,
            amount: Amount::ZERO,
        });
        address
    }

    /// Returns the associated account for `owner`, creating it if needed.
    pub fn get_or_create_associated(&mut self, owner: Address, mint: Address) -> Address {
        self.ensure_account(associated_address(&owner, &mint), owner, mint)
    }

    /// Mints new tokens into an existing account.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is missing or the balance overflows.
    pub fn mint_to(&mut self, address: &Address, amount: Amount) -> Result<(), LedgerError> {
        let account = self
            .accounts
            .get_mut(address)
            .ok_or(LedgerError::AccountNotFound(*address))?;
        account.amount = account
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        debug!(account = %address, amount = %amount, "tokens minted");
        Ok(())
    }

    /// Looks up a token account.
    #[must_use]
    pub fn account(&self, address: &Address) -> Option<&TokenAccount> {
        self.accounts.get(address)
    }

    /// Returns the balance of an account, zero if it does not exist.
    #[must_use]
    pub fn balance(&self, address: &Address) -> Amount {
        self.accounts.get(address).map_or(Amount::ZERO, |a| a.amount)
    }

    /// Moves tokens between two accounts.
    ///
    /// # Errors
    ///
    /// See [`Ledger::transfer_batch`].
    pub fn transfer(&mut self, transfer: Transfer) -> Result<(), LedgerError> {
        self.transfer_batch(&[transfer])
    }

    /// Applies every leg or none of them.
    ///
    /// All legs are evaluated in order against a scratch copy of the touched
    /// balances; the ledger is only written once the whole batch succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first failing leg's error: missing account, owner or mint
    /// mismatch, insufficient funds, or overflow.
    pub fn transfer_batch(&mut self, transfers: &[Transfer]) -> Result<(), LedgerError> {
        let mut scratch: BTreeMap<Address, Amount> = BTreeMap::new();

        for leg in transfers {
            let from = self
                .accounts
                .get(&leg.from)
                .ok_or(LedgerError::AccountNotFound(leg.from))?;
            let to = self
                .accounts
                .get(&leg.to)
                .ok_or(LedgerError::AccountNotFound(leg.to))?;
            if from.owner != leg.authority {
                return Err(LedgerError::OwnerMismatch {
                    account: leg.from,
                    authority: leg.authority,
                });
            }
            if from.mint != to.mint {
                return Err(LedgerError::MintMismatch {
                    from: leg.from,
                    to: leg.to,
                });
            }

            let have = *scratch.entry(leg.from).or_insert(from.amount);
            let remaining = have
                .checked_sub(leg.amount)
                .ok_or(LedgerError::InsufficientFunds {
                    account: leg.from,
                    have,
                    need: leg.amount,
                })?;
            scratch.insert(leg.from, remaining);

            let credited = scratch.entry(leg.to).or_insert(to.amount);
            *credited = credited
                .checked_add(leg.amount)
                .ok_or(LedgerError::Overflow)?;
        }

        for (address, amount) in scratch {
            if let Some(account) = self.accounts.get_mut(&address) {
                account.amount = amount;
            }
        }
        for leg in transfers {
            debug!(from = %leg.from, to = %leg.to, amount = %leg.amount, "transfer applied");
        }
        Ok(())
    }

    /// Closes an empty account owned by `authority`.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is missing, not owned by `authority`,
    /// or still holds tokens.
    pub fn close_account(
        &mut self,
        address: &Address,
        authority: &Address,
    ) -> Result<TokenAccount, LedgerError> {
        let account = self
            .accounts
            .get(address)
            .ok_or(LedgerError::AccountNotFound(*address))?;
        if account.owner != *authority {
            return Err(LedgerError::OwnerMismatch {
                account: *address,
                authority: *authority,
            });
        }
        if !account.amount.is_zero() {
            return Err(LedgerError::AccountNotEmpty(*address));
        }
        let closed = self
            .accounts
            .remove(address)
            .ok_or(LedgerError::AccountNotFound(*address))?;
        debug!(account = %address, "token account closed");
        Ok(closed)
    }

    /// Sums the balances of every account holding `mint`.
    #[must_use]
    pub fn supply(&self, mint: &Address) -> Amount {
        self.accounts
            .values()
            .filter(|a| a.mint == *mint)
            .fold(Amount::ZERO, |total, a| {
                total.checked_add(a.amount).unwrap_or(Amount::MAX)
            })
    }
}
