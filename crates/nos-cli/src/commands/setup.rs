//! World setup commands.
//!
//! These act directly on the local snapshot without a signed instruction:
//! - Creating named keys
//! - Minting NOS
//! - Staking and unstaking
//! - Minting access NFTs

use std::io::Write;

use nos_core::{Address, Amount};
use nos_token::{stake_address, SECONDS_PER_DAY};

use crate::error::CliError;
use crate::output::{BalanceInfo, KeyInfo, Message, NftInfo, OutputFormat, StakeInfo};
use crate::session::Session;

/// Name recorded in the metadata of minted access NFTs.
const NFT_NAME: &str = "Nosana Node";

/// Setup command executor.
pub struct SetupCommand<'a> {
    session: &'a mut Session,
}

impl<'a> SetupCommand<'a> {
    /// Create a new setup command.
    #[must_use]
    pub fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Create a named key.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the keyring cannot be saved.
    pub fn keygen<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        name: &str,
    ) -> Result<(), CliError> {
        let address = self.session.keygen(name)?;
        self.session.save()?;
        format.write(
            writer,
            &KeyInfo {
                name: name.to_string(),
                address,
            },
        )
    }

    /// Mint NOS to a key or address.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner is unknown or the balance overflows.
    pub fn airdrop<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        name: &str,
        amount: Amount,
    ) -> Result<(), CliError> {
        let owner = self.session.resolve(name)?;
        self.session.program_mut().airdrop(owner, amount)?;
        self.session.save()?;
        format.write(writer, &Message::success(format!("Airdropped {amount} to {owner}")))
    }

    /// Stake NOS for a number of days.
    ///
    /// # Errors
    ///
    /// Returns an error if the stake is rejected.
    pub fn stake<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        name: &str,
        amount: Amount,
        days: u64,
    ) -> Result<(), CliError> {
        let authority = self.session.resolve(name)?;
        let duration = days
            .checked_mul(SECONDS_PER_DAY)
            .ok_or_else(|| CliError::InvalidArgument(format!("{days} days is too long")))?;
        let stake = self.session.program_mut().stake(authority, amount, duration)?;
        self.session.save()?;
        format.write(
            writer,
            &Message::success(format!("Staked {amount} for {days} days in {stake}")),
        )
    }

    /// Start unstaking.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no active stake.
    pub fn unstake<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        name: &str,
    ) -> Result<(), CliError> {
        let authority = self.session.resolve(name)?;
        self.session.program_mut().unstake(&authority)?;
        self.session.save()?;
        format.write(writer, &Message::success(format!("Unstaked {authority}")))
    }

    /// Mint an access NFT.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner is unknown or the NFT cannot be minted.
    pub fn nft<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        name: &str,
        collection: Option<Address>,
    ) -> Result<(), CliError> {
        let owner = self.session.resolve(name)?;
        let nft = self.session.program_mut().mint_nft(owner, NFT_NAME, collection)?;
        self.session.save()?;
        format.write(
            writer,
            &NftInfo {
                owner,
                mint: nft.mint,
                account: nft.account,
                metadata: nft.metadata,
            },
        )
    }

    /// Show balance and stake.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner is unknown.
    pub fn balance<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        name: &str,
    ) -> Result<(), CliError> {
        let address = self.session.resolve(name)?;
        format.write(writer, &self.balance_info(&address))
    }

    fn balance_info(&self, address: &Address) -> BalanceInfo {
        let program = self.session.program();
        let state = program.state();
        let token_account = program.token_account(address);
        let stake = state.staking.of(address).map(|stake| StakeInfo {
            address: stake_address(address, &state.config.mint),
            amount: stake.amount,
            duration: stake.duration,
            xnos: stake.xnos,
            unstaked: stake.is_unstaked(),
        });
        BalanceInfo {
            address: *address,
            token_account,
            balance: state.ledger.balance(&token_account),
            stake,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;

    fn run<F>(f: F) -> String
    where
        F: FnOnce(&mut SetupCommand<'_>, &mut Vec<u8>) -> Result<(), CliError>,
    {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = Session::open(dir.path(), Some(0)).expect("open");
        let mut cmd = SetupCommand::new(&mut session);
        let mut out = Vec::new();
        f(&mut cmd, &mut out).expect("command");
        String::from_utf8(out).expect("utf-8")
    }

    #[test]
    fn stake_shows_in_balance() {
        let format = OutputFormat::new(Format::Json);
        let out = run(|cmd, out| {
            cmd.keygen(&mut Vec::new(), &format, "node")?;
            cmd.airdrop(&mut Vec::new(), &format, "node", Amount::from_nos(100))?;
            cmd.stake(&mut Vec::new(), &format, "node", Amount::from_nos(40), 14)?;
            cmd.balance(out, &format, "node")
        });
        let value: serde_json::Value = serde_json::from_str(&out).expect("json");
        assert_eq!(value["balance"], serde_json::json!(Amount::from_nos(60)));
        assert_eq!(value["stake"]["duration"], 14 * SECONDS_PER_DAY);
        assert_eq!(value["stake"]["unstaked"], false);
    }

    #[test]
    fn balance_without_stake() {
        let out = run(|cmd, out| {
            cmd.keygen(&mut Vec::new(), &OutputFormat::default(), "alice")?;
            cmd.balance(out, &OutputFormat::default(), "alice")
        });
        assert!(out.contains("Stake:          none"));
    }

    #[test]
    fn stake_below_minimum_duration_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = Session::open(dir.path(), Some(0)).expect("open");
        let mut cmd = SetupCommand::new(&mut session);
        let format = OutputFormat::default();
        cmd.keygen(&mut Vec::new(), &format, "node").expect("keygen");
        cmd.airdrop(&mut Vec::new(), &format, "node", Amount::from_nos(10))
            .expect("airdrop");
        let result = cmd.stake(&mut Vec::new(), &format, "node", Amount::from_nos(5), 1);
        assert!(matches!(result, Err(CliError::Program(_))));
    }
}
