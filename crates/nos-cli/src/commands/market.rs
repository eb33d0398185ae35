//! Market command implementation.
//!
//! Provides subcommands for:
//! - Opening a market
//! - Updating its settings
//! - Closing it
//! - Showing a market

use std::io::Write;

use nos_core::Address;
use nos_jobs::{Instruction, MarketConfig};

use crate::cli::MarketArgs;
use crate::error::CliError;
use crate::output::{MarketInfo, OutputFormat};
use crate::session::Session;

/// Market command executor.
pub struct MarketCommand<'a> {
    session: &'a mut Session,
}

impl<'a> MarketCommand<'a> {
    /// Create a new market command.
    #[must_use]
    pub fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Open a market under fresh market and placeholder keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the program rejects the instruction.
    pub fn open<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        signer: &str,
        args: &MarketArgs,
    ) -> Result<(), CliError> {
        let instruction = Instruction::Open {
            market: Address::unique(),
            placeholder: Address::unique(),
            config: MarketConfig::from(args),
        };
        let outcome = self.session.submit(signer, instruction)?;
        format.write(writer, &outcome)
    }

    /// Replace a market's settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the program rejects the instruction.
    pub fn update<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        signer: &str,
        market: Address,
        args: &MarketArgs,
    ) -> Result<(), CliError> {
        let instruction = Instruction::Update {
            market,
            config: MarketConfig::from(args),
        };
        let outcome = self.session.submit(signer, instruction)?;
        format.write(writer, &outcome)
    }

    /// Close a market.
    ///
    /// # Errors
    ///
    /// Returns an error if the program rejects the instruction.
    pub fn close<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        signer: &str,
        market: Address,
    ) -> Result<(), CliError> {
        let outcome = self.session.submit(signer, Instruction::Close { market })?;
        format.write(writer, &outcome)
    }

    /// Show a market.
    ///
    /// # Errors
    ///
    /// Returns an error if the market does not exist.
    pub fn show<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        market: &Address,
    ) -> Result<(), CliError> {
        let program = self.session.program();
        let info = MarketInfo {
            address: *market,
            market: program.market(market)?.clone(),
            vault_balance: program.vault_balance(market)?,
        };
        format.write(writer, &info)
    }
}
