//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use nos_core::{Address, Amount};
use nos_jobs::{Job, Market, Outcome};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for Outcome {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match self {
            Self::MarketOpened {
                market,
                vault,
                placeholder,
            } => {
                writeln!(writer, "✓ Market opened")?;
                writeln!(writer, "  Market:       {market}")?;
                writeln!(writer, "  Vault:        {vault}")?;
                writeln!(writer, "  Placeholder:  {placeholder}")?;
            }
            Self::MarketUpdated { market } => writeln!(writer, "✓ Market {market} updated")?,
            Self::MarketClosed { market } => writeln!(writer, "✓ Market {market} closed")?,
            Self::JobQueued { market, position } => {
                writeln!(writer, "✓ Job queued on {market} at position {position}")?;
            }
            Self::NodeQueued { market, position } => {
                writeln!(writer, "✓ Node queued on {market} at position {position}")?;
            }
            Self::JobMatched {
                job,
                node,
                project,
                price,
            } => {
                writeln!(writer, "✓ Job running")?;
                writeln!(writer, "  Job:      {job}")?;
                writeln!(writer, "  Node:     {node}")?;
                writeln!(writer, "  Project:  {project}")?;
                writeln!(writer, "  Price:    {price}")?;
            }
            Self::JobFinished { job, node, paid } => {
                writeln!(writer, "✓ Job {job} finished, {paid} paid to {node}")?;
            }
            Self::JobQuit { job } => writeln!(writer, "✓ Job {job} quit")?,
            Self::JobClaimed { job, node } => writeln!(writer, "✓ Job {job} claimed by {node}")?,
            Self::JobCleaned { job, .. } => writeln!(writer, "✓ Job {job} cleaned")?,
            Self::JobRecovered { job, refunded } => {
                writeln!(writer, "✓ Job {job} recovered, {refunded} refunded")?;
            }
        }
        Ok(())
    }
}

/// A simple message.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message text.
    pub message: String,
    /// Whether this is a success message.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub success: bool,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    /// Create an informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.success {
            writeln!(writer, "✓ {}", self.message)?;
        } else {
            writeln!(writer, "{}", self.message)?;
        }
        Ok(())
    }
}

/// A named key.
#[derive(Debug, Clone, Serialize)]
pub struct KeyInfo {
    /// Key name.
    pub name: String,
    /// Signer address.
    pub address: Address,
}

impl TableDisplay for KeyInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "✓ Key {} created: {}", self.name, self.address)?;
        Ok(())
    }
}

/// Token and stake holdings of an address.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceInfo {
    /// Owner address.
    pub address: Address,
    /// NOS token account.
    pub token_account: Address,
    /// NOS balance.
    pub balance: Amount,
    /// Stake, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stake: Option<StakeInfo>,
}

/// Summary of a stake account.
#[derive(Debug, Clone, Serialize)]
pub struct StakeInfo {
    /// Stake account address.
    pub address: Address,
    /// Locked amount.
    pub amount: Amount,
    /// Lock duration in seconds.
    pub duration: u64,
    /// Duration-weighted stake.
    pub xnos: u128,
    /// Whether unstaking has started.
    pub unstaked: bool,
}

impl TableDisplay for BalanceInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Address:        {}", self.address)?;
        writeln!(writer, "Token account:  {}", self.token_account)?;
        writeln!(writer, "Balance:        {}", self.balance)?;
        match &self.stake {
            Some(stake) => {
                writeln!(writer)?;
                writeln!(writer, "Stake")?;
                writeln!(writer, "  Account:      {}", stake.address)?;
                writeln!(writer, "  Amount:       {}", stake.amount)?;
                writeln!(writer, "  Duration:     {} days", stake.duration / 86_400)?;
                writeln!(writer, "  xNOS:         {}", stake.xnos)?;
                writeln!(writer, "  Unstaked:     {}", if stake.unstaked { "yes" } else { "no" })?;
            }
            None => writeln!(writer, "Stake:          none")?,
        }
        Ok(())
    }
}

/// A minted NFT.
#[derive(Debug, Clone, Serialize)]
pub struct NftInfo {
    /// Owner address.
    pub owner: Address,
    /// NFT mint.
    pub mint: Address,
    /// Token account holding the NFT; pass it as `--nft`.
    pub account: Address,
    /// Metadata account.
    pub metadata: Address,
}

impl TableDisplay for NftInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "✓ NFT minted to {}", self.owner)?;
        writeln!(writer, "  Mint:      {}", self.mint)?;
        writeln!(writer, "  Account:   {}", self.account)?;
        writeln!(writer, "  Metadata:  {}", self.metadata)?;
        Ok(())
    }
}

/// A market and its escrow balance.
#[derive(Debug, Clone, Serialize)]
pub struct MarketInfo {
    /// Market address.
    pub address: Address,
    /// The market record.
    #[serde(flatten)]
    pub market: Market,
    /// Escrow vault balance.
    pub vault_balance: Amount,
}

impl TableDisplay for MarketInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let config = &self.market.config;
        writeln!(writer, "Market {}", self.address)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Authority:       {}", self.market.authority)?;
        writeln!(writer, "Vault:           {} ({})", self.market.vault, self.vault_balance)?;
        writeln!(writer, "Placeholder:     {}", self.market.placeholder)?;
        writeln!(writer)?;
        writeln!(writer, "Price:           {}", config.job_price)?;
        writeln!(writer, "Job type:        {}", config.job_type)?;
        writeln!(writer, "Timeout:         {}s", config.job_timeout)?;
        writeln!(writer, "Expiration:      {}s", config.job_expiration)?;
        writeln!(writer, "Stake minimum:   {}", config.node_stake_minimum)?;
        if config.requires_access_key() {
            writeln!(writer, "Access key:      {}", config.node_access_key)?;
        }
        writeln!(writer)?;
        writeln!(
            writer,
            "Queue:           {} ({} waiting)",
            self.market.queue_type(),
            self.market.queue.len()
        )?;
        Ok(())
    }
}

/// A job and its address.
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    /// Job address.
    pub address: Address,
    /// The job record.
    #[serde(flatten)]
    pub job: Job,
}

impl TableDisplay for JobInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let job = &self.job;
        writeln!(writer, "Job {}", self.address)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Status:      {}", job.status)?;
        writeln!(writer, "Market:      {}", job.market)?;
        writeln!(writer, "Project:     {}", job.project)?;
        writeln!(writer, "Node:        {}", job.node)?;
        writeln!(writer, "Price:       {}", job.price)?;
        writeln!(writer, "Payload:     {}", job.payload)?;
        writeln!(writer, "Started:     {}", job.time_start)?;
        if job.time_end != 0 {
            writeln!(writer, "Ended:       {}", job.time_end)?;
        }
        Ok(())
    }
}

/// Jobs for listing.
#[derive(Debug, Clone, Serialize)]
pub struct JobList {
    /// Matching jobs.
    pub jobs: Vec<JobInfo>,
}

impl TableDisplay for JobList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.jobs.is_empty() {
            writeln!(writer, "No jobs")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<44}  {:<8}  {:<44}  {:>16}",
            "JOB", "STATUS", "NODE", "PRICE"
        )?;
        writeln!(writer, "{}", "─".repeat(118))?;
        for info in &self.jobs {
            writeln!(
                writer,
                "{:<44}  {:<8}  {:<44}  {:>16}",
                info.address.to_string(),
                info.job.status.to_string(),
                info.job.node.to_string(),
                info.job.price.to_string()
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} job(s)", self.jobs.len())?;
        Ok(())
    }
}
