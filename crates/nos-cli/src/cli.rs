//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use nos_core::{Address, Amount};
use nos_jobs::{JobStatus, JobType, MarketConfig};

/// Nosana jobs CLI - run the job market against a local snapshot.
#[derive(Parser, Debug, Clone)]
#[command(name = "nosana-jobs")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the state snapshot, keyring and config.
    #[arg(short, long, env = "NOSANA_STATE_DIR", default_value = ".nosana")]
    pub state_dir: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Pin the clock to this unix time instead of reading the system clock.
    #[arg(long, env = "NOSANA_NOW")]
    pub now: Option<i64>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a named signing key.
    Keygen {
        /// Key name.
        name: String,
    },

    /// Mint NOS to a key.
    Airdrop {
        /// Key name or address.
        name: String,
        /// Amount of NOS, e.g. `10` or `2.5`.
        amount: Amount,
    },

    /// Stake NOS for a key.
    Stake {
        /// Key name.
        name: String,
        /// Amount of NOS.
        amount: Amount,
        /// Lock duration in days.
        #[arg(default_value_t = 14)]
        days: u64,
    },

    /// Start unstaking a key's stake.
    Unstake {
        /// Key name.
        name: String,
    },

    /// Mint an access NFT to a key.
    Nft {
        /// Key name or address.
        name: String,
        /// Verified collection the NFT belongs to.
        #[arg(long)]
        collection: Option<Address>,
    },

    /// Show a key's address, balance and stake.
    Balance {
        /// Key name or address.
        name: String,
    },

    /// Open a market.
    Open {
        /// Signing key.
        #[arg(long = "as", value_name = "NAME")]
        signer: String,
        /// Market settings.
        #[command(flatten)]
        config: MarketArgs,
    },

    /// Replace a market's settings.
    Update {
        /// Signing key.
        #[arg(long = "as", value_name = "NAME")]
        signer: String,
        /// Market address.
        #[arg(long)]
        market: Address,
        /// Market settings.
        #[command(flatten)]
        config: MarketArgs,
    },

    /// Close an empty market.
    Close {
        /// Signing key.
        #[arg(long = "as", value_name = "NAME")]
        signer: String,
        /// Market address.
        #[arg(long)]
        market: Address,
    },

    /// List a job on a market.
    List {
        /// Signing key.
        #[arg(long = "as", value_name = "NAME")]
        signer: String,
        /// Market address.
        #[arg(long)]
        market: Address,
        /// Job account used if a node is waiting.
        #[command(flatten)]
        slot: SlotArgs,
        /// Job specification: a file path or a 64-character hex reference.
        #[arg(long)]
        payload: String,
    },

    /// Offer a node to a market.
    Work {
        /// Signing key.
        #[arg(long = "as", value_name = "NAME")]
        signer: String,
        /// Market address.
        #[arg(long)]
        market: Address,
        /// Job account used if a job is waiting.
        #[command(flatten)]
        slot: SlotArgs,
        /// Access NFT token account.
        #[arg(long)]
        nft: Option<Address>,
    },

    /// Finish a running job.
    Finish {
        /// Signing key.
        #[arg(long = "as", value_name = "NAME")]
        signer: String,
        /// Job address.
        #[arg(long)]
        job: Address,
        /// Result: a file path or a 64-character hex reference.
        #[arg(long)]
        result: String,
    },

    /// Abandon a running job.
    Quit(JobArgs),

    /// Take over an abandoned job.
    Claim {
        /// Signer and job.
        #[command(flatten)]
        job: JobArgs,
        /// Access NFT token account.
        #[arg(long)]
        nft: Option<Address>,
    },

    /// Remove an expired finished job.
    Clean(JobArgs),

    /// Refund an abandoned job to its project.
    Recover(JobArgs),

    /// Show a market.
    Market {
        /// Market address.
        market: Address,
    },

    /// Show a job.
    Job {
        /// Job address.
        job: Address,
    },

    /// List jobs.
    Jobs {
        /// Only jobs of this market.
        #[arg(long)]
        market: Option<Address>,
        /// Only jobs in this status.
        #[arg(long)]
        status: Option<JobStatus>,
        /// Only jobs past their timeout.
        #[arg(long)]
        timed_out: bool,
    },
}

/// Signer and job of a job-level operation.
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Signing key.
    #[arg(long = "as", value_name = "NAME")]
    pub signer: String,
    /// Job address.
    #[arg(long)]
    pub job: Address,
}

/// Where a matched job is written.
#[derive(Args, Debug, Clone, Default)]
pub struct SlotArgs {
    /// Use this job address.
    #[arg(long, conflicts_with = "new_job")]
    pub job: Option<Address>,
    /// Generate a fresh job address.
    #[arg(long)]
    pub new_job: bool,
}

/// Market settings.
#[derive(Args, Debug, Clone)]
pub struct MarketArgs {
    /// Price per job in NOS.
    #[arg(long, default_value = "1")]
    pub price: Amount,
    /// Seconds a finished job is kept before it may be cleaned.
    #[arg(long, default_value_t = 24 * 60 * 60)]
    pub expiration: i64,
    /// Seconds a job may run.
    #[arg(long, default_value_t = 60 * 60)]
    pub timeout: i64,
    /// Hardware class.
    #[arg(long, value_enum, default_value_t = JobTypeArg::Default)]
    pub job_type: JobTypeArg,
    /// Minimum node stake in NOS.
    #[arg(long, default_value = "0")]
    pub stake_minimum: Amount,
    /// Required NFT collection.
    #[arg(long)]
    pub access_key: Option<Address>,
}

impl From<&MarketArgs> for MarketConfig {
    fn from(args: &MarketArgs) -> Self {
        Self {
            job_expiration: args.expiration,
            job_price: args.price,
            job_timeout: args.timeout,
            job_type: args.job_type.into(),
            node_stake_minimum: args.stake_minimum,
            node_access_key: args.access_key.unwrap_or(Address::SYSTEM),
        }
    }
}

/// Hardware class argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobTypeArg {
    /// No particular class.
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

impl From<JobTypeArg> for JobType {
    fn from(arg: JobTypeArg) -> Self {
        match arg {
            JobTypeArg::Default => Self::Default,
            JobTypeArg::Small => Self::Small,
            JobTypeArg::Medium => Self::Medium,
            JobTypeArg::Large => Self::Large,
            JobTypeArg::Gpu => Self::Gpu,
            JobTypeArg::Unknown => Self::Unknown,
        }
    }
}
