//! Nosana jobs CLI binary entrypoint.
//!
//! This is the main entry point for the `nosana-jobs` command-line tool.

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use nos_cli::cli::{Cli, Commands, JobArgs};
use nos_cli::commands::{JobCommand, MarketCommand, SetupCommand};
use nos_cli::output::OutputFormat;
use nos_cli::Session;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();
    let mut session = Session::open(&cli.state_dir, cli.now)
        .with_context(|| format!("loading state from {}", cli.state_dir.display()))?;

    match &cli.command {
        Commands::Keygen { name } => {
            SetupCommand::new(&mut session).keygen(&mut stdout, &format, name)?;
        }
        Commands::Airdrop { name, amount } => {
            SetupCommand::new(&mut session).airdrop(&mut stdout, &format, name, *amount)?;
        }
        Commands::Stake { name, amount, days } => {
            SetupCommand::new(&mut session).stake(&mut stdout, &format, name, *amount, *days)?;
        }
        Commands::Unstake { name } => {
            SetupCommand::new(&mut session).unstake(&mut stdout, &format, name)?;
        }
        Commands::Nft { name, collection } => {
            SetupCommand::new(&mut session).nft(&mut stdout, &format, name, *collection)?;
        }
        Commands::Balance { name } => {
            SetupCommand::new(&mut session).balance(&mut stdout, &format, name)?;
        }
        Commands::Open { signer, config } => {
            MarketCommand::new(&mut session).open(&mut stdout, &format, signer, config)?;
        }
        Commands::Update {
            signer,
            market,
            config,
        } => {
            MarketCommand::new(&mut session).update(&mut stdout, &format, signer, *market, config)?;
        }
        Commands::Close { signer, market } => {
            MarketCommand::new(&mut session).close(&mut stdout, &format, signer, *market)?;
        }
        Commands::Market { market } => {
            MarketCommand::new(&mut session).show(&mut stdout, &format, market)?;
        }
        Commands::List {
            signer,
            market,
            slot,
            payload,
        } => {
            JobCommand::new(&mut session).list(&mut stdout, &format, signer, *market, slot, payload)?;
        }
        Commands::Work {
            signer,
            market,
            slot,
            nft,
        } => {
            JobCommand::new(&mut session).work(&mut stdout, &format, signer, *market, slot, *nft)?;
        }
        Commands::Finish {
            signer,
            job,
            result,
        } => {
            JobCommand::new(&mut session).finish(&mut stdout, &format, signer, *job, result)?;
        }
        Commands::Quit(JobArgs { signer, job }) => {
            JobCommand::new(&mut session).quit(&mut stdout, &format, signer, *job)?;
        }
        Commands::Claim {
            job: JobArgs { signer, job },
            nft,
        } => {
            JobCommand::new(&mut session).claim(&mut stdout, &format, signer, *job, *nft)?;
        }
        Commands::Clean(JobArgs { signer, job }) => {
            JobCommand::new(&mut session).clean(&mut stdout, &format, signer, *job)?;
        }
        Commands::Recover(JobArgs { signer, job }) => {
            JobCommand::new(&mut session).recover(&mut stdout, &format, signer, *job)?;
        }
        Commands::Job { job } => {
            JobCommand::new(&mut session).show(&mut stdout, &format, job)?;
        }
        Commands::Jobs {
            market,
            status,
            timed_out,
        } => {
            JobCommand::new(&mut session).jobs(&mut stdout, &format, *market, *status, *timed_out)?;
        }
    }

    Ok(())
}
