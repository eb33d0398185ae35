//! Job command implementation.
//!
//! Provides subcommands for:
//! - Listing jobs and offering nodes
//! - Finishing, quitting, claiming, cleaning, and recovering jobs
//! - Showing one job or a filtered list

use std::io::Write;

use nos_core::Address;
use nos_jobs::{Instruction, JobFilter, JobSlot, JobStatus};

use crate::cli::SlotArgs;
use crate::error::CliError;
use crate::output::{JobInfo, JobList, OutputFormat};
use crate::session::{parse_content, Session};

/// Job command executor.
pub struct JobCommand<'a> {
    session: &'a mut Session,
}

impl<'a> JobCommand<'a> {
    /// Create a new job command.
    #[must_use]
    pub fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// List a job, paying its price into escrow.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be read or the program rejects
    /// the instruction.
    pub fn list<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        signer: &str,
        market: Address,
        slot: &SlotArgs,
        payload: &str,
    ) -> Result<(), CliError> {
        let instruction = Instruction::List {
            market,
            job: JobSlot::from(slot),
            payload: parse_content(payload)?,
        };
        self.submit(writer, format, signer, instruction)
    }

    /// Offer the signer's node to a market.
    ///
    /// # Errors
    ///
    /// Returns an error if the program rejects the instruction.
    pub fn work<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        signer: &str,
        market: Address,
        slot: &SlotArgs,
        nft: Option<Address>,
    ) -> Result<(), CliError> {
        let node = self.session.resolve(signer)?;
        let instruction = Instruction::Work {
            market,
            job: JobSlot::from(slot),
            credentials: self.session.credentials(&node, nft),
        };
        self.submit(writer, format, signer, instruction)
    }

    /// Post a result for a running job.
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be read or the program rejects
    /// the instruction.
    pub fn finish<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        signer: &str,
        job: Address,
        result: &str,
    ) -> Result<(), CliError> {
        let instruction = Instruction::Finish {
            job,
            result: parse_content(result)?,
        };
        self.submit(writer, format, signer, instruction)
    }

    /// Abandon a running job.
    ///
    /// # Errors
    ///
    /// Returns an error if the program rejects the instruction.
    pub fn quit<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        signer: &str,
        job: Address,
    ) -> Result<(), CliError> {
        self.submit(writer, format, signer, Instruction::Quit { job })
    }

    /// Take over an abandoned job.
    ///
    /// # Errors
    ///
    /// Returns an error if the program rejects the instruction.
    pub fn claim<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        signer: &str,
        job: Address,
        nft: Option<Address>,
    ) -> Result<(), CliError> {
        let node = self.session.resolve(signer)?;
        let instruction = Instruction::Claim {
            job,
            credentials: self.session.credentials(&node, nft),
        };
        self.submit(writer, format, signer, instruction)
    }

    /// Remove an expired finished job.
    ///
    /// # Errors
    ///
    /// Returns an error if the program rejects the instruction.
    pub fn clean<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        signer: &str,
        job: Address,
    ) -> Result<(), CliError> {
        self.submit(writer, format, signer, Instruction::Clean { job })
    }

    /// Refund an abandoned job to its project.
    ///
    /// # Errors
    ///
    /// Returns an error if the program rejects the instruction.
    pub fn recover<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        signer: &str,
        job: Address,
    ) -> Result<(), CliError> {
        self.submit(writer, format, signer, Instruction::Recover { job })
    }

    /// Show one job.
    ///
    /// # Errors
    ///
    /// Returns an error if the job does not exist.
    pub fn show<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        job: &Address,
    ) -> Result<(), CliError> {
        let info = JobInfo {
            address: *job,
            job: self.session.program().job(job)?.clone(),
        };
        format.write(writer, &info)
    }

    /// List jobs matching the given filters.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn jobs<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        market: Option<Address>,
        status: Option<JobStatus>,
        timed_out: bool,
    ) -> Result<(), CliError> {
        let program = self.session.program();
        let mut filter = JobFilter::all();
        if let Some(market) = market {
            filter = filter.market(market);
        }
        if let Some(status) = status {
            filter = filter.status(status);
        }
        if timed_out {
            filter = filter.timed_out_at(program.now());
        }

        let jobs = program
            .jobs(&filter)
            .into_iter()
            .map(|(address, job)| JobInfo {
                address,
                job: job.clone(),
            })
            .collect();
        format.write(writer, &JobList { jobs })
    }

    fn submit<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        signer: &str,
        instruction: Instruction,
    ) -> Result<(), CliError> {
        let outcome = self.session.submit(signer, instruction)?;
        format.write(writer, &outcome)
    }
}
