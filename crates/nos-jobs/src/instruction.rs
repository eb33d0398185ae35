//! Instructions: the wire form of every operation.
//!
//! Callers submit a [`SignedInstruction`]; the signature covers the JSON
//! encoding of the [`Instruction`] and the signer becomes the caller identity
//! every authorization check compares against.

use nos_core::{Address, Amount, ContentRef, Keypair, Signature};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::access::NodeCredentials;
use crate::config::MarketConfig;
use crate::error::JobsError;
use crate::job::{Job, JobSlot};
use crate::program::JobsProgram;

/// One operation and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    /// Open a market.
    Open {
        /// New market key.
        market: Address,
        /// Placeholder job key reserved for the market.
        placeholder: Address,
        /// Initial configuration.
        config: MarketConfig,
    },
    /// Replace a market's configuration.
    Update {
        /// Market key.
        market: Address,
        /// New configuration.
        config: MarketConfig,
    },
    /// Close an empty market.
    Close {
        /// Market key.
        market: Address,
    },
    /// List a job.
    List {
        /// Market key.
        market: Address,
        /// Where a matched job is written.
        job: JobSlot,
        /// Job specification.
        payload: ContentRef,
    },
    /// Offer node capacity.
    Work {
        /// Market key.
        market: Address,
        /// Where a matched job is written.
        job: JobSlot,
        /// Admission accounts.
        credentials: NodeCredentials,
    },
    /// Finish a running job.
    Finish {
        /// Job key.
        job: Address,
        /// Result reference.
        result: ContentRef,
    },
    /// Abandon a running job.
    Quit {
        /// Job key.
        job: Address,
    },
    /// Take over an abandoned job.
    Claim {
        /// Job key.
        job: Address,
        /// Admission accounts.
        credentials: NodeCredentials,
    },
    /// Remove an expired finished job.
    Clean {
        /// Job key.
        job: Address,
    },
    /// Refund an abandoned job to its project.
    Recover {
        /// Job key.
        job: Address,
    },
}

impl Instruction {
    /// Operation name, as used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Update { .. } => "update",
            Self::Close { .. } => "close",
            Self::List { .. } => "list",
            Self::Work { .. } => "work",
            Self::Finish { .. } => "finish",
            Self::Quit { .. } => "quit",
            Self::Claim { .. } => "claim",
            Self::Clean { .. } => "clean",
            Self::Recover { .. } => "recover",
        }
    }

    /// Bytes covered by the signature.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::Serialization` if encoding fails.
    pub fn message(&self) -> Result<Vec<u8>, JobsError> {
        serde_json::to_vec(self).map_err(|e| JobsError::Serialization(e.to_string()))
    }

    /// Signs the instruction with `keypair`.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::Serialization` if encoding fails.
    pub fn sign(self, keypair: &Keypair) -> Result<SignedInstruction, JobsError> {
        let signature = keypair.sign(&self.message()?);
        Ok(SignedInstruction {
            signer: keypair.address(),
            instruction: self,
            signature,
        })
    }
}

/// An instruction with its signer and signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInstruction {
    /// Caller identity.
    pub signer: Address,
    /// The operation.
    pub instruction: Instruction,
    /// Signature by `signer` over the instruction message.
    pub signature: Signature,
}

impl SignedInstruction {
    /// Verifies the signature.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::InvalidSignature` if it does not verify.
    pub fn verify(&self) -> Result<(), JobsError> {
        self.signature
            .verify(&self.signer, &self.instruction.message()?)
            .map_err(|_| JobsError::InvalidSignature)
    }
}

/// What a committed instruction produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// A market was opened.
    MarketOpened {
        /// Market key.
        market: Address,
        /// Escrow vault.
        vault: Address,
        /// Reserved placeholder job key.
        placeholder: Address,
    },
    /// A market's configuration was replaced.
    MarketUpdated {
        /// Market key.
        market: Address,
    },
    /// A market was closed.
    MarketClosed {
        /// Market key.
        market: Address,
    },
    /// A job joined the job queue.
    JobQueued {
        /// Market key.
        market: Address,
        /// 1-based queue position.
        position: usize,
    },
    /// A node joined the node queue.
    NodeQueued {
        /// Market key.
        market: Address,
        /// 1-based queue position.
        position: usize,
    },
    /// A job and a node were paired; the job is running.
    JobMatched {
        /// Job key.
        job: Address,
        /// Assigned node.
        node: Address,
        /// Paying project.
        project: Address,
        /// Escrowed price.
        price: Amount,
    },
    /// A job finished and its node was paid.
    JobFinished {
        /// Job key.
        job: Address,
        /// Paid node.
        node: Address,
        /// Amount released.
        paid: Amount,
    },
    /// A node abandoned a job.
    JobQuit {
        /// Job key.
        job: Address,
    },
    /// A node took over an abandoned job.
    JobClaimed {
        /// Job key.
        job: Address,
        /// New node.
        node: Address,
    },
    /// An expired job was removed.
    JobCleaned {
        /// Job key.
        job: Address,
        /// The removed record.
        record: Job,
    },
    /// An abandoned job was refunded and removed.
    JobRecovered {
        /// Job key.
        job: Address,
        /// Amount returned to the project.
        refunded: Amount,
    },
}

impl JobsProgram {
    /// Runs an instruction on behalf of an already authenticated `signer`.
    ///
    /// # Errors
    ///
    /// Returns whatever the operation rejects with; state is unchanged.
    pub fn process(&mut self, signer: Address, instruction: Instruction) -> Result<Outcome, JobsError> {
        let name = instruction.name();
        let result = match instruction {
            Instruction::Open {
                market,
                placeholder,
                config,
            } => self.open(signer, market, placeholder, config),
            Instruction::Update { market, config } => self.update(signer, market, config),
            Instruction::Close { market } => self.close(signer, market),
            Instruction::List {
                market,
                job,
                payload,
            } => self.list(signer, market, job, payload),
            Instruction::Work {
                market,
                job,
                credentials,
            } => self.work(signer, market, job, &credentials),
            Instruction::Finish { job, result } => self.finish(signer, job, result),
            Instruction::Quit { job } => self.quit(signer, job),
            Instruction::Claim { job, credentials } => self.claim(signer, job, &credentials),
            Instruction::Clean { job } => self.clean(signer, job),
            Instruction::Recover { job } => self.recover(signer, job),
        };

        match &result {
            Ok(_) => debug!(op = name, signer = %signer, "instruction committed"),
            Err(e) => warn!(op = name, signer = %signer, error = %e, "instruction rejected"),
        }
        result
    }

    /// Verifies and runs a signed instruction.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::InvalidSignature` for a bad signature, otherwise
    /// whatever the operation rejects with.
    pub fn process_signed(&mut self, signed: SignedInstruction) -> Result<Outcome, JobsError> {
        signed.verify()?;
        self.process(signed.signer, signed.instruction)
    }
}
