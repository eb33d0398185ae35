//! Thread-safe handle to a program.
//!
//! Every call takes the lock for its full duration, so concurrent callers
//! observe one total order of commits and each instruction runs against the
//! state left by the previous one.

use std::sync::Arc;

use nos_core::Address;
use parking_lot::Mutex;

use crate::error::JobsError;
use crate::instruction::{Instruction, Outcome, SignedInstruction};
use crate::program::JobsProgram;

/// A cloneable, serializing handle to a [`JobsProgram`].
#[derive(Debug, Clone)]
pub struct SharedProgram {
    inner: Arc<Mutex<JobsProgram>>,
}

impl SharedProgram {
    /// Wraps a program.
    #[must_use]
    pub fn new(program: JobsProgram) -> Self {
        Self {
            inner: Arc::new(Mutex::new(program)),
        }
    }

    /// Verifies and runs a signed instruction.
    ///
    /// # Errors
    ///
    /// See [`JobsProgram::process_signed`].
    pub fn execute(&self, signed: SignedInstruction) -> Result<Outcome, JobsError> {
        self.inner.lock().process_signed(signed)
    }

    /// Runs an instruction for an already authenticated signer.
    ///
    /// # Errors
    ///
    /// See [`JobsProgram::process`].
    pub fn process(&self, signer: Address, instruction: Instruction) -> Result<Outcome, JobsError> {
        self.inner.lock().process(signer, instruction)
    }

    /// Runs `f` with exclusive access to the program.
    pub fn with<R>(&self, f: impl FnOnce(&mut JobsProgram) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Runs `f` against the current state.
    pub fn read<R>(&self, f: impl FnOnce(&JobsProgram) -> R) -> R {
        f(&self.inner.lock())
    }
}
