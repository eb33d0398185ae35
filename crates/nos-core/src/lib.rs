//! # nos-core
//!
//! Primitives shared by the Nosana job market crates.
//!
//! This crate provides:
//!
//! - [`Address`] - 32-byte account key / signer identity, base58 encoded
//! - [`Keypair`] - Ed25519 signing identity
//! - [`Amount`] - NOS token amount with fixed-point precision
//! - [`ContentRef`] - opaque content reference for job payloads and results
//! - [`Clock`] - injectable wall clock ([`SystemClock`], [`ManualClock`])

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod amount;
pub mod clock;
pub mod content;
pub mod error;

pub use address::{find_program_address, Address, Keypair, Signature};
pub use amount::Amount;
pub use clock::{Clock, ManualClock, SystemClock};
pub use content::ContentRef;
pub use error::CoreError;
