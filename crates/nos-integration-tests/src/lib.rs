//! Integration test crate for the Nosana job market.
//!
//! This crate exists solely to run integration tests that span the core,
//! token, and jobs crates. It has no public API - all functionality is in the
//! test modules.

#![forbid(unsafe_code)]
