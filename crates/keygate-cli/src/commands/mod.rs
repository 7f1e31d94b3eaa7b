//! Subcommand handlers
//!
//! Each handler calls one or two ledger operations and prints the outcome.
//! Refusals (already claimed, unknown key) are reported, not errors.

pub mod claims;
pub mod keys;
pub mod settings;
