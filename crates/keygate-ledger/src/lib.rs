//! # Keygate Ledger - Key Ledger Service
//!
//! **Purpose**: Enforce the cross-document invariants of the key pool and claim
//! ledger, and serialize every mutation through one exclusive gate.
//!
//! Invariants held after every operation:
//! - each identity holds at most one claim
//! - each key is bound to at most one identity
//! - a key is never both pooled and claimed
//!
//! Every mutation is "validate fully, apply to a private copy, persist, then
//! publish". Queries read the last published snapshot and never wait on the
//! gate.
//!
//! ## What's NOT in this crate
//!
//! - On-disk formats and atomic writes (belong in `keygate-store`)
//! - User-facing messages, command wiring, permission checks

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Time source seam
pub mod clock;

/// Partial config updates
pub mod config;

/// Account / membership age evaluation
pub mod eligibility;

/// Ledger error types
pub mod error;

/// The service itself
pub mod ledger;

/// Published, immutable state versions
pub mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigUpdate, MAX_MIN_DAYS};
pub use eligibility::{evaluate_eligibility, Eligibility};
pub use error::{LedgerError, LedgerResult};
pub use ledger::KeyLedger;
pub use snapshot::Snapshot;

pub use keygate_store::{
    ClaimLedger, ClaimRecord, Config, EligibilityMode, KeyPool, RequestLog, StoreError,
    StoreLayout,
};
