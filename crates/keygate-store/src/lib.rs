//! # Keygate Store - Persistent Documents
//!
//! **Purpose**: Durable, crash-safe representation of the three documents that
//! make up keygate state.
//!
//! - **Pool document** (`keys.json`): the FIFO key pool plus eligibility config
//! - **Claim ledger** (`claims.json`): identity → issued key and claim time
//! - **Request log** (`requests.json`): identity → last request time
//!
//! # Architecture Constraints
//!
//! - YES Document types and their on-disk shapes
//! - YES Atomic stage-then-rename writes, one document at a time
//! - YES Forward-only migration of the legacy ledger shape
//! - NO cross-document invariant enforcement (that's `keygate-ledger`)
//! - NO locking; callers serialize writes
//!
//! Writes of the three documents are individually atomic but not a
//! transaction: a crash between them can leave the documents mutually stale.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Stage-then-rename file replacement
mod atomic;

/// Document types and their serialized shapes
pub mod documents;

/// Store error types
pub mod error;

/// Legacy ledger shape detection and migration
pub mod legacy;

/// Document store: layout, load, save
pub mod store;

pub use documents::{
    ClaimLedger, ClaimRecord, Config, Documents, EligibilityMode, KeyPool, PoolDocument,
    RequestLog, RequestRecord, DEFAULT_MIN_DAYS,
};
pub use error::{StoreError, StoreResult};
pub use store::{
    DocumentStore, LoadReport, Loaded, StoreLayout, CLAIMS_FILE_NAME, KEYS_FILE_NAME,
    REQUESTS_FILE_NAME,
};
