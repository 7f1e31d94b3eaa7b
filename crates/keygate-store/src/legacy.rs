//! Legacy and damaged claim ledger shapes
//!
//! Early ledgers stored `"<identity>": "<key>"` with no claim time, and some
//! records were written without a usable `claimed_at`. Entries are decoded one
//! by one so a single bad entry never costs the rest of the ledger. The
//! upgrade is forward-only.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

use crate::documents::{ClaimLedger, ClaimRecord};

/// Raw on-disk ledger before migration
pub type StoredLedger = IndexMap<String, Value>;

/// What migrating a stored ledger had to change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerRepairs {
    /// Bare-string entries upgraded to records
    pub legacy_migrated: usize,
    /// Records whose claim time was missing or unparseable
    pub claim_times_restamped: usize,
    /// Entries with no usable key
    pub malformed_dropped: usize,
    /// Entries naming a key an earlier entry already holds
    pub duplicates_dropped: usize,
}

impl LedgerRepairs {
    /// Whether the migrated ledger differs from the stored one
    pub fn any(&self) -> bool {
        self.legacy_migrated > 0
            || self.claim_times_restamped > 0
            || self.malformed_dropped > 0
            || self.duplicates_dropped > 0
    }
}

enum Entry {
    Current(ClaimRecord),
    Restamped(ClaimRecord),
    Legacy(ClaimRecord),
    Malformed,
}

fn classify(entry: Value, migrated_at: DateTime<Utc>) -> Entry {
    match entry {
        Value::String(key) if !key.trim().is_empty() => {
            Entry::Legacy(ClaimRecord::new(key, migrated_at))
        }
        Value::Object(fields) => classify_record(&fields, migrated_at),
        _ => Entry::Malformed,
    }
}

fn classify_record(fields: &Map<String, Value>, migrated_at: DateTime<Utc>) -> Entry {
    let Some(key) = fields
        .get("key")
        .and_then(Value::as_str)
        .filter(|key| !key.trim().is_empty())
    else {
        return Entry::Malformed;
    };

    let claimed_at = fields
        .get("claimed_at")
        .or_else(|| fields.get("claimedAt"))
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<DateTime<Utc>>().ok());
    match claimed_at {
        Some(at) => Entry::Current(ClaimRecord::new(key, at)),
        None => Entry::Restamped(ClaimRecord::new(key, migrated_at)),
    }
}

/// Upgrade every entry, preserving entry order
///
/// Unusable entries are dropped, and a key held by more than one identity
/// stays with its first holder.
pub fn migrate_ledger(
    stored: StoredLedger,
    migrated_at: DateTime<Utc>,
) -> (ClaimLedger, LedgerRepairs) {
    let mut repairs = LedgerRepairs::default();
    let mut ledger = ClaimLedger::new();
    let mut held = HashSet::new();

    for (identity, entry) in stored {
        let record = match classify(entry, migrated_at) {
            Entry::Current(record) => record,
            Entry::Restamped(record) => {
                repairs.claim_times_restamped += 1;
                record
            }
            Entry::Legacy(record) => {
                repairs.legacy_migrated += 1;
                record
            }
            Entry::Malformed => {
                warn!(identity = %identity, "ledger entry has no usable key; dropped");
                repairs.malformed_dropped += 1;
                continue;
            }
        };

        if !held.insert(record.key.clone()) {
            warn!(
                identity = %identity,
                holder = ledger.holder_of(&record.key).unwrap_or_default(),
                "ledger entry repeats a key held by an earlier entry; dropped"
            );
            repairs.duplicates_dropped += 1;
            continue;
        }
        ledger.insert(identity, record);
    }

    (ledger, repairs)
}
