//! Document store
//!
//! [`DocumentStore`] owns the on-disk representation. It never fails a load:
//! a missing document is a first run, an unreadable one is logged and replaced
//! by its typed default.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::atomic::write_atomic;
use crate::documents::{ClaimLedger, Documents, PoolDocument, RequestLog};
use crate::error::{StoreError, StoreResult};
use crate::legacy::{migrate_ledger, LedgerRepairs, StoredLedger};

/// File holding the pool and config
pub const KEYS_FILE_NAME: &str = "keys.json";
/// File holding the claim ledger
pub const CLAIMS_FILE_NAME: &str = "claims.json";
/// File holding the request log
pub const REQUESTS_FILE_NAME: &str = "requests.json";

/// Where each document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    /// Pool and config document
    pub keys_path: PathBuf,
    /// Claim ledger document
    pub claims_path: PathBuf,
    /// Request log document
    pub requests_path: PathBuf,
}

impl StoreLayout {
    /// Standard file names inside `data_dir`
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            keys_path: dir.join(KEYS_FILE_NAME),
            claims_path: dir.join(CLAIMS_FILE_NAME),
            requests_path: dir.join(REQUESTS_FILE_NAME),
        }
    }
}

/// What a load had to repair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Ledger entries upgraded from the bare-string shape
    pub legacy_claims_migrated: usize,
    /// Ledger records stamped with the open time for lack of a claim time
    pub claim_times_restamped: usize,
    /// Ledger entries dropped for lack of a usable key
    pub malformed_claims_dropped: usize,
    /// Ledger entries dropped because an earlier entry holds the same key
    pub duplicate_claims_dropped: usize,
    /// Pool entries trimmed, or dropped as empty or repeated
    pub pool_entries_repaired: usize,
    /// Pool entries dropped because the ledger already holds them
    pub claimed_keys_dropped: usize,
}

impl LoadReport {
    /// Whether the loaded state differs from what is on disk
    pub fn needs_rewrite(&self) -> bool {
        self.legacy_claims_migrated > 0
            || self.claim_times_restamped > 0
            || self.malformed_claims_dropped > 0
            || self.duplicate_claims_dropped > 0
            || self.pool_entries_repaired > 0
            || self.claimed_keys_dropped > 0
    }
}

/// Result of reading all three documents
#[derive(Debug, Clone)]
pub struct Loaded {
    /// Normalized documents
    pub documents: Documents,
    /// Repairs applied while loading
    pub report: LoadReport,
}

/// Sole reader and writer of the persisted documents
#[derive(Debug, Clone)]
pub struct DocumentStore {
    layout: StoreLayout,
}

impl DocumentStore {
    /// Store over `layout`; touches nothing on disk
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Document locations
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Read and normalize all three documents without writing anything
    ///
    /// `now` stamps any legacy ledger entries.
    pub async fn load(&self, now: DateTime<Utc>) -> Loaded {
        let mut pool: PoolDocument = read_document(&self.layout.keys_path)
            .await
            .unwrap_or_default();
        let stored: StoredLedger = read_document(&self.layout.claims_path)
            .await
            .unwrap_or_default();
        let requests: RequestLog = read_document(&self.layout.requests_path)
            .await
            .unwrap_or_default();

        let (claims, repairs) = migrate_ledger(stored, now);
        let pool_entries_repaired = pool.pool.normalize();
        let claimed_keys_dropped = pool.pool.retain_unclaimed(&claims);

        let LedgerRepairs {
            legacy_migrated,
            claim_times_restamped,
            malformed_dropped,
            duplicates_dropped,
        } = repairs;
        let report = LoadReport {
            legacy_claims_migrated: legacy_migrated,
            claim_times_restamped,
            malformed_claims_dropped: malformed_dropped,
            duplicate_claims_dropped: duplicates_dropped,
            pool_entries_repaired,
            claimed_keys_dropped,
        };
        if claimed_keys_dropped > 0 {
            warn!(
                dropped = claimed_keys_dropped,
                "pool listed keys that are already claimed; dropped them from the pool"
            );
        }

        Loaded {
            documents: Documents {
                pool,
                claims,
                requests,
            },
            report,
        }
    }

    /// Load, and persist the normalized form before returning if anything
    /// had to be migrated or repaired
    pub async fn open(&self, now: DateTime<Utc>) -> StoreResult<Documents> {
        let Loaded { documents, report } = self.load(now).await;
        if report.needs_rewrite() {
            self.save_all(&documents.pool, &documents.claims, &documents.requests)
                .await?;
            info!(
                legacy_claims = report.legacy_claims_migrated,
                claims_restamped = report.claim_times_restamped,
                claims_dropped = report.malformed_claims_dropped + report.duplicate_claims_dropped,
                pool_repairs = report.pool_entries_repaired,
                claimed_keys_dropped = report.claimed_keys_dropped,
                "rewrote documents in normalized form"
            );
        }
        Ok(documents)
    }

    /// Write all three documents, each atomically, in a fixed order
    ///
    /// The writes are not atomic relative to one another.
    pub async fn save_all(
        &self,
        pool: &PoolDocument,
        claims: &ClaimLedger,
        requests: &RequestLog,
    ) -> StoreResult<()> {
        write_document(&self.layout.keys_path, pool).await?;
        write_document(&self.layout.claims_path, claims).await?;
        write_document(&self.layout.requests_path, requests).await?;
        Ok(())
    }
}

async fn read_document<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "document absent; using default");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read document; using default");
            return None;
        }
    };

    match serde_json::from_slice(&raw) {
        Ok(document) => Some(document),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse document; using default");
            None
        }
    }
}

async fn write_document<T: Serialize>(path: &Path, document: &T) -> StoreResult<()> {
    let payload = serde_json::to_vec_pretty(document).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &payload).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_uses_standard_names() {
        let layout = StoreLayout::in_dir("/data");
        assert_eq!(layout.keys_path, PathBuf::from("/data/keys.json"));
        assert_eq!(layout.claims_path, PathBuf::from("/data/claims.json"));
        assert_eq!(layout.requests_path, PathBuf::from("/data/requests.json"));
    }

    #[test]
    fn clean_report_needs_no_rewrite() {
        assert!(!LoadReport::default().needs_rewrite());
        let report = LoadReport {
            legacy_claims_migrated: 1,
            ..LoadReport::default()
        };
        assert!(report.needs_rewrite());
    }
}
