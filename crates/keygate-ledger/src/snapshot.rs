//! Published state versions
//!
//! A [`Snapshot`] is immutable once published. Mutations clone it (cheap: three
//! `Arc`s), copy-on-write only the documents they change, and publish the
//! new version after it is on disk.

use keygate_store::{ClaimLedger, Config, Documents, KeyPool, PoolDocument, RequestLog};
use std::sync::Arc;

/// One consistent version of all three documents
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub(crate) pool: Arc<PoolDocument>,
    pub(crate) claims: Arc<ClaimLedger>,
    pub(crate) requests: Arc<RequestLog>,
}

impl Snapshot {
    /// Available keys, head first
    pub fn pool(&self) -> &KeyPool {
        &self.pool.pool
    }

    /// Eligibility configuration
    pub fn config(&self) -> Config {
        self.pool.config
    }

    /// Claim ledger
    pub fn claims(&self) -> &ClaimLedger {
        &self.claims
    }

    /// Request log
    pub fn requests(&self) -> &RequestLog {
        &self.requests
    }

    pub(crate) fn pool_mut(&mut self) -> &mut PoolDocument {
        Arc::make_mut(&mut self.pool)
    }

    pub(crate) fn claims_mut(&mut self) -> &mut ClaimLedger {
        Arc::make_mut(&mut self.claims)
    }

    pub(crate) fn requests_mut(&mut self) -> &mut RequestLog {
        Arc::make_mut(&mut self.requests)
    }
}

impl From<Documents> for Snapshot {
    fn from(documents: Documents) -> Self {
        Self {
            pool: Arc::new(documents.pool),
            claims: Arc::new(documents.claims),
            requests: Arc::new(documents.requests),
        }
    }
}
