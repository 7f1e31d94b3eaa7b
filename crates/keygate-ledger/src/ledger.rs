//! Key ledger service
//!
//! [`KeyLedger`] is constructed once per process and shared by reference
//! (typically `Arc<KeyLedger>`). It is the only component that mutates the
//! documents.
//!
//! Concurrency: a `tokio` mutex gates every mutation, so two racing claims
//! can never pop the same key. The published [`Snapshot`] sits behind a
//! `parking_lot` lock held only long enough to clone or replace an `Arc`, so
//! queries never wait for a mutation in flight.

use chrono::{DateTime, Utc};
use keygate_store::{ClaimLedger, ClaimRecord, Config, DocumentStore, StoreLayout};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::ConfigUpdate;
use crate::error::{LedgerError, LedgerResult};
use crate::snapshot::Snapshot;

/// Serialized, invariant-enforcing access to the key pool and claim ledger
pub struct KeyLedger {
    store: DocumentStore,
    clock: Arc<dyn Clock>,
    gate: Mutex<()>,
    published: RwLock<Arc<Snapshot>>,
}

impl fmt::Debug for KeyLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("KeyLedger")
            .field("layout", self.store.layout())
            .field("available", &snapshot.pool().len())
            .field("claims", &snapshot.claims().len())
            .finish_non_exhaustive()
    }
}

impl KeyLedger {
    /// Load state from `layout`, migrating legacy data before returning
    pub async fn open(layout: StoreLayout, clock: Arc<dyn Clock>) -> LedgerResult<Self> {
        let store = DocumentStore::new(layout);
        let documents = store.open(clock.now()).await?;

        info!(
            available = documents.pool.pool.len(),
            claims = documents.claims.len(),
            requests = documents.requests.len(),
            "opened key ledger"
        );

        Ok(Self {
            store,
            clock,
            gate: Mutex::new(()),
            published: RwLock::new(Arc::new(Snapshot::from(documents))),
        })
    }

    /// [`KeyLedger::open`] on the standard file names in `data_dir`, wall clock
    pub async fn open_in_dir(data_dir: impl AsRef<Path>) -> LedgerResult<Self> {
        Self::open(StoreLayout::in_dir(data_dir), Arc::new(SystemClock)).await
    }

    /// Document locations
    pub fn layout(&self) -> &StoreLayout {
        self.store.layout()
    }

    /// Current published version of all documents
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.published.read())
    }

    /// Persist `next`, then publish it. On failure nothing is published.
    async fn commit(&self, next: Snapshot) -> LedgerResult<()> {
        self.store
            .save_all(&next.pool, &next.claims, &next.requests)
            .await?;
        *self.published.write() = Arc::new(next);
        Ok(())
    }

    // ─── Mutations ───────────────────────────────────────────────────────────

    /// Append new keys to the pool tail, in input order
    ///
    /// Candidates are trimmed and empties dropped. A candidate already pooled,
    /// already claimed, or repeated earlier in the same call is skipped.
    /// Returns how many keys were added; nothing is persisted when that is 0.
    pub async fn add_keys<I, S>(&self, candidates: I) -> LedgerResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let candidates: Vec<String> = candidates
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        let _gate = self.gate.lock().await;
        let current = self.snapshot();

        let mut known: HashSet<&str> = current.claims().held_keys();
        known.extend(current.pool().iter());
        let fresh: Vec<String> = candidates
            .iter()
            .filter(|k| known.insert(k.as_str()))
            .cloned()
            .collect();

        if fresh.is_empty() {
            debug!(candidates = candidates.len(), "no new keys to add");
            return Ok(0);
        }

        let added = fresh.len();
        let mut next = Snapshot::clone(&current);
        let pool = &mut next.pool_mut().pool;
        for key in fresh {
            pool.push_back(key);
        }
        let available = next.pool().len();
        self.commit(next).await?;

        info!(added, available, "added keys to pool");
        Ok(added)
    }

    /// Issue the pool head to `identity`
    ///
    /// Returns `None` without changing anything if `identity` already holds a
    /// claim or the pool is empty.
    pub async fn claim(&self, identity: &str) -> LedgerResult<Option<String>> {
        let _gate = self.gate.lock().await;
        let current = self.snapshot();

        if current.claims().contains(identity) {
            debug!(identity, "claim refused: identity already holds a key");
            return Ok(None);
        }
        let Some(key) = current.pool().head().map(str::to_string) else {
            debug!(identity, "claim refused: pool exhausted");
            return Ok(None);
        };

        let mut next = Snapshot::clone(&current);
        next.pool_mut().pool.pop_front();
        next.claims_mut()
            .insert(identity, ClaimRecord::new(key.as_str(), self.clock.now()));
        let available = next.pool().len();
        self.commit(next).await?;

        info!(identity, available, "issued key");
        Ok(Some(key))
    }

    /// Remove the claim of `identity`
    ///
    /// With `return_to_pool`, the key goes back to the pool head so it is
    /// reissued before any fresh key. Returns the revoked key, or `None` if
    /// `identity` held nothing.
    pub async fn revoke_claim(
        &self,
        identity: &str,
        return_to_pool: bool,
    ) -> LedgerResult<Option<String>> {
        let _gate = self.gate.lock().await;
        let current = self.snapshot();

        let Some(record) = current.claims().get(identity) else {
            debug!(identity, "revoke refused: no claim");
            return Ok(None);
        };
        let key = record.key.clone();

        let mut next = Snapshot::clone(&current);
        next.claims_mut().remove(identity);
        let returned = return_to_pool && !next.pool().contains(&key);
        if returned {
            next.pool_mut().pool.push_front(key.clone());
        }
        self.commit(next).await?;

        info!(identity, returned, "revoked claim");
        Ok(Some(key))
    }

    /// Bind a specific key to `identity`, bypassing pool order
    ///
    /// Fails (`false`) if `identity` already holds a claim or `key` is bound
    /// to anyone. The key need not be pooled; if it is, it leaves the pool.
    pub async fn assign_key_to_user(&self, identity: &str, key: &str) -> LedgerResult<bool> {
        let key = key.trim();
        if key.is_empty() {
            return Err(LedgerError::invalid("key", "key must not be empty"));
        }

        let _gate = self.gate.lock().await;
        let current = self.snapshot();

        if current.claims().contains(identity) {
            debug!(identity, "assign refused: identity already holds a key");
            return Ok(false);
        }
        if let Some(holder) = current.claims().holder_of(key) {
            debug!(identity, holder, "assign refused: key already assigned");
            return Ok(false);
        }

        let mut next = Snapshot::clone(&current);
        let was_pooled = next.pool().contains(key);
        if was_pooled {
            next.pool_mut().pool.remove(key);
        }
        next.claims_mut()
            .insert(identity, ClaimRecord::new(key, self.clock.now()));
        self.commit(next).await?;

        info!(identity, was_pooled, "assigned key");
        Ok(true)
    }

    /// Delete `key` from the pool and from any claim holding it
    ///
    /// An identity that held the key loses its claim outright. Returns whether
    /// anything changed; persists only then.
    pub async fn remove_key(&self, key: &str) -> LedgerResult<bool> {
        let key = key.trim();

        let _gate = self.gate.lock().await;
        let current = self.snapshot();

        let pooled = current.pool().contains(key);
        let held = current.claims().holder_of(key).is_some();
        if !pooled && !held {
            debug!("remove refused: key unknown");
            return Ok(false);
        }

        let mut next = Snapshot::clone(&current);
        if pooled {
            next.pool_mut().pool.remove(key);
        }
        let holders = if held {
            next.claims_mut().remove_key(key)
        } else {
            Vec::new()
        };
        self.commit(next).await?;

        info!(pooled, holders = ?holders, "removed key");
        Ok(true)
    }

    /// Apply a partial config update
    ///
    /// Every supplied field is validated before any is applied; an
    /// [`LedgerError::InvalidArgument`] means nothing changed. An empty update
    /// is a no-op.
    pub async fn set_config(&self, update: ConfigUpdate) -> LedgerResult<()> {
        if update.is_empty() {
            return Ok(());
        }

        let _gate = self.gate.lock().await;
        let current = self.snapshot();
        let config = update.apply_to(current.config())?;

        let mut next = Snapshot::clone(&current);
        next.pool_mut().config = config;
        self.commit(next).await?;

        info!(min_days = config.min_days, mode = %config.mode, "updated config");
        Ok(())
    }

    /// Stamp `identity`'s last request with the current time
    pub async fn record_request(&self, identity: &str) -> LedgerResult<()> {
        let _gate = self.gate.lock().await;
        let current = self.snapshot();

        let mut next = Snapshot::clone(&current);
        next.requests_mut().record(identity, self.clock.now());
        self.commit(next).await?;

        debug!(identity, "recorded request");
        Ok(())
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// Keys left to claim
    pub fn available_count(&self) -> usize {
        self.snapshot().pool().len()
    }

    /// Pooled keys, next-to-claim first
    pub fn list_pool(&self) -> Vec<String> {
        self.snapshot().pool().to_vec()
    }

    /// Whether `identity` holds a claim
    pub fn has_claimed(&self, identity: &str) -> bool {
        self.snapshot().claims().contains(identity)
    }

    /// Claim held by `identity`
    pub fn get_claim(&self, identity: &str) -> Option<ClaimRecord> {
        self.snapshot().claims().get(identity).cloned()
    }

    /// Every claim, in claim order
    pub fn list_claims(&self) -> ClaimLedger {
        self.snapshot().claims().clone()
    }

    /// Identity holding `key`
    pub fn holder_of(&self, key: &str) -> Option<String> {
        self.snapshot().claims().holder_of(key).map(str::to_string)
    }

    /// When `identity` last requested a key
    pub fn last_request(&self, identity: &str) -> Option<DateTime<Utc>> {
        self.snapshot().requests().last_requested(identity)
    }

    /// Current eligibility config
    pub fn get_config(&self) -> Config {
        self.snapshot().config()
    }
}
