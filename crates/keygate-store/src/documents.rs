//! Document types
//!
//! The shapes here are the on-disk shapes. Field names stay snake_case so
//! existing `keys.json`, `claims.json` and `requests.json` files keep loading.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Minimum account or membership age, in days, when none is configured
pub const DEFAULT_MIN_DAYS: u32 = 7;

/// Which reference time the eligibility rule measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EligibilityMode {
    /// Age of the user's platform account
    #[default]
    Account,
    /// Time since the user joined the community
    Guild,
}

impl EligibilityMode {
    /// Lowercase wire name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Guild => "guild",
        }
    }
}

impl fmt::Display for EligibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a mode name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized eligibility mode '{0}', expected 'account' or 'guild'")]
pub struct ParseModeError(pub String);

impl FromStr for EligibilityMode {
    type Err = ParseModeError;

    /// Case-insensitive, ignores surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "account" => Ok(Self::Account),
            "guild" => Ok(Self::Guild),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Eligibility configuration persisted alongside the pool
///
/// Deserialization is lenient: a missing or malformed field falls back to its
/// default instead of failing the whole pool document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Config {
    /// Minimum age in days of the reference time
    pub min_days: u32,
    /// Which reference time is measured
    pub mode: EligibilityMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_days: DEFAULT_MIN_DAYS,
            mode: EligibilityMode::default(),
        }
    }
}

impl From<Value> for Config {
    fn from(value: Value) -> Self {
        let defaults = Self::default();
        let min_days = value
            .get("min_days")
            .and_then(min_days_from_value)
            .unwrap_or(defaults.min_days);
        let mode = value
            .get("mode")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(defaults.mode);
        Self { min_days, mode }
    }
}

fn min_days_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// FIFO sequence of keys available for claiming
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPool(VecDeque<String>);

impl KeyPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of available keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no keys are available
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `key` is listed
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    /// Keys in claim order, head first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Owned copy of the keys in claim order
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    /// Key that the next claim would receive
    pub fn head(&self) -> Option<&str> {
        self.0.front().map(String::as_str)
    }

    /// Append to the tail
    pub fn push_back(&mut self, key: String) {
        self.0.push_back(key);
    }

    /// Insert at the head, ahead of every other key
    pub fn push_front(&mut self, key: String) {
        self.0.push_front(key);
    }

    /// Take the head
    pub fn pop_front(&mut self) -> Option<String> {
        self.0.pop_front()
    }

    /// Remove every occurrence of `key`; returns whether any was present
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|k| k != key);
        self.0.len() != before
    }

    /// Trim entries, drop empties and drop repeats, keeping first occurrence
    ///
    /// Returns how many entries were rewritten or dropped.
    pub fn normalize(&mut self) -> usize {
        let mut seen = HashSet::with_capacity(self.0.len());
        let mut normalized = VecDeque::with_capacity(self.0.len());
        let mut touched = 0;
        for raw in self.0.drain(..) {
            let trimmed = raw.trim();
            if trimmed.len() != raw.len() {
                touched += 1;
            }
            if trimmed.is_empty() || !seen.insert(trimmed.to_string()) {
                if trimmed.len() == raw.len() {
                    touched += 1;
                }
                continue;
            }
            normalized.push_back(trimmed.to_string());
        }
        self.0 = normalized;
        touched
    }

    /// Drop keys the ledger already holds; returns how many were dropped
    pub fn retain_unclaimed(&mut self, claims: &ClaimLedger) -> usize {
        let held = claims.held_keys();
        let before = self.0.len();
        self.0.retain(|k| !held.contains(k.as_str()));
        before - self.0.len()
    }
}

impl<S: Into<String>> FromIterator<S> for KeyPool {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Pool plus config, persisted together as `keys.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDocument {
    /// Keys available for claiming
    #[serde(default)]
    pub pool: KeyPool,
    /// Eligibility configuration
    #[serde(default)]
    pub config: Config,
}

/// One issued key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// The issued key
    pub key: String,
    /// When the key was bound to the identity
    #[serde(alias = "claimedAt")]
    pub claimed_at: DateTime<Utc>,
}

impl ClaimRecord {
    /// Bind `key` at `claimed_at`
    pub fn new(key: impl Into<String>, claimed_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            claimed_at,
        }
    }
}

/// Identity → claim, in claim order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimLedger(IndexMap<String, ClaimRecord>);

impl ClaimLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of claims
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no claims exist
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Claim held by `identity`
    pub fn get(&self, identity: &str) -> Option<&ClaimRecord> {
        self.0.get(identity)
    }

    /// Whether `identity` holds a claim
    pub fn contains(&self, identity: &str) -> bool {
        self.0.contains_key(identity)
    }

    /// Identity holding `key`, if any
    pub fn holder_of(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, record)| record.key == key)
            .map(|(identity, _)| identity.as_str())
    }

    /// Every key currently bound to an identity
    pub fn held_keys(&self) -> HashSet<&str> {
        self.0.values().map(|record| record.key.as_str()).collect()
    }

    /// Record a claim, replacing any existing entry for `identity`
    pub fn insert(&mut self, identity: impl Into<String>, record: ClaimRecord) {
        self.0.insert(identity.into(), record);
    }

    /// Remove the claim of `identity`, keeping the order of the rest
    pub fn remove(&mut self, identity: &str) -> Option<ClaimRecord> {
        self.0.shift_remove(identity)
    }

    /// Remove every claim bound to `key`; returns the identities that lost it
    pub fn remove_key(&mut self, key: &str) -> Vec<String> {
        let holders: Vec<String> = self
            .0
            .iter()
            .filter(|(_, record)| record.key == key)
            .map(|(identity, _)| identity.clone())
            .collect();
        for identity in &holders {
            self.0.shift_remove(identity);
        }
        holders
    }

    /// Claims in claim order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClaimRecord)> {
        self.0.iter().map(|(identity, record)| (identity.as_str(), record))
    }
}

impl FromIterator<(String, ClaimRecord)> for ClaimLedger {
    fn from_iter<I: IntoIterator<Item = (String, ClaimRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Last time an identity asked for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Time of the most recent request
    #[serde(alias = "lastRequestedAt")]
    pub last_requested_at: DateTime<Utc>,
}

/// Identity → last request, latest write wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestLog(IndexMap<String, RequestRecord>);

impl RequestLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities that ever requested
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nobody has requested yet
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrite the entry for `identity`
    pub fn record(&mut self, identity: impl Into<String>, at: DateTime<Utc>) {
        self.0
            .insert(identity.into(), RequestRecord { last_requested_at: at });
    }

    /// Last request time of `identity`
    pub fn last_requested(&self, identity: &str) -> Option<DateTime<Utc>> {
        self.0.get(identity).map(|record| record.last_requested_at)
    }
}

/// The three documents as one in-memory unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Documents {
    /// Pool and config (`keys.json`)
    pub pool: PoolDocument,
    /// Claim ledger (`claims.json`)
    pub claims: ClaimLedger,
    /// Request log (`requests.json`)
    pub requests: RequestLog,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mode_parse_is_case_insensitive() {
        assert_eq!(" Guild ".parse::<EligibilityMode>(), Ok(EligibilityMode::Guild));
        assert_eq!("ACCOUNT".parse::<EligibilityMode>(), Ok(EligibilityMode::Account));
        assert!("server".parse::<EligibilityMode>().is_err());
    }

    #[test]
    fn config_falls_back_per_field() {
        let config: Config = serde_json::from_value(json!({"min_days": "14", "mode": "bogus"}))
            .unwrap();
        assert_eq!(config.min_days, 14);
        assert_eq!(config.mode, EligibilityMode::Account);

        let config: Config = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(config, Config::default());

        let config: Config = serde_json::from_value(json!({"min_days": -3, "mode": "guild"}))
            .unwrap();
        assert_eq!(config.min_days, DEFAULT_MIN_DAYS);
        assert_eq!(config.mode, EligibilityMode::Guild);
    }

    #[test]
    fn pool_document_serializes_original_shape() {
        let doc = PoolDocument {
            pool: ["K1", "K2"].into_iter().collect(),
            config: Config::default(),
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({"pool": ["K1", "K2"], "config": {"min_days": 7, "mode": "account"}})
        );
    }

    #[test]
    fn pool_document_survives_missing_config() {
        let doc: PoolDocument = serde_json::from_value(json!({"pool": ["A"]})).unwrap();
        assert_eq!(doc.pool.to_vec(), vec!["A"]);
        assert_eq!(doc.config, Config::default());
    }

    #[test]
    fn normalize_trims_and_dedups_in_order() {
        let mut pool: KeyPool = ["  A ", "B", "", "A", "C", "B", "   "].into_iter().collect();
        let touched = pool.normalize();
        assert_eq!(pool.to_vec(), vec!["A", "B", "C"]);
        assert_eq!(touched, 5);

        let mut clean: KeyPool = ["A", "B"].into_iter().collect();
        assert_eq!(clean.normalize(), 0);
    }

    #[test]
    fn pool_remove_drops_every_copy() {
        let mut pool: KeyPool = ["A", "B", "A"].into_iter().collect();
        assert!(pool.remove("A"));
        assert_eq!(pool.to_vec(), vec!["B"]);
        assert!(!pool.remove("A"));
    }

    #[test]
    fn ledger_reverse_lookup_and_key_removal() {
        let at = Utc::now();
        let mut ledger = ClaimLedger::new();
        ledger.insert("u1", ClaimRecord::new("K1", at));
        ledger.insert("u2", ClaimRecord::new("K2", at));
        ledger.insert("u3", ClaimRecord::new("K1", at));

        assert_eq!(ledger.holder_of("K2"), Some("u2"));
        assert_eq!(ledger.remove_key("K1"), vec!["u1".to_string(), "u3".to_string()]);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.holder_of("K1").is_none());
    }

    #[test]
    fn claim_record_accepts_camel_case_alias() {
        let record: ClaimRecord =
            serde_json::from_value(json!({"key": "K", "claimedAt": "2025-11-01T22:22:00Z"}))
                .unwrap();
        assert_eq!(record.key, "K");
        let out = serde_json::to_value(&record).unwrap();
        assert!(out.get("claimed_at").is_some());
    }
}
