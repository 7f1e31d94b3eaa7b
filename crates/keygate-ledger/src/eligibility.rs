//! Eligibility evaluation
//!
//! The core does not gate claims on eligibility. Callers evaluate it before
//! calling [`crate::KeyLedger::claim`], using the persisted [`Config`] and the
//! reference time the mode asks for (account creation or community join).

use chrono::{DateTime, Duration, Utc};
use keygate_store::{Config, EligibilityMode};

/// Outcome of an eligibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Reference time is at least `min_days` old
    Eligible,
    /// Reference time is too recent
    TooRecent {
        /// Mode the check ran in
        mode: EligibilityMode,
        /// Configured minimum age
        required_days: u32,
        /// First instant at which the check would pass
        eligible_at: DateTime<Utc>,
    },
    /// The platform did not report a reference time
    Unknown {
        /// Mode the check ran in
        mode: EligibilityMode,
    },
}

impl Eligibility {
    /// Whether a claim may proceed
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Check `since` against `config.min_days` at `now`
///
/// A reference time exactly `min_days` old passes.
pub fn evaluate_eligibility(
    config: &Config,
    since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Eligibility {
    let Some(since) = since else {
        return Eligibility::Unknown { mode: config.mode };
    };
    let eligible_at = since
        .checked_add_signed(Duration::days(i64::from(config.min_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    if now >= eligible_at {
        Eligibility::Eligible
    } else {
        Eligibility::TooRecent {
            mode: config.mode,
            required_days: config.min_days,
            eligible_at,
        }
    }
}
