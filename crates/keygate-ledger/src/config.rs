//! Partial config updates
//!
//! An update is validated as a whole: if any supplied field is rejected, no
//! field is applied.

use keygate_store::{Config, EligibilityMode};

use crate::error::{LedgerError, LedgerResult};

/// Largest accepted `min_days` (ten years)
pub const MAX_MIN_DAYS: u32 = 3650;

/// Fields to change; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    /// New minimum age in days
    pub min_days: Option<u32>,
    /// New mode, as supplied by the caller
    pub mode: Option<String>,
}

impl ConfigUpdate {
    /// Update that changes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `min_days`
    pub fn min_days(mut self, days: u32) -> Self {
        self.min_days = Some(days);
        self
    }

    /// Set `mode` by name
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Whether no field is supplied
    pub fn is_empty(&self) -> bool {
        self.min_days.is_none() && self.mode.is_none()
    }

    /// Validate every supplied field and produce the resulting config
    pub(crate) fn apply_to(&self, current: Config) -> LedgerResult<Config> {
        let mode = match self.mode.as_deref() {
            Some(raw) => raw
                .parse::<EligibilityMode>()
                .map_err(|e| LedgerError::invalid("mode", e.to_string()))?,
            None => current.mode,
        };
        let min_days = match self.min_days {
            Some(days) if days > MAX_MIN_DAYS => {
                return Err(LedgerError::invalid(
                    "min_days",
                    format!("{days} exceeds the maximum of {MAX_MIN_DAYS}"),
                ));
            }
            Some(days) => days,
            None => current.min_days,
        };
        Ok(Config { min_days, mode })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn only_supplied_fields_change() {
        let current = Config::default();
        let next = ConfigUpdate::new().min_days(14).apply_to(current).unwrap();
        assert_eq!(next.min_days, 14);
        assert_eq!(next.mode, current.mode);

        let next = ConfigUpdate::new().mode("GUILD").apply_to(current).unwrap();
        assert_eq!(next.min_days, current.min_days);
        assert_eq!(next.mode, EligibilityMode::Guild);
    }

    #[test]
    fn bad_mode_rejects_the_whole_update() {
        let err = ConfigUpdate::new()
            .min_days(1)
            .mode("invalid")
            .apply_to(Config::default())
            .unwrap_err();
        assert_matches!(err, LedgerError::InvalidArgument { field: "mode", .. });
    }

    #[test]
    fn min_days_is_bounded() {
        assert!(ConfigUpdate::new()
            .min_days(MAX_MIN_DAYS)
            .apply_to(Config::default())
            .is_ok());
        let err = ConfigUpdate::new()
            .min_days(MAX_MIN_DAYS + 1)
            .apply_to(Config::default())
            .unwrap_err();
        assert_matches!(err, LedgerError::InvalidArgument { field: "min_days", .. });
    }
}
