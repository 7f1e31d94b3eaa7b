//! Presentation helpers

use chrono::{DateTime, Utc};

/// `1 November 2025 at 22:22`; seconds and below are not shown
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%-d %B %Y at %H:%M").to_string()
}

/// Like [`format_timestamp`], with a placeholder for absent values
pub fn format_optional(at: Option<DateTime<Utc>>, absent: &str) -> String {
    at.map(format_timestamp)
        .unwrap_or_else(|| absent.to_string())
}

/// Split raw operator input into candidate keys
///
/// Each input may carry several keys separated by commas or newlines.
pub fn split_key_input<S: AsRef<str>>(inputs: &[S]) -> Vec<String> {
    inputs
        .iter()
        .flat_map(|input| input.as_ref().lines())
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_drops_seconds_and_padding() {
        let at: DateTime<Utc> = "2025-11-01T22:22:59.999Z".parse().unwrap();
        assert_eq!(format_timestamp(at), "1 November 2025 at 22:22");

        let at: DateTime<Utc> = "2026-03-09T04:05:00Z".parse().unwrap();
        assert_eq!(format_timestamp(at), "9 March 2026 at 04:05");
    }

    #[test]
    fn absent_timestamp_uses_placeholder() {
        assert_eq!(format_optional(None, "Never"), "Never");
    }

    #[test]
    fn splits_on_commas_and_lines() {
        let keys = split_key_input(&["A, B\nC", "", " D ,,\r\nE"]);
        assert_eq!(keys, vec!["A", "B", "C", "D", "E"]);
    }
}
