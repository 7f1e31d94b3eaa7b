//! Claim lifecycle: request, show, list, revoke, assign

use anyhow::Result;
use chrono::{DateTime, Utc};
use keygate_ledger::{evaluate_eligibility, Eligibility, EligibilityMode, KeyLedger};

use crate::format::{format_optional, format_timestamp};

/// The request flow: record, check eligibility, report or issue
pub async fn request(
    ledger: &KeyLedger,
    identity: &str,
    since: Option<DateTime<Utc>>,
) -> Result<()> {
    ledger.record_request(identity).await?;

    let config = ledger.get_config();
    match evaluate_eligibility(&config, since, Utc::now()) {
        Eligibility::Eligible => {}
        Eligibility::TooRecent {
            mode,
            required_days,
            eligible_at,
        } => {
            println!(
                "Not eligible: {} must be at least {required_days} day(s) old (eligible from {}).",
                reference_name(mode),
                format_timestamp(eligible_at)
            );
            return Ok(());
        }
        Eligibility::Unknown { mode } => {
            println!(
                "Not eligible: no {} time supplied (use --since).",
                reference_name(mode)
            );
            return Ok(());
        }
    }

    if let Some(existing) = ledger.get_claim(identity) {
        println!(
            "{identity} already holds {} (claimed {}).",
            existing.key,
            format_timestamp(existing.claimed_at)
        );
        return Ok(());
    }

    match ledger.claim(identity).await? {
        Some(key) => println!("{key}"),
        None => println!("No keys available right now."),
    }
    Ok(())
}

fn reference_name(mode: EligibilityMode) -> &'static str {
    match mode {
        EligibilityMode::Account => "account",
        EligibilityMode::Guild => "membership",
    }
}

/// Print one identity's claim
pub fn show(ledger: &KeyLedger, identity: &str) {
    let Some(claim) = ledger.get_claim(identity) else {
        println!("No key assigned.");
        return;
    };
    println!("Key: {}", claim.key);
    println!("Claimed: {}", format_timestamp(claim.claimed_at));
    println!(
        "Last request: {}",
        format_optional(ledger.last_request(identity), "Never")
    );
}

/// Print every claim in claim order
pub fn list(ledger: &KeyLedger) {
    let claims = ledger.list_claims();
    if claims.is_empty() {
        println!("No claims.");
        return;
    }
    for (i, (identity, claim)) in claims.iter().enumerate() {
        println!("{}. {identity}", i + 1);
        println!("   Key: {}", claim.key);
        println!("   Claimed: {}", format_timestamp(claim.claimed_at));
        println!(
            "   Last request: {}",
            format_optional(ledger.last_request(identity), "Never")
        );
    }
}

/// Revoke a claim, optionally returning the key to the pool head
pub async fn revoke(ledger: &KeyLedger, identity: &str, return_to_pool: bool) -> Result<()> {
    match ledger.revoke_claim(identity, return_to_pool).await? {
        Some(key) => println!("Revoked {key} from {identity}. Returned to pool: {return_to_pool}"),
        None => println!("{identity} holds no key."),
    }
    Ok(())
}

/// Bind a specific key to an identity
pub async fn assign(ledger: &KeyLedger, identity: &str, key: &str) -> Result<()> {
    if let Some(holder) = ledger.holder_of(key.trim()) {
        println!("Key already assigned to {holder}.");
        return Ok(());
    }
    if ledger.assign_key_to_user(identity, key).await? {
        println!("Assigned {} to {identity}.", key.trim());
    } else {
        println!("Assignment failed.");
    }
    Ok(())
}
