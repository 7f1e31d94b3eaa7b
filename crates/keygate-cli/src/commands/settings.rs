//! Eligibility config

use anyhow::Result;
use keygate_ledger::{ConfigUpdate, KeyLedger};

/// Apply any supplied fields, then print the resulting config
pub async fn run(ledger: &KeyLedger, min_days: Option<u32>, mode: Option<String>) -> Result<()> {
    let update = ConfigUpdate { min_days, mode };
    if !update.is_empty() {
        ledger.set_config(update).await?;
    }

    let config = ledger.get_config();
    println!("min_days: {}", config.min_days);
    println!("mode: {}", config.mode);
    Ok(())
}
