//! Pool management: add, list, remove

use anyhow::Result;
use keygate_ledger::KeyLedger;

use crate::format::split_key_input;

/// Add keys from raw operator input
pub async fn add(ledger: &KeyLedger, inputs: &[String]) -> Result<()> {
    let candidates = split_key_input(inputs);
    let added = ledger.add_keys(&candidates).await?;
    println!("Added: {added}. Available: {}", ledger.available_count());
    Ok(())
}

/// Print the pool, next-to-claim first
pub fn list(ledger: &KeyLedger) {
    let pool = ledger.list_pool();
    if pool.is_empty() {
        println!("No keys available.");
        return;
    }
    for (i, key) in pool.iter().enumerate() {
        println!("{}. {key}", i + 1);
    }
}

/// Remove a key wherever it appears
pub async fn remove(ledger: &KeyLedger, key: &str) -> Result<()> {
    let holder = ledger.holder_of(key.trim());
    if ledger.remove_key(key).await? {
        match holder {
            Some(identity) => println!("Removed {key}; {identity} no longer holds a key."),
            None => println!("Removed {key}."),
        }
    } else {
        println!("Key not found.");
    }
    Ok(())
}
