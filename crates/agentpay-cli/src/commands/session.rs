//! Session commands - Issue and inspect session keys

use std::time::Duration;

use agentpay_session::{SessionKey, SessionKeyManager};
use anyhow::Context;
use colored::*;

use crate::display;

/// Generate a key and print its serialized form
pub fn generate(chain_id: u64, duration: Duration) -> anyhow::Result<()> {
    let duration = chrono::Duration::from_std(duration).context("duration out of range")?;
    let manager = SessionKeyManager::default();
    let key = manager.generate(chain_id, duration)?;
    let serialized = key.serialize()?;

    display::section("Session Key");
    display::kv("Address", &key.address().to_checksum(None));
    display::kv("Chain", &chain_id.to_string());
    display::kv("Valid after", &display::timestamp(key.valid_after()));
    display::kv("Valid until", &display::timestamp(key.valid_until()));
    println!();
    display::warning("The serialized key below holds the private key. Store it as a secret.");
    println!();
    println!("{}", serialized);
    Ok(())
}

/// Decode a key and report whether it would sign right now
pub fn inspect(encoded: &str) -> anyhow::Result<()> {
    let key = SessionKey::deserialize(encoded.trim()).context("could not decode session key")?;

    display::section("Session Key");
    display::kv("Address", &key.address().to_checksum(None));
    display::kv("Chain", &key.chain_id().to_string());
    display::kv("Valid after", &display::timestamp(key.valid_after()));
    display::kv("Valid until", &display::timestamp(key.valid_until()));
    println!();

    match SessionKeyManager::default().validate(&key) {
        Ok(()) => display::success(&"Key can sign".bright_green().bold().to_string()),
        Err(e) => display::error(&format!("Key cannot sign: {}", e)),
    }
    Ok(())
}
