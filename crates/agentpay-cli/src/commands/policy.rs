//! Policy commands - Validate policy documents

use std::fs;

use agentpay_policy::{encode_policy, validate, Policy};
use anyhow::Context;

use crate::display;

pub fn validate_file(path: &str, encode: bool) -> anyhow::Result<()> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let policy = Policy::from_json(&json)?;

    display::section("Policy");
    display::kv("Spending limits", &policy.spending_limits.len().to_string());
    for limit in &policy.spending_limits {
        display::kv(
            &format!("  {}", limit.token.to_checksum(None)),
            &format!("{} per {}s", limit.max_amount, limit.period.num_seconds()),
        );
    }
    let contracts = policy.contract_allowlist.as_ref().map(|a| a.contracts.len());
    let functions = policy.function_allowlist.as_ref().map(|a| a.selectors.len());
    display::kv("Contract allowlist", &describe(contracts));
    display::kv("Function allowlist", &describe(functions));
    if let Some(window) = &policy.time_window {
        display::kv(
            "Time window",
            &format!("{:02}:00-{:02}:59 UTC", window.start_hour, window.end_hour),
        );
    }
    if let Some(rate) = &policy.rate_limit {
        display::kv(
            "Rate limit",
            &format!("{} calls per {}s", rate.max_calls, rate.period.num_seconds()),
        );
    }
    println!();

    if let Err(e) = validate(&policy) {
        display::error(&e.to_string());
        anyhow::bail!("policy {} is invalid", path);
    }
    display::success("Policy is valid");

    if encode {
        let encoded = encode_policy(&policy)?;
        println!();
        println!("0x{}", hex::encode(encoded));
    }
    Ok(())
}

fn describe(entries: Option<usize>) -> String {
    match entries {
        Some(n) => format!("{} entries", n),
        None => "none".to_string(),
    }
}
