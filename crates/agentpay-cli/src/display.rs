//! Terminal output helpers

use colored::*;

const RULE_WIDTH: usize = 64;

/// Heading with a rule underneath
pub fn section(title: &str) {
    println!();
    println!(" {}", title.bright_white().bold());
    println!("{}", "─".repeat(RULE_WIDTH).bright_black());
}

pub fn success(message: &str) {
    println!("  {} {}", "✓".bright_green(), message);
}

pub fn error(message: &str) {
    eprintln!("  {} {}", "✗".bright_red(), message.bright_red());
}

pub fn warning(message: &str) {
    println!("  {} {}", "!".yellow().bold(), message.yellow());
}

/// Aligned `label: value` row
pub fn kv(label: &str, value: &str) {
    println!("    {:<20} {}", format!("{}:", label), value.bright_cyan());
}

/// Render a unix timestamp as RFC 3339, falling back to the raw number
pub fn timestamp(seconds: u64) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| seconds.to_string())
}
