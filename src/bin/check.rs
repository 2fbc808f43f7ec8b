//! Concourse `check` for the IRC notification resource.
//!
//! Notifications are write-only, so there are never new versions to report.

use std::io::Read;

use anyhow::{Context, Result};

fn main() -> Result<()> {
    // Drain the request so Concourse doesn't see a broken pipe
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read check request")?;

    println!("{}", check_output());
    Ok(())
}

fn check_output() -> serde_json::Value {
    serde_json::json!([])
}
