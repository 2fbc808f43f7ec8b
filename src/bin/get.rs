//! Concourse `in` (installed from the `get` binary) for the IRC notification resource.
//!
//! There is nothing to fetch; the requested version is echoed back so that
//! the implicit `get` after a `put` succeeds.

use std::io::Read;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize, Default)]
struct InRequest {
    #[serde(default)]
    version: Option<Value>,
}

fn in_output(input: &str) -> Result<Value> {
    let request: InRequest = if input.trim().is_empty() {
        InRequest::default()
    } else {
        serde_json::from_str(input).context("Failed to decode in request")?
    };
    let version = request
        .version
        .filter(|v| !v.is_null())
        .unwrap_or_else(|| json!({ "ref": "none" }));
    Ok(json!({ "version": version, "metadata": [] }))
}

fn main() -> Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read in request")?;

    println!("{}", in_output(&input)?);
    Ok(())
}
