//! Hash password command handler

use anyhow::Context;
use std::io::{BufRead, Write};

use crate::config::Config;
use crate::services::credentials::{hash_password, validate_secret};

/// Reads one line from `input` and writes the PHC string to `output`.
pub fn cmd_hash_password(
    config: &Config,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> anyhow::Result<()> {
    let mut secret = String::new();
    input
        .read_line(&mut secret)
        .context("Failed to read secret from stdin")?;
    let secret = secret.trim_end_matches(['\r', '\n']);

    validate_secret(secret).map_err(|e| anyhow::anyhow!(e))?;

    let hash = hash_password(secret, Some(&config.security))?;
    writeln!(output, "{hash}")?;
    Ok(())
}
