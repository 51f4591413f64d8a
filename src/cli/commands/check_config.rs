//! Check config command handler

use crate::config::Config;

pub fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    let admins = config.accounts.iter().filter(|a| a.role.is_admin()).count();
    let public = config.scripts.iter().filter(|s| s.is_public).count();

    println!("Configuration OK");
    println!("{:-<50}", "");
    println!(
        "  Server:      {}:{} (enabled: {})",
        config.server.bind_address, config.server.port, config.server.enabled
    );
    println!(
        "  Accounts:    {} ({} admin)",
        config.accounts.len(),
        admins
    );
    println!("  Scripts:     {} ({} public)", config.scripts.len(), public);
    println!(
        "  Rate limit:  {} requests / {}s",
        config.security.rate_limit.max_requests, config.security.rate_limit.window_seconds
    );
    println!(
        "  Lockout:     {} failures, {}s cooldown",
        config.security.lockout.max_failures, config.security.lockout.cooldown_seconds
    );
    println!(
        "  Tokens:      {}s TTL, refresh under {}s",
        config.security.tokens.ttl_seconds, config.security.tokens.refresh_threshold_seconds
    );

    if config.accounts.is_empty() {
        println!();
        println!("Warning: no accounts configured, nobody can log in.");
        println!("Create a hash with: scriptvault hash-password");
    }

    Ok(())
}
