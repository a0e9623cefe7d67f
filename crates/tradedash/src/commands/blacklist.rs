//! Blacklist subcommand handlers.

use tabled::Tabled;

use tradedash_core::{BlacklistEntry, SyncService};

use crate::cli::{BlacklistArgs, BlacklistCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct BlacklistRow {
    #[tabled(rename = "Coin")]
    coin: String,
    #[tabled(rename = "Added")]
    added_at: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<&BlacklistEntry> for BlacklistRow {
    fn from(e: &BlacklistEntry) -> Self {
        Self {
            coin: e.coin.clone(),
            added_at: e.added_at.clone().unwrap_or_else(|| "-".into()),
            reason: if e.reason.is_empty() { "-".into() } else { e.reason.clone() },
        }
    }
}

pub async fn handle(service: &SyncService, args: BlacklistArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        BlacklistCommand::List => {
            let entries = service.blacklist().refresh_now().await?;
            let out = output::render_list(
                global.output,
                entries.as_slice(),
                |e| BlacklistRow::from(e),
                |e| e.coin.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BlacklistCommand::Add { coin } => {
            let coin = normalize(&coin)?;
            service.add_to_blacklist(&coin).await?;
            confirm(&coin, true, global);
            Ok(())
        }

        BlacklistCommand::Remove { coin } => {
            let coin = normalize(&coin)?;
            service.remove_from_blacklist(&coin).await?;
            confirm(&coin, false, global);
            Ok(())
        }

        BlacklistCommand::Toggle { coin } => {
            let coin = normalize(&coin)?;
            // the toggle reads the current flag from the coin rows
            service.coins().refresh_now().await?;
            let blacklisted = service.toggle_blacklist(&coin).await?;
            confirm(&coin, blacklisted, global);
            Ok(())
        }
    }
}

/// Coin symbols are upper-case on the backend.
fn normalize(coin: &str) -> Result<String, CliError> {
    let coin = coin.trim();
    if coin.is_empty() {
        return Err(CliError::Validation {
            field: "coin".into(),
            reason: "coin symbol cannot be empty".into(),
        });
    }
    Ok(coin.to_uppercase())
}

fn confirm(coin: &str, blacklisted: bool, global: &GlobalOpts) {
    if global.quiet {
        return;
    }
    if blacklisted {
        eprintln!("✓ {coin} blacklisted");
    } else {
        eprintln!("✓ {coin} removed from blacklist");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_normalized() {
        assert_eq!(normalize(" doge ").ok().as_deref(), Some("DOGE"));
        assert!(normalize("  ").is_err());
    }

    #[test]
    fn derived_entries_render_placeholders() {
        let row = BlacklistRow::from(&BlacklistEntry {
            coin: "DOGE".into(),
            ..BlacklistEntry::default()
        });
        assert_eq!(row.added_at, "-");
        assert_eq!(row.reason, "-");
    }
}
