//! CLI configuration: a thin wrapper around the `tradedash_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--server, --timeout).

use std::time::Duration;

use tradedash_core::SyncConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use tradedash_config::{Config, Profile, config_path, load_config, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

pub fn available_profiles(config: &Config) -> String {
    let names = config.profile_names();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

/// Build a `SyncConfig` from the config file, the active profile, and CLI
/// overrides.
///
/// Flag > env > profile > defaults. With no profile on disk, `--server`
/// alone is enough.
pub fn resolve_sync_config(global: &GlobalOpts, push_enabled: bool) -> Result<SyncConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let profile = match (cfg.profiles.get(&profile_name), global.server.as_deref()) {
        (Some(profile), Some(server)) => Profile {
            server: server.to_owned(),
            ..profile.clone()
        },
        (Some(profile), None) => profile.clone(),
        (None, Some(server)) => Profile::new(server),
        (None, None) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    let mut sync = tradedash_config::profile_to_sync_config(&profile, &cfg.defaults)?;
    if let Some(secs) = global.timeout {
        sync.timeout = Duration::from_secs(secs);
    }
    sync.push_enabled &= push_enabled;
    Ok(sync)
}
