//! Config subcommand handlers.

use tradedash_config::{Defaults, profile_to_sync_config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

fn parse_number<T: std::str::FromStr>(field: &str, value: &str, unit: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be a number ({unit})"),
    })
}

/// Reject a profile that could not be turned into a runtime config.
fn validate(profile: &Profile, defaults: &Defaults) -> Result<(), CliError> {
    profile_to_sync_config(profile, defaults)?;
    Ok(())
}

/// Apply `key = value` to a profile.
fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "server" => profile.server = value,
        "push_url" | "push-url" => profile.push_url = Some(value),
        "timeout" => profile.timeout = Some(parse_number("timeout", &value, "seconds")?),
        "poll_interval_secs" | "poll-interval" => {
            profile.poll_interval_secs = Some(parse_number("poll_interval_secs", &value, "seconds")?);
        }
        "reconnect_delay_ms" | "reconnect-delay" => {
            profile.reconnect_delay_ms = Some(parse_number("reconnect_delay_ms", &value, "milliseconds")?);
        }
        "max_reconnect_attempts" | "max-reconnect-attempts" => {
            profile.max_reconnect_attempts = Some(parse_number("max_reconnect_attempts", &value, "attempts")?);
        }
        "push" => {
            profile.push = Some(value.parse().map_err(|_| CliError::Validation {
                field: "push".into(),
                reason: "must be 'true' or 'false'".into(),
            })?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: server, push_url, timeout, \
                     poll_interval_secs, reconnect_delay_ms, max_reconnect_attempts, push"
                ),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init <url> ──────────────────────────────────────────────
        ConfigCommand::Init { url, name } => {
            let mut cfg = config::load_config()?;
            let profile = Profile::new(url);
            validate(&profile, &cfg.defaults)?;

            let first = cfg.profiles.is_empty();
            cfg.profiles.insert(name.clone(), profile);
            if first {
                cfg.default_profile = Some(name.clone());
            }
            config::save_config(&cfg)?;

            if !global.quiet {
                eprintln!("✓ Profile '{name}' written to {}", config::config_path().display());
                eprintln!("  Test it: tradedash health --profile {name}");
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(
                global.output,
                &cfg,
                |c| {
                    let mut pairs = vec![
                        ("Config file", config::config_path().display().to_string()),
                        ("Default profile", c.default_profile_name().to_owned()),
                        ("Output", c.defaults.output.clone()),
                        ("Timeout", format!("{}s", c.defaults.timeout)),
                        ("Poll interval", format!("{}s", c.defaults.poll_interval_secs)),
                        ("Reconnect delay", format!("{}ms", c.defaults.reconnect_delay_ms)),
                    ];
                    for name in c.profile_names() {
                        if let Some(p) = c.profiles.get(name) {
                            pairs.push((name, p.server.clone()));
                        }
                    }
                    output::render_pairs(&pairs)
                },
                |c| c.default_profile_name().to_owned(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);

            let mut profile = cfg.profiles.get(&profile_name).cloned().unwrap_or_default();
            set_key(&mut profile, &key, value)?;
            if !profile.server.is_empty() {
                validate(&profile, &cfg.defaults)?;
            }
            cfg.profiles.insert(profile_name.clone(), profile);

            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: tradedash config init <url>");
            } else {
                let default = cfg.default_profile_name();
                for name in cfg.profile_names() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}
