//! Backend health probe.

use tradedash_core::{Health, SyncService};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(service: &SyncService, global: &GlobalOpts) -> Result<(), CliError> {
    let health = service.health().await?;
    let out = output::render_single(global.output, &health, detail, |h| h.status.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(h: &Health) -> String {
    output::render_pairs(&[
        ("Status", h.status.clone()),
        ("Mode", h.mode.clone()),
        ("Uptime", uptime(h.uptime_seconds)),
        ("Signals received", h.signals_received.to_string()),
    ])
}

pub(crate) fn uptime(secs: u64) -> String {
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3600, rem % 3600);
    let minutes = rem / 60;
    if days > 0 {
        format!("{days}d {hours:02}h {minutes:02}m")
    } else if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m {:02}s", rem % 60)
    }
}
