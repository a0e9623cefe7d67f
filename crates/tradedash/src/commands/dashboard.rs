//! Dashboard summary.

use chrono::{TimeDelta, Utc};

use tradedash_core::{DashboardSnapshot, SyncService};

use crate::cli::GlobalOpts;
use crate::commands::health;
use crate::error::CliError;
use crate::output;

pub async fn handle(service: &SyncService, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = service.dashboard().refresh_now().await?;
    let age = service.dashboard().state().age(Utc::now());
    let color = output::should_color(global.color);

    let out = output::render_single(
        global.output,
        snapshot.as_ref(),
        |s| summary(s, age, color),
        |s| s.status.clone().unwrap_or_default(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Key/value block shown for `--output table`. `age` is how long ago the
/// cache was last written.
pub fn summary(s: &DashboardSnapshot, age: Option<TimeDelta>, color: bool) -> String {
    let win_rate = s.win_rate.as_ref().map_or_else(
        || "-".into(),
        |w| format!("{}/{} ({:.1}%)", w.wins, w.total, w.win_rate * 100.0),
    );
    let streak = s
        .streak
        .as_ref()
        .map_or_else(|| "-".into(), |(kind, len)| format!("{len} {kind}"));
    let updated = s.last_updated.map_or_else(
        || "-".into(),
        |at| format!("{} ({}s ago)", at.format("%Y-%m-%d %H:%M:%S"), (Utc::now() - at).num_seconds()),
    );

    output::render_pairs(&[
        ("Status", s.status.clone().unwrap_or_else(|| "-".into())),
        ("Mode", s.mode.clone().unwrap_or_else(|| "-".into())),
        ("Equity", output::number(s.equity, 2)),
        ("Cash", output::number(s.cash, 2)),
        ("Initial balance", output::number(s.initial_balance, 2)),
        ("Total PnL", output::pnl(s.total_pnl, color)),
        ("Return %", output::number(s.return_pct, 2)),
        ("Open positions", s.open_positions.len().to_string()),
        ("Closed trades", s.closed_trades.len().to_string()),
        ("Win rate", win_rate),
        ("Streak", streak),
        ("Active rules", s.active_rules.map_or_else(|| "-".into(), |n| n.to_string())),
        ("Size modifier", output::number(s.position_size_modifier, 2)),
        ("Last updated", updated),
        ("Data age", age.map_or_else(|| "-".into(), data_age)),
    ])
}

fn data_age(age: TimeDelta) -> String {
    health::uptime(u64::try_from(age.num_seconds()).unwrap_or(0))
}
