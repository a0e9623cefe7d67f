//! Open positions, from the dashboard snapshot.

use tradedash_core::table::position_table;
use tradedash_core::{OpenPosition, SyncService};

use crate::cli::{GlobalOpts, TableArgs};
use crate::commands::util::configure_view;
use crate::error::CliError;
use crate::output;

pub async fn handle(service: &SyncService, args: &TableArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let table = configure_view(position_table(), args)?;
    let snapshot = service.dashboard().refresh_now().await?;
    let positions = &snapshot.open_positions;

    let rows = table.apply(positions);
    let projection = table.project(positions);
    let color = output::should_color(global.color);

    let out = output::render_view(global.output, &projection, &rows, |p| detail(p, color))?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(p: &OpenPosition, color: bool) -> String {
    let move_pct = match (p.entry_price, p.current_price) {
        (Some(entry), Some(current)) if entry.abs() > f64::EPSILON => Some((current - entry) / entry * 100.0),
        _ => None,
    };
    output::render_pairs(&[
        ("Coin", p.coin.clone()),
        ("Side", p.side.clone()),
        ("Entry", output::number(p.entry_price, 4)),
        ("Current", output::number(p.current_price, 4)),
        ("Move %", output::number(move_pct, 2)),
        ("Size", output::number(p.size, 4)),
        ("Leverage", p.leverage.map_or_else(|| "-".into(), |l| format!("{l}x"))),
        ("Unrealized PnL", output::pnl(p.unrealized_pnl, color)),
    ])
}
