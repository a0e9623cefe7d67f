//! Coin list with market data, journal statistics and blacklist flags.

use tradedash_core::table::coin_table;
use tradedash_core::{CoinMarket, SyncService};

use crate::cli::{GlobalOpts, TableArgs};
use crate::commands::util::configure_view;
use crate::error::CliError;
use crate::output;

pub async fn handle(service: &SyncService, args: &TableArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let table = configure_view(coin_table(), args)?;
    let coins = service.coins().refresh_now().await?;

    let rows = table.apply(&coins.coins);
    let projection = table.project(&coins.coins);
    let color = output::should_color(global.color);

    let out = output::render_view(global.output, &projection, &rows, |c| detail(c, color))?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(c: &CoinMarket, color: bool) -> String {
    output::render_pairs(&[
        ("Coin", c.coin.clone()),
        ("Mark price", output::number(c.mark_price, 4)),
        ("Funding rate", output::number(c.funding_rate, 6)),
        ("Open interest", output::number(c.open_interest, 0)),
        ("Trades", c.trade_count.to_string()),
        ("Win rate", c.win_rate.map_or_else(|| "-".into(), |w| format!("{:.1}%", w * 100.0))),
        ("Total PnL", output::pnl(c.total_pnl, color)),
        ("Confidence adj.", format!("{:+.2}", c.confidence_adjustment)),
        ("Blacklisted", if c.blacklisted { "yes" } else { "no" }.into()),
    ])
}
