// Row adapters for the backend's list resources.

use tradedash_api::models::{CoinMarket, OpenPosition};

use super::{CellValue, Column, TableRow, ViewTable};

impl TableRow for CoinMarket {
    fn row_key(&self) -> String {
        self.coin.clone()
    }

    fn cell(&self, key: &str) -> Option<CellValue> {
        match key {
            "coin" => Some(self.coin.as_str().into()),
            "mark_price" => self.mark_price.map(CellValue::from),
            "funding_rate" => self.funding_rate.map(CellValue::from),
            "open_interest" => self.open_interest.map(CellValue::from),
            "trade_count" => Some(self.trade_count.into()),
            "win_rate" => self.win_rate.map(CellValue::from),
            "total_pnl" => self.total_pnl.map(CellValue::from),
            "confidence_adjustment" => Some(self.confidence_adjustment.into()),
            "blacklisted" => Some(self.blacklisted.into()),
            _ => None,
        }
    }
}

impl TableRow for OpenPosition {
    fn row_key(&self) -> String {
        format!("{}:{}", self.coin, self.side)
    }

    fn cell(&self, key: &str) -> Option<CellValue> {
        match key {
            "coin" => Some(self.coin.as_str().into()),
            "side" => Some(self.side.as_str().into()),
            "entry_price" => self.entry_price.map(CellValue::from),
            "current_price" => self.current_price.map(CellValue::from),
            "size" => self.size.map(CellValue::from),
            "unrealized_pnl" => self.unrealized_pnl.map(CellValue::from),
            "leverage" => self.leverage.map(CellValue::from),
            _ => None,
        }
    }
}

/// Columns of the coin list screen.
pub fn coin_columns() -> Vec<Column> {
    vec![
        Column::text("coin", "Coin"),
        Column::number("mark_price", "Price"),
        Column::number("funding_rate", "Funding"),
        Column::number("open_interest", "Open Interest"),
        Column::number("trade_count", "Trades"),
        Column::number("win_rate", "Win Rate"),
        Column::number("total_pnl", "PnL"),
        Column::number("confidence_adjustment", "Confidence"),
        Column::boolean("blacklisted", "Blacklisted"),
    ]
}

/// Coin list table, filtered by coin symbol.
pub fn coin_table() -> ViewTable {
    ViewTable::new(coin_columns(), "coin")
}

/// Columns of the open positions panel.
pub fn position_columns() -> Vec<Column> {
    vec![
        Column::text("coin", "Coin"),
        Column::text("side", "Side"),
        Column::number("entry_price", "Entry"),
        Column::number("current_price", "Current"),
        Column::number("size", "Size"),
        Column::number("unrealized_pnl", "Unrealized PnL"),
        Column::number("leverage", "Leverage"),
    ]
}

pub fn position_table() -> ViewTable {
    ViewTable::new(position_columns(), "coin")
}
