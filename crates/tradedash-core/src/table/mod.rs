// ── View table engine ──
//
// Derives a filtered, sorted projection of rows from declared columns plus
// local UI state (sort, filter, selection). Never owns row data: every call
// projects from whatever snapshot the caller passes in.

mod column;
mod rows;

use std::cmp::Ordering;

use strum::Display;

pub use column::{CellValue, Column, ColumnKind, Comparator};
pub use rows::{coin_columns, coin_table, position_columns, position_table};

/// A fixed-shape record the engine can project.
pub trait TableRow {
    /// Identity used for selection.
    fn row_key(&self) -> String;

    /// Cell for a column key, or `None` for null/absent.
    fn cell(&self, key: &str) -> Option<CellValue>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Active sort column and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

// ── Projection ───────────────────────────────────────────────────

/// Rendered view of a table: headers plus display rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TableProjection {
    pub headers: Vec<String>,
    pub rows: Vec<ProjectedRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRow {
    pub key: String,
    pub cells: Vec<Option<CellValue>>,
    /// Selected rows render their detail sub-row.
    pub expanded: bool,
}

// ── ViewTable ────────────────────────────────────────────────────

/// Sort/filter/select state over a column set.
#[derive(Debug, Clone)]
pub struct ViewTable {
    columns: Vec<Column>,
    primary: String,
    sort: Option<SortSpec>,
    filter: String,
    selected: Option<String>,
}

impl ViewTable {
    /// `primary` is the column key the filter matches against.
    pub fn new(columns: Vec<Column>, primary: impl Into<String>) -> Self {
        Self {
            columns,
            primary: primary.into(),
            sort: None,
            filter: String::new(),
            selected: None,
        }
    }

    /// Start sorted by `column`.
    pub fn sorted_by(mut self, column: &str, direction: SortDirection) -> Self {
        if self.column(column).is_some() {
            self.sort = Some(SortSpec {
                column: column.to_owned(),
                direction,
            });
        }
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    // ── Commands ─────────────────────────────────────────────────

    pub fn set_filter(&mut self, predicate: impl Into<String>) {
        self.filter = predicate.into();
    }

    /// Sort-header click: flip the active column, or activate a new column
    /// ascending. Returns `false` for unknown columns.
    pub fn toggle_sort(&mut self, column: &str) -> bool {
        if self.column(column).is_none() {
            return false;
        }
        self.sort = Some(match self.sort.take() {
            Some(spec) if spec.column == column => SortSpec {
                direction: spec.direction.toggled(),
                ..spec
            },
            _ => SortSpec {
                column: column.to_owned(),
                direction: SortDirection::Ascending,
            },
        });
        true
    }

    /// Row click: select, or clear if already selected.
    pub fn select(&mut self, key: &str) {
        if self.selected.as_deref() == Some(key) {
            self.selected = None;
        } else {
            self.selected = Some(key.to_owned());
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.selected.as_deref() == Some(key)
    }

    // ── Derivation ───────────────────────────────────────────────

    /// Filter then sort `rows`. The sort is stable; nulls are always last.
    pub fn apply<'a, R: TableRow>(&self, rows: &'a [R]) -> Vec<&'a R> {
        let needle = self.filter.to_lowercase();
        let mut out: Vec<&R> = rows
            .iter()
            .filter(|row| needle.is_empty() || self.primary_text(*row).to_lowercase().contains(&needle))
            .collect();

        if let Some((column, direction)) = self
            .sort
            .as_ref()
            .and_then(|spec| self.column(&spec.column).map(|c| (c, spec.direction)))
        {
            let compare = column.kind.comparator();
            let mut keyed: Vec<(&R, Option<CellValue>)> = out
                .into_iter()
                .map(|row| (row, column.kind.normalize(row.cell(&column.key))))
                .collect();
            keyed.sort_by(|(_, a), (_, b)| compare_nullable(a.as_ref(), b.as_ref(), compare, direction));
            out = keyed.into_iter().map(|(row, _)| row).collect();
        }
        out
    }

    /// Build the display projection for `rows`.
    pub fn project<R: TableRow>(&self, rows: &[R]) -> TableProjection {
        let headers = self.columns.iter().map(|c| c.label.clone()).collect();
        let rows = self
            .apply(rows)
            .into_iter()
            .map(|row| {
                let key = row.row_key();
                ProjectedRow {
                    cells: self.columns.iter().map(|c| c.kind.normalize(row.cell(&c.key))).collect(),
                    expanded: self.is_expanded(&key),
                    key,
                }
            })
            .collect();
        TableProjection { headers, rows }
    }

    fn primary_text<R: TableRow>(&self, row: &R) -> String {
        row.cell(&self.primary).map(|c| c.to_string()).unwrap_or_default()
    }
}

/// Nulls last in either direction; direction only flips non-null order.
fn compare_nullable(
    a: Option<&CellValue>,
    b: Option<&CellValue>,
    compare: Comparator,
    direction: SortDirection,
) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => direction.apply(compare(a, b)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use tradedash_api::models::CoinMarket;

    use super::*;

    fn coin(symbol: &str, pnl: Option<f64>, blacklisted: bool) -> CoinMarket {
        CoinMarket {
            coin: symbol.to_owned(),
            total_pnl: pnl,
            blacklisted,
            ..CoinMarket::default()
        }
    }

    fn keys<R: TableRow>(rows: &[&R]) -> Vec<String> {
        rows.iter().map(|r| r.row_key()).collect()
    }

    fn pnl_rows() -> Vec<CoinMarket> {
        vec![
            coin("A", Some(3.0), false),
            coin("B", None, false),
            coin("C", Some(1.0), false),
            coin("D", None, false),
            coin("E", Some(2.0), false),
        ]
    }

    fn pnl_values(table: &ViewTable, rows: &[CoinMarket]) -> Vec<Option<f64>> {
        table.apply(rows).iter().map(|c| c.total_pnl).collect()
    }

    #[test]
    fn numeric_sort_keeps_nulls_last_in_both_directions() {
        let rows = pnl_rows();
        let mut table = coin_table();

        assert!(table.toggle_sort("total_pnl"));
        assert_eq!(pnl_values(&table, &rows), vec![Some(1.0), Some(2.0), Some(3.0), None, None]);

        assert!(table.toggle_sort("total_pnl"));
        assert_eq!(table.sort().unwrap().direction, SortDirection::Descending);
        assert_eq!(pnl_values(&table, &rows), vec![Some(3.0), Some(2.0), Some(1.0), None, None]);
    }

    #[test]
    fn null_ties_keep_input_order() {
        let rows = pnl_rows();
        let table = coin_table().sorted_by("total_pnl", SortDirection::Descending);
        let sorted = table.apply(&rows);
        assert_eq!(keys(&sorted), vec!["A", "E", "C", "B", "D"]);
    }

    #[test]
    fn filter_is_case_insensitive_substring_on_primary() {
        let rows = vec![coin("BTC", None, false), coin("ETH", None, false), coin("SOL", None, false)];
        let mut table = coin_table();

        table.set_filter("et");
        assert_eq!(keys(&table.apply(&rows)), vec!["ETH"]);

        table.set_filter("");
        assert_eq!(table.apply(&rows).len(), 3);

        table.set_filter("xyz");
        assert!(table.apply(&rows).is_empty());
    }

    #[test]
    fn toggling_same_column_twice_restores_order() {
        let rows = vec![coin("sol", None, false), coin("BTC", None, false), coin("eth", None, false)];
        let mut table = coin_table();

        table.toggle_sort("coin");
        let first = keys(&table.apply(&rows));
        assert_eq!(first, vec!["BTC", "eth", "sol"]);

        table.toggle_sort("coin");
        assert_eq!(keys(&table.apply(&rows)), vec!["sol", "eth", "BTC"]);

        table.toggle_sort("coin");
        assert_eq!(keys(&table.apply(&rows)), first);
    }

    #[test]
    fn new_column_resets_to_ascending() {
        let mut table = coin_table();
        table.toggle_sort("coin");
        table.toggle_sort("coin");
        assert_eq!(table.sort().unwrap().direction, SortDirection::Descending);

        table.toggle_sort("total_pnl");
        assert_eq!(
            table.sort(),
            Some(&SortSpec {
                column: "total_pnl".into(),
                direction: SortDirection::Ascending,
            })
        );

        assert!(!table.toggle_sort("no_such_column"));
        assert_eq!(table.sort().unwrap().column, "total_pnl");
    }

    #[test]
    fn boolean_column_sorts_false_first() {
        let rows = vec![coin("A", None, true), coin("B", None, false), coin("C", None, true)];
        let mut table = coin_table();
        table.toggle_sort("blacklisted");
        assert_eq!(keys(&table.apply(&rows)), vec!["B", "A", "C"]);
        table.toggle_sort("blacklisted");
        assert_eq!(keys(&table.apply(&rows)), vec!["A", "C", "B"]);
    }

    #[test]
    fn selection_toggles_and_replaces() {
        let mut table = coin_table();
        table.select("BTC");
        assert_eq!(table.selected(), Some("BTC"));
        table.select("ETH");
        assert_eq!(table.selected(), Some("ETH"));
        assert!(!table.is_expanded("BTC"));
        table.select("ETH");
        assert_eq!(table.selected(), None);
    }

    #[test]
    fn projection_marks_selected_row_expanded() {
        let rows = vec![coin("BTC", Some(12.5), false), coin("ETH", None, true)];
        let mut table = ViewTable::new(
            vec![
                Column::text("coin", "Coin"),
                Column::number("total_pnl", "PnL"),
                Column::boolean("blacklisted", "Blacklisted"),
            ],
            "coin",
        );
        table.select("ETH");

        let projection = table.project(&rows);
        assert_eq!(projection.headers, vec!["Coin", "PnL", "Blacklisted"]);
        assert_eq!(
            projection.rows,
            vec![
                ProjectedRow {
                    key: "BTC".into(),
                    cells: vec![Some("BTC".into()), Some(12.5.into()), Some(false.into())],
                    expanded: false,
                },
                ProjectedRow {
                    key: "ETH".into(),
                    cells: vec![Some("ETH".into()), None, Some(true.into())],
                    expanded: true,
                },
            ]
        );
    }

    #[test]
    fn position_rows_project_through_the_same_engine() {
        use tradedash_api::models::OpenPosition;

        let rows = vec![
            OpenPosition {
                coin: "ETH".into(),
                side: "long".into(),
                unrealized_pnl: Some(-4.0),
                ..OpenPosition::default()
            },
            OpenPosition {
                coin: "BTC".into(),
                side: "short".into(),
                unrealized_pnl: Some(10.0),
                ..OpenPosition::default()
            },
        ];
        let table = position_table().sorted_by("unrealized_pnl", SortDirection::Descending);
        assert_eq!(keys(&table.apply(&rows)), vec!["BTC:short", "ETH:long"]);
    }
}
