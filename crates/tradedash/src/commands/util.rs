//! Shared helpers for command handlers.

use tradedash_core::ViewTable;

use crate::cli::TableArgs;
use crate::error::CliError;

/// Apply `--filter`, `--sort`/`--desc` and `--select` to a view.
///
/// Sorting goes through the same header toggle a UI click would: once for
/// ascending, twice for descending.
pub fn configure_view(mut table: ViewTable, args: &TableArgs) -> Result<ViewTable, CliError> {
    if let Some(filter) = &args.filter {
        table.set_filter(filter.as_str());
    }

    if let Some(column) = &args.sort {
        if !table.toggle_sort(column) {
            let keys: Vec<&str> = table.columns().iter().map(|c| c.key.as_str()).collect();
            return Err(CliError::Validation {
                field: "sort".into(),
                reason: format!("unknown column '{column}'. Valid columns: {}", keys.join(", ")),
            });
        }
        if args.desc {
            table.toggle_sort(column);
        }
    }

    if let Some(key) = &args.select {
        table.select(key);
    }
    Ok(table)
}
