//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Tables use `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::builder::Builder;
use tabled::{Table, Tabled, settings::Style};

use tradedash_core::{CellValue, ConnectionState, TableProjection};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Connection indicator: `● connected` / `○ connecting` / `○ disconnected`.
pub fn connection_badge(state: ConnectionState, color: bool) -> String {
    let text = match state {
        ConnectionState::Open => "● connected".to_owned(),
        other => format!("○ {other}"),
    };
    if !color {
        return text;
    }
    match state {
        ConnectionState::Open => text.green().to_string(),
        ConnectionState::Connecting => text.yellow().to_string(),
        ConnectionState::Disconnected => text.red().to_string(),
    }
}

/// Signed money amount, green when positive and red when negative.
pub fn pnl(value: Option<f64>, color: bool) -> String {
    let Some(v) = value else {
        return "-".into();
    };
    let text = format!("{v:+.2}");
    if !color {
        text
    } else if v > 0.0 {
        text.green().to_string()
    } else if v < 0.0 {
        text.red().to_string()
    } else {
        text
    }
}

pub fn number(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v:.precision$}"))
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(Table::new(rows).with(Style::rounded()).to_string())
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a filtered/sorted view. Table output follows the projection's
/// columns; structured formats serialize the underlying rows.
pub fn render_view<T>(
    format: OutputFormat,
    projection: &TableProjection,
    data: &[&T],
    detail_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => {
            let mut out = render_projection(projection);
            let expanded = projection
                .rows
                .iter()
                .zip(data)
                .find_map(|(row, item)| row.expanded.then(|| detail_fn(item)));
            if let Some(detail) = expanded {
                out.push_str("\n\n");
                out.push_str(&detail);
            }
            Ok(out)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(projection
            .rows
            .iter()
            .map(|row| row.key.as_str())
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted string,
/// since single-item detail views don't use `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

/// Key/value detail block for single items.
pub fn render_pairs(pairs: &[(&str, String)]) -> String {
    let mut builder = Builder::default();
    for (key, value) in pairs {
        builder.push_record([(*key).to_owned(), value.clone()]);
    }
    builder.build().with(Style::rounded()).to_string()
}

fn render_projection(projection: &TableProjection) -> String {
    let mut builder = Builder::default();
    builder.push_record(projection.headers.iter().cloned());
    for row in &projection.rows {
        builder.push_record(row.cells.iter().map(|c| cell_text(c.as_ref())));
    }
    builder.build().with(Style::rounded()).to_string()
}

fn cell_text(cell: Option<&CellValue>) -> String {
    match cell {
        None => "-".into(),
        Some(CellValue::Number(n)) if n.fract().abs() < f64::EPSILON => format!("{n:.0}"),
        Some(CellValue::Number(n)) => format!("{n:.4}"),
        Some(CellValue::Boolean(true)) => "yes".into(),
        Some(CellValue::Boolean(false)) => "no".into(),
        Some(CellValue::Text(s)) => s.clone(),
    }
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    out.map_err(|e| CliError::Render(e.to_string()))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}
