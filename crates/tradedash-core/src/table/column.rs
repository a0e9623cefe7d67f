// ── Columns and typed comparison ──
//
// Each column declares a kind; the kind picks the comparator. Cells that do
// not match their column's kind (or NaN numbers) are treated as null.

use std::cmp::Ordering;
use std::fmt;

use strum::{Display, EnumString};

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ColumnKind {
    Text,
    Number,
    Boolean,
}

/// Comparator for two non-null cells of one kind.
pub type Comparator = fn(&CellValue, &CellValue) -> Ordering;

impl ColumnKind {
    /// The comparator table.
    pub fn comparator(self) -> Comparator {
        match self {
            Self::Text => compare_text,
            Self::Number => compare_number,
            Self::Boolean => compare_boolean,
        }
    }

    /// Keep `cell` only if it is a usable value of this kind.
    pub fn normalize(self, cell: Option<CellValue>) -> Option<CellValue> {
        match (self, cell?) {
            (Self::Text, v @ CellValue::Text(_)) | (Self::Boolean, v @ CellValue::Boolean(_)) => Some(v),
            (Self::Number, CellValue::Number(n)) if !n.is_nan() => Some(CellValue::Number(n)),
            _ => None,
        }
    }
}

/// One typed table cell. Null is represented as `Option::None`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Case-folded comparison; for strings equal under folding, lowercase sorts
/// before uppercase.
fn compare_text(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Text(a), CellValue::Text(b)) => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| b.cmp(a)),
        _ => Ordering::Equal,
    }
}

fn compare_number(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
        _ => Ordering::Equal,
    }
}

fn compare_boolean(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Boolean(a), CellValue::Boolean(b)) => u8::from(*a).cmp(&u8::from(*b)),
        _ => Ordering::Equal,
    }
}

// ── Column ───────────────────────────────────────────────────────

/// Declarative column: field key, display label, kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub key: String,
    pub label: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
        }
    }

    pub fn text(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, ColumnKind::Text)
    }

    pub fn number(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, ColumnKind::Number)
    }

    pub fn boolean(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, ColumnKind::Boolean)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn text_ignores_case_then_prefers_lowercase() {
        let cmp = ColumnKind::Text.comparator();
        assert_eq!(cmp(&"apple".into(), &"Banana".into()), Ordering::Less);
        assert_eq!(cmp(&"eth".into(), &"ETH".into()), Ordering::Less);
        assert_eq!(cmp(&"SOL".into(), &"sol".into()), Ordering::Greater);
    }

    #[test]
    fn booleans_compare_as_zero_and_one() {
        let cmp = ColumnKind::Boolean.comparator();
        assert_eq!(cmp(&false.into(), &true.into()), Ordering::Less);
        assert_eq!(cmp(&true.into(), &true.into()), Ordering::Equal);
    }

    #[test]
    fn numbers_compare_numerically() {
        let cmp = ColumnKind::Number.comparator();
        assert_eq!(cmp(&(-1.5).into(), &2.0.into()), Ordering::Less);
        assert_eq!(cmp(&10.0.into(), &9.0.into()), Ordering::Greater);
    }

    #[test]
    fn mismatched_and_nan_cells_become_null() {
        assert_eq!(ColumnKind::Number.normalize(Some("12".into())), None);
        assert_eq!(ColumnKind::Number.normalize(Some(f64::NAN.into())), None);
        assert_eq!(ColumnKind::Boolean.normalize(Some(1.0.into())), None);
        assert_eq!(ColumnKind::Text.normalize(Some("x".into())), Some("x".into()));
        assert_eq!(ColumnKind::Text.normalize(None), None);
    }

    #[test]
    fn kind_parses_from_name() {
        assert_eq!("Number".parse::<ColumnKind>().unwrap(), ColumnKind::Number);
        assert_eq!(ColumnKind::Boolean.to_string(), "boolean");
    }
}
