use crate::grid::Cell;
use chrono::{Days, NaiveDate};
use std::collections::HashSet;

/// Flat bonus added when one normalized string contains the other.
pub const SUBSTRING_BONUS: f64 = 0.3;

/// Canonical form used for name comparison: lowercase, only letters, digits
/// and single spaces.
pub fn normalize_name(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c.is_whitespace() {
                Some(' ')
            } else {
                None
            }
        })
        .collect();

    collapse_whitespace(&cleaned)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key used for first-wins deduplication: case and whitespace insensitive,
/// punctuation preserved.
pub fn name_key(text: &str) -> String {
    collapse_whitespace(&text.to_lowercase())
}

/// Token-set Jaccard similarity with a substring bonus, bounded to `[0, 1]`.
///
/// Both inputs are normalized first, so the score is symmetric and does not
/// depend on case, punctuation or spacing.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);
    similarity_normalized(&a, &b)
}

/// Same as [`similarity`] for inputs that are already normalized.
pub fn similarity_normalized(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();

    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let intersection = left.intersection(&right).count() as f64;
    let union = left.union(&right).count() as f64;
    let mut score = intersection / union;

    if a.contains(b) || b.contains(a) {
        score += SUBSTRING_BONUS;
    }

    score.min(1.0)
}

/// Pulls the digits and decimal points out of free text and parses them.
/// `"$12.50/kg"` becomes `12.5`; text with no digits, or with more than one
/// decimal point, yields `None`.
pub fn parse_number(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    digits.parse::<f64>().ok()
}

/// Numeric coercion for a mapped field: native numbers pass through, text is
/// cleaned with [`parse_number`], anything else is zero.
pub fn coerce_number(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) if n.is_finite() => *n,
        Cell::Text(s) => parse_number(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Best-effort date coercion. Native numbers are spreadsheet serial dates
/// (day 0 = 1899-12-30); text is tried against common day-first and ISO
/// layouts.
pub fn coerce_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Number(n) if n.is_finite() && *n >= 1.0 => {
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
            epoch.checked_add_days(Days::new(n.trunc() as u64))
        }
        Cell::Text(s) => parse_date_text(s),
        _ => None,
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d", "%d-%m-%Y", "%d %b %Y", "%d %B %Y",
];

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    // Loaders sometimes hand over "2024-03-01 00:00:00".
    let date_part = text.split(['T', ' ']).next().unwrap_or(text);

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        })
}

/// Rows labelled like these are subtotals, never ingredients or stock items.
pub fn is_summary_label(text: &str) -> bool {
    let key = normalize_name(text);
    key == "total"
        || key.starts_with("total ")
        || key.starts_with("subtotal")
        || key.starts_with("sub total")
        || key.starts_with("grand total")
}
