//! Record-level metadata: the recipe name, its yield and its sales price.
//!
//! Name resolution is an ordered list of independent strategies; the first
//! one that produces a name wins and a generated placeholder is the last
//! resort.

use crate::config::ExtractionConfig;
use crate::context::{ExpectedMatch, ExpectedNameIndex};
use crate::grid::{Cell, RecordRange, SpreadsheetGrid};
use crate::markers::{Marker, MarkerKind};
use crate::rows::is_metadata_label;
use crate::utils::{is_summary_label, normalize_name, parse_number};
use std::collections::HashSet;

const YIELD_KEYWORDS: &[&str] = &["portion", "yield"];
const SALES_PRICE_KEYWORDS: &[&str] = &["sales price", "selling price", "sale price", "menu price"];

/// Everything a name strategy may look at for one record.
pub struct RecordView<'a> {
    pub grid: &'a SpreadsheetGrid,
    pub range: RecordRange,
    pub marker: &'a Marker,
    /// Absolute row of the ingredient header, when one was found.
    pub header_row: Option<usize>,
    pub config: &'a ExtractionConfig,
    pub expected: Option<&'a ExpectedNameIndex>,
}

impl RecordView<'_> {
    /// Rows above the ingredient table, where recipe metadata lives.
    fn preamble(&self) -> RecordRange {
        let end = self.header_row.unwrap_or(self.range.end);
        RecordRange::new(self.range.start, end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedName {
    pub name: String,
    pub strategy: NameStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStrategy {
    /// Value next to a `NAME` style label cell.
    LabelCell,
    /// Text after the banner phrase, or on the row below the banner.
    BannerFollower,
    /// A name from the expected-recipe index found in the record.
    ExpectedIndex,
}

pub const NAME_STRATEGIES: &[NameStrategy] = &[
    NameStrategy::LabelCell,
    NameStrategy::BannerFollower,
    NameStrategy::ExpectedIndex,
];

impl NameStrategy {
    pub fn try_resolve(self, record: &RecordView<'_>) -> Option<String> {
        let name = match self {
            NameStrategy::LabelCell => from_label_cell(record),
            NameStrategy::BannerFollower => from_banner(record),
            NameStrategy::ExpectedIndex => from_expected_index(record),
        }?;

        let name = name.trim().to_string();
        (!name.is_empty()).then_some(name)
    }
}

/// Runs the strategies in order, falling back to a generated placeholder.
pub fn resolve_name(record: &RecordView<'_>) -> Option<ResolvedName> {
    NAME_STRATEGIES.iter().find_map(|&strategy| {
        strategy
            .try_resolve(record)
            .map(|name| ResolvedName { name, strategy })
    })
}

pub fn placeholder_name(sheet: &str, record_start: usize) -> String {
    format!("{} recipe at row {}", sheet, record_start + 1)
}

fn is_name_label(text: &str, config: &ExtractionConfig) -> bool {
    let key = normalize_name(text);
    !key.is_empty()
        && (key == "recipe name"
            || key == "dish name"
            || key == "recipe"
            || config
                .name_labels
                .iter()
                .any(|label| normalize_name(label) == key))
}

fn from_label_cell(record: &RecordView<'_>) -> Option<String> {
    let grid = record.grid;
    for row in record.preamble().rows() {
        let cells = grid.row(row);
        for (col, cell) in cells.iter().enumerate() {
            let text = cell.as_text();

            // "NAME: Beef Stew" in a single cell
            if let Some((label, value)) = text.split_once(':') {
                if is_name_label(label, record.config) && !value.trim().is_empty() {
                    return Some(value.to_string());
                }
            }

            if is_name_label(&text, record.config) {
                if let Some(value) = next_text_right(cells, col) {
                    return Some(value);
                }
            }
        }
    }
    None
}

fn next_text_right(cells: &[Cell], col: usize) -> Option<String> {
    cells
        .iter()
        .skip(col + 1)
        .find(|c| !c.is_blank())
        .map(Cell::as_text)
}

fn from_banner(record: &RecordView<'_>) -> Option<String> {
    let grid = record.grid;
    let preamble = record.preamble();
    let banner_row = preamble.rows().find(|&row| {
        let text = grid.row_text(row);
        record
            .config
            .banner_phrases
            .iter()
            .any(|p| text.contains(&p.to_lowercase()))
    })?;

    // Same cell after the phrase: "STANDARD RECIPE CARD - Beef Stew".
    // The longest matching phrase wins.
    for cell in grid.row(banner_row) {
        let text = cell.as_text();
        let lower = text.to_lowercase();
        let hit = record
            .config
            .banner_phrases
            .iter()
            .map(|p| p.to_lowercase())
            .filter_map(|p| lower.find(&p).map(|pos| (pos, p.len())))
            .max_by_key(|&(_, len)| len);

        if let Some((pos, len)) = hit {
            let rest = text
                .get(pos + len..)
                .unwrap_or("")
                .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ':' | '|'));
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }

    // Otherwise another cell on the banner row, or the first usable text below it.
    let phrase_cells = |cell: &Cell| {
        let lower = cell.as_text().to_lowercase();
        record
            .config
            .banner_phrases
            .iter()
            .any(|p| lower.contains(&p.to_lowercase()))
    };
    if let Some(other) = grid
        .row(banner_row)
        .iter()
        .find(|c| !c.is_blank() && !phrase_cells(c) && c.as_number().is_none())
    {
        return Some(other.as_text());
    }

    (banner_row + 1..preamble.end)
        .take(3)
        .filter_map(|row| {
            grid.row(row)
                .iter()
                .find(|c| !c.is_blank() && c.as_number().is_none())
                .map(Cell::as_text)
        })
        .find(|text| {
            !is_name_label(text, record.config)
                && !is_metadata_label(text)
                && !is_summary_label(text)
        })
}

fn from_expected_index(record: &RecordView<'_>) -> Option<String> {
    if record.marker.kind == MarkerKind::KnownName {
        if let Some(name) = &record.marker.name {
            return Some(name.clone());
        }
    }

    let index = record.expected?;
    let grid = record.grid;
    let columns = record.config.known_name_columns.max(1);

    let candidates: Vec<String> = record
        .preamble()
        .rows()
        .flat_map(|row| (0..columns).map(move |col| grid.cell(row, col).as_text()))
        .filter(|text| !text.is_empty())
        .collect();

    candidates
        .iter()
        .find_map(|text| index.find_exact(text).or_else(|| index.find_insensitive(text)))
        .or_else(|| {
            candidates
                .iter()
                .filter_map(|text| index.find_fuzzy(text, record.config.name_match_threshold))
                .fold(None, |best: Option<ExpectedMatch>, m| match best {
                    Some(b) if b.score >= m.score => Some(b),
                    _ => Some(m),
                })
        })
        .map(|m| m.name)
}

/// A numeric value attached to a keyword cell, with the unit text that
/// followed it when there was one.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledValue {
    pub value: f64,
    pub unit: Option<String>,
    pub keyword: String,
}

/// Scans the record (skipping ingredient rows) for a cell containing one of
/// `keywords` and returns the number next to it: inside the same cell, to
/// its right within `lookahead` cells, or directly below it.
pub fn find_labelled_value(
    grid: &SpreadsheetGrid,
    range: RecordRange,
    skip_rows: &HashSet<usize>,
    keywords: &[&str],
    lookahead: usize,
) -> Option<LabelledValue> {
    for row in range.rows().filter(|r| !skip_rows.contains(r)) {
        let cells = grid.row(row);
        for (col, cell) in cells.iter().enumerate() {
            let lower = cell.as_text().to_lowercase();
            let Some(keyword) = keywords.iter().find(|k| lower.contains(*k)) else {
                continue;
            };

            if let Some((value, unit)) = number_in_text(&lower, keyword) {
                return Some(LabelledValue {
                    value,
                    unit,
                    keyword: keyword.to_string(),
                });
            }

            for offset in 1..=lookahead {
                let candidate = grid.cell(row, col + offset);
                if let Some(value) = cell_number(candidate) {
                    let unit = grid.cell(row, col + offset + 1);
                    let unit = (!unit.is_blank() && cell_number(unit).is_none())
                        .then(|| unit.as_text());
                    return Some(LabelledValue {
                        value,
                        unit,
                        keyword: keyword.to_string(),
                    });
                }
            }

            if range.contains(row + 1) {
                if let Some(value) = cell_number(grid.cell(row + 1, col)) {
                    return Some(LabelledValue {
                        value,
                        unit: None,
                        keyword: keyword.to_string(),
                    });
                }
            }
        }
    }
    None
}

fn cell_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(_) => cell.as_number(),
        Cell::Text(s) => parse_number(s),
        _ => None,
    }
}

/// "Yield: 10 portions" style cells carry their own number.
fn number_in_text(lower: &str, keyword: &str) -> Option<(f64, Option<String>)> {
    let pos = lower.find(keyword)?;
    let after = &lower[pos + keyword.len()..];
    let mut tokens = after
        .split(|c: char| c.is_whitespace() || c == ':')
        .filter(|t| !t.is_empty());

    let first = tokens.find(|t| t.chars().any(|c| c.is_ascii_digit()))?;
    let value = parse_number(first)?;
    let unit = tokens
        .next()
        .filter(|t| !t.chars().any(|c| c.is_ascii_digit()))
        .map(str::to_string);
    Some((value, unit))
}

/// Yield amount and unit; defaults to one portion.
pub fn find_yield(
    grid: &SpreadsheetGrid,
    range: RecordRange,
    skip_rows: &HashSet<usize>,
    lookahead: usize,
) -> (f64, String) {
    match find_labelled_value(grid, range, skip_rows, YIELD_KEYWORDS, lookahead) {
        Some(found) if found.value > 0.0 => {
            let unit = found.unit.unwrap_or_else(|| {
                if found.keyword == "portion" {
                    "portions".to_string()
                } else {
                    "portion".to_string()
                }
            });
            (found.value, unit)
        }
        _ => (1.0, "portion".to_string()),
    }
}

pub fn find_sales_price(
    grid: &SpreadsheetGrid,
    range: RecordRange,
    skip_rows: &HashSet<usize>,
    lookahead: usize,
) -> f64 {
    find_labelled_value(grid, range, skip_rows, SALES_PRICE_KEYWORDS, lookahead)
        .map(|found| found.value)
        .unwrap_or(0.0)
}
