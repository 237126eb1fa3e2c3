//! Record boundary detection for recipe sheets.
//!
//! Three independent strategies propose rows that look like the start of a
//! recipe: banner phrases, a bare `NAME` label in the first cell, and names
//! from the caller's expected-recipe index. The proposals are merged into
//! non-overlapping [`RecordRange`]s, each capped at `max_record_span` rows.

use crate::config::ExtractionConfig;
use crate::context::ScanContext;
use crate::grid::{RecordRange, SpreadsheetGrid};
use crate::utils::name_key;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    Banner,
    Label,
    KnownName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub row: usize,
    pub kind: MarkerKind,
    /// The expected-index name that produced a `KnownName` marker.
    pub name: Option<String>,
}

/// A record range together with the marker that opened it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedRecord {
    pub range: RecordRange,
    pub marker: Marker,
}

pub struct MarkerDetector<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> MarkerDetector<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn banner_rows(&self, grid: &SpreadsheetGrid) -> Vec<usize> {
        (0..grid.height())
            .filter(|&row| self.is_banner_row(grid, row))
            .collect()
    }

    pub fn is_banner_row(&self, grid: &SpreadsheetGrid, row: usize) -> bool {
        let text = grid.row_text(row);
        !text.is_empty()
            && self
                .config
                .banner_phrases
                .iter()
                .any(|phrase| text.contains(&phrase.to_lowercase()))
    }

    /// Rows whose first cell is exactly one of the configured labels, unless
    /// a banner sits within `banner_proximity` rows.
    pub fn label_rows(&self, grid: &SpreadsheetGrid, banners: &[usize]) -> Vec<usize> {
        (0..grid.height())
            .filter(|&row| {
                let first = grid.cell(row, 0).as_text();
                self.config.name_labels.iter().any(|label| first == *label)
            })
            .filter(|&row| !self.near_any(row, banners))
            .collect()
    }

    /// Locates each not-yet-found expected name in the sheet's leading
    /// columns, exact text first and then case/whitespace-insensitive, and
    /// marks it found.
    pub fn known_name_markers(
        &self,
        grid: &SpreadsheetGrid,
        ctx: &mut ScanContext,
        anchors: &[usize],
    ) -> Vec<Marker> {
        let Some(index) = ctx.expected.as_mut() else {
            return Vec::new();
        };

        let pending: Vec<String> = index
            .names()
            .filter(|name| !index.is_found(name))
            .map(str::to_string)
            .collect();

        let mut markers = Vec::new();
        for name in pending {
            let hit = self
                .scan_for(grid, |text| text == name.trim())
                .or_else(|| {
                    let key = name_key(&name);
                    self.scan_for(grid, |text| name_key(text) == key)
                });

            let Some(row) = hit else { continue };

            index.mark_found(&name);
            if self.near_any(row, anchors) {
                debug!(
                    "Sheet '{}': expected name '{}' at row {} belongs to an existing marker",
                    grid.name, name, row
                );
                continue;
            }

            markers.push(Marker {
                row,
                kind: MarkerKind::KnownName,
                name: Some(name),
            });
        }
        markers
    }

    /// Rows of an ingredient or stock table: several filled cells, at least
    /// one of them numeric. A sub-recipe used as an ingredient sits on such a
    /// row and must not open a record of its own.
    fn is_table_row(grid: &SpreadsheetGrid, row: usize) -> bool {
        grid.non_blank_count(row) >= 3
            && grid.row(row).iter().any(|cell| cell.as_number().is_some())
    }

    fn scan_for(&self, grid: &SpreadsheetGrid, matches: impl Fn(&str) -> bool) -> Option<usize> {
        (0..grid.height()).find(|&row| {
            !Self::is_table_row(grid, row)
                && (0..self.config.known_name_columns).any(|col| {
                    let text = grid.cell(row, col).as_text();
                    !text.is_empty() && matches(&text)
                })
        })
    }

    fn near_any(&self, row: usize, anchors: &[usize]) -> bool {
        anchors
            .iter()
            .any(|&anchor| row.abs_diff(anchor) <= self.config.banner_proximity)
    }

    /// All markers in the sheet, sorted by row, one per row. On a shared row
    /// the earlier strategy wins (banner, then label, then known name).
    pub fn detect(&self, grid: &SpreadsheetGrid, ctx: &mut ScanContext) -> Vec<Marker> {
        let banners = self.banner_rows(grid);
        let labels = self.label_rows(grid, &banners);

        let mut anchors: Vec<usize> = banners.iter().chain(labels.iter()).copied().collect();
        anchors.sort_unstable();

        let mut markers: Vec<Marker> = banners
            .iter()
            .map(|&row| Marker {
                row,
                kind: MarkerKind::Banner,
                name: None,
            })
            .chain(labels.iter().map(|&row| Marker {
                row,
                kind: MarkerKind::Label,
                name: None,
            }))
            .collect();
        markers.extend(self.known_name_markers(grid, ctx, &anchors));

        // Stable sort keeps strategy order within a row for the dedup below.
        markers.sort_by_key(|m| m.row);
        markers.dedup_by_key(|m| m.row);

        debug!(
            "Sheet '{}': {} markers ({} banner, {} label)",
            grid.name,
            markers.len(),
            banners.len(),
            labels.len()
        );
        markers
    }

    /// Turns sorted markers into ranges ending at the next marker or the end
    /// of the sheet, truncated to `max_record_span` rows.
    pub fn to_records(&self, grid: &SpreadsheetGrid, markers: Vec<Marker>) -> Vec<DetectedRecord> {
        let starts: Vec<usize> = markers.iter().map(|m| m.row).collect();

        markers
            .into_iter()
            .enumerate()
            .map(|(i, marker)| {
                let next = starts.get(i + 1).copied().unwrap_or(grid.height());
                let end = next.min(marker.row + self.config.max_record_span);
                DetectedRecord {
                    range: RecordRange::new(marker.row, end),
                    marker,
                }
            })
            .collect()
    }

    pub fn detect_records(
        &self,
        grid: &SpreadsheetGrid,
        ctx: &mut ScanContext,
    ) -> Vec<DetectedRecord> {
        let markers = self.detect(grid, ctx);
        self.to_records(grid, markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExpectedNameIndex;

    fn grid(rows: Vec<Vec<&str>>) -> SpreadsheetGrid {
        SpreadsheetGrid::from_text_rows("Mains", rows)
    }

    fn filler(n: usize) -> Vec<Vec<&'static str>> {
        (0..n).map(|_| vec!["", "x"]).collect()
    }

    #[test]
    fn test_banner_and_label_markers() {
        let mut rows = vec![vec!["STANDARD RECIPE CARD"], vec!["NAME", "Beef Stew"]];
        rows.extend(filler(10));
        rows.push(vec!["NAME", "Fish Pie"]);
        rows.extend(filler(3));

        let g = grid(rows);
        let config = ExtractionConfig::default();
        let detector = MarkerDetector::new(&config);
        let mut ctx = ScanContext::new(None);

        let markers = detector.detect(&g, &mut ctx);
        let rows: Vec<usize> = markers.iter().map(|m| m.row).collect();
        // the NAME label right under the banner is part of the banner's record
        assert_eq!(rows, vec![0, 12]);
        assert_eq!(markers[0].kind, MarkerKind::Banner);
        assert_eq!(markers[1].kind, MarkerKind::Label);
    }

    #[test]
    fn test_label_match_is_exact() {
        let g = grid(vec![vec!["Name:", "Soup"], vec!["NAMES"], vec![" NAME ", "Pie"]]);
        let config = ExtractionConfig::default();
        let detector = MarkerDetector::new(&config);
        assert_eq!(detector.label_rows(&g, &[]), vec![2]);
    }

    #[test]
    fn test_ranges_end_at_next_marker() {
        let mut rows = vec![vec!["NAME", "A"]];
        rows.extend(filler(4));
        rows.push(vec!["NAME", "B"]);
        rows.extend(filler(2));

        let g = grid(rows);
        let config = ExtractionConfig {
            banner_proximity: 0,
            ..Default::default()
        };
        let detector = MarkerDetector::new(&config);
        let records = detector.detect_records(&g, &mut ScanContext::new(None));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].range, RecordRange::new(0, 5));
        assert_eq!(records[1].range, RecordRange::new(5, 8));
    }

    #[test]
    fn test_oversize_range_is_truncated() {
        let mut rows = vec![vec!["NAME", "A"]];
        rows.extend(filler(80));
        rows.push(vec!["NAME", "B"]);
        rows.extend(filler(2));

        let g = grid(rows);
        let config = ExtractionConfig::default();
        let detector = MarkerDetector::new(&config);
        let records = detector.detect_records(&g, &mut ScanContext::new(None));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].range, RecordRange::new(0, 50));
        // the next record still starts at its own marker
        assert_eq!(records[1].range.start, 81);
        assert!(records[0].range.end <= records[1].range.start);
    }

    #[test]
    fn test_known_name_markers() {
        let mut rows = filler(2);
        rows.push(vec!["", "beef  STEW"]);
        rows.extend(filler(8));
        rows.push(vec!["Fish Pie"]);
        rows.extend(filler(2));

        let g = grid(rows);
        let mut index = ExpectedNameIndex::new();
        index.insert("Beef Stew", "Mains");
        index.insert("Fish Pie", "Mains");
        index.insert("Lemon Tart", "Desserts");
        let mut ctx = ScanContext::new(Some(index));

        let config = ExtractionConfig::default();
        let detector = MarkerDetector::new(&config);
        let markers = detector.detect(&g, &mut ctx);

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].row, 2);
        assert_eq!(markers[0].name.as_deref(), Some("Beef Stew"));
        assert_eq!(markers[1].row, 11);

        let index = ctx.into_expected().unwrap();
        assert_eq!(index.unfound_names(), vec!["Lemon Tart".to_string()]);
    }

    #[test]
    fn test_known_name_near_anchor_is_suppressed() {
        let mut rows = vec![vec!["STANDARD RECIPE CARD"], vec![""], vec!["Fish Pie"]];
        rows.extend(filler(3));

        let g = grid(rows);
        let mut index = ExpectedNameIndex::new();
        index.insert("Fish Pie", "Seafood");
        let mut ctx = ScanContext::new(Some(index));

        let config = ExtractionConfig::default();
        let detector = MarkerDetector::new(&config);
        let markers = detector.detect(&g, &mut ctx);

        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].kind, MarkerKind::Banner);
        // the name is consumed by the banner's record
        assert!(ctx.into_expected().unwrap().is_found("Fish Pie"));
    }

    #[test]
    fn test_known_name_in_ingredient_table_is_ignored() {
        let mut rows = vec![
            vec!["STANDARD RECIPE CARD"],
            vec!["NAME", "Lasagne"],
            vec!["Code", "Ingredient", "Unit", "Qty"],
        ];
        rows.extend(filler(6));
        rows.push(vec!["3001", "Tomato Sauce", "l", "0.5"]);
        rows.extend(filler(2));

        let g = grid(rows);
        let mut index = ExpectedNameIndex::new();
        index.insert("Tomato Sauce", "Sauces");
        let mut ctx = ScanContext::new(Some(index));

        let config = ExtractionConfig::default();
        let detector = MarkerDetector::new(&config);
        let records = detector.detect_records(&g, &mut ctx);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].range, RecordRange::new(0, 12));
        assert_eq!(
            ctx.into_expected().unwrap().unfound_names(),
            vec!["Tomato Sauce".to_string()]
        );
    }

    #[test]
    fn test_found_names_are_not_rescanned() {
        let g = grid(vec![vec!["Fish Pie"], vec!["", "x"]]);
        let mut index = ExpectedNameIndex::new();
        index.insert("Fish Pie", "Mains");
        index.mark_found("Fish Pie");

        let config = ExtractionConfig::default();
        let detector = MarkerDetector::new(&config);
        let markers = detector.detect(&g, &mut ScanContext::new(Some(index)));
        assert!(markers.is_empty());
    }

    #[test]
    fn test_no_index_means_no_known_name_markers() {
        let g = grid(vec![vec!["Fish Pie"]]);
        let config = ExtractionConfig::default();
        let detector = MarkerDetector::new(&config);
        assert!(detector.detect(&g, &mut ScanContext::new(None)).is_empty());
    }
}
