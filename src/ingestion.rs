//! Sheet and workbook extraction: recipe cards, stock lists and sales
//! registers turned into entity records.
//!
//! Every per-sheet or per-record problem is recorded as a [`SheetWarning`]
//! and processing carries on with the next record or sheet. The only hard
//! failure is a workbook with nothing readable in it.

use crate::columns::{CanonicalField, ColumnProfile, FieldMapping, HeaderMatch, MappingOverride};
use crate::config::ExtractionConfig;
use crate::context::{ExpectedNameIndex, ScanContext};
use crate::error::{CostingError, Result};
use crate::grid::{Cell, RecordRange, SpreadsheetGrid, Workbook};
use crate::markers::{DetectedRecord, MarkerDetector};
use crate::resolve::{find_sales_price, find_yield, placeholder_name, resolve_name, RecordView};
use crate::rows::RowParser;
use crate::schema::{
    ExtractedInventoryItem, ExtractedRecipe, ExtractedSalesRecord, IngredientLine,
};
use crate::utils::is_summary_label;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// The sheet name marks a summary or index sheet.
    SkippedSheet,
    EmptySheet,
    NoMarkers,
    NoHeaderRow { record_start: usize },
    NoNameColumn { record_start: usize },
    NoIngredients { record_start: usize },
    DuplicateRecipe { name: String, record_start: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetWarning {
    pub sheet: String,
    #[serde(flatten)]
    pub kind: WarningKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub sheets_processed: usize,
    pub sheets_skipped: usize,
    pub records_seen: usize,
    pub records_skipped: usize,
    pub duplicates_dropped: usize,
    pub rows_skipped: usize,
}

/// Output of one extraction run. `expected` hands the index back with its
/// found flags updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport<T> {
    pub items: Vec<T>,
    pub warnings: Vec<SheetWarning>,
    pub expected: Option<ExpectedNameIndex>,
    pub stats: ExtractionStats,
}

impl<T> Default for ExtractionReport<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            warnings: Vec::new(),
            expected: None,
            stats: ExtractionStats::default(),
        }
    }
}

impl<T> ExtractionReport<T> {
    fn warn(&mut self, sheet: &str, kind: WarningKind) {
        debug!("Sheet '{}': {:?}", sheet, kind);
        self.warnings.push(SheetWarning {
            sheet: sheet.to_string(),
            kind,
        });
    }

    fn skip_sheet(&mut self, sheet: &str, kind: WarningKind) {
        self.stats.sheets_skipped += 1;
        self.warn(sheet, kind);
    }

    fn skip_record(&mut self, sheet: &str, kind: WarningKind) {
        self.stats.records_skipped += 1;
        self.warn(sheet, kind);
    }

    pub fn warnings_for(&self, sheet: &str) -> impl Iterator<Item = &SheetWarning> {
        let sheet = sheet.to_string();
        self.warnings.iter().filter(move |w| w.sheet == sheet)
    }
}

/// Per-run inputs besides the grids themselves.
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    pub config: ExtractionConfig,
    pub expected: Option<ExpectedNameIndex>,
    /// Column mappings supplied from outside, keyed by sheet name. Used when
    /// the header heuristics come up empty.
    pub mapping_overrides: BTreeMap<String, MappingOverride>,
    pub imported_at: DateTime<Utc>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            config: ExtractionConfig::default(),
            expected: None,
            mapping_overrides: BTreeMap::new(),
            imported_at: Utc::now(),
        }
    }
}

impl ExtractionOptions {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn with_expected(mut self, expected: ExpectedNameIndex) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn with_mapping_override(
        mut self,
        sheet: impl Into<String>,
        mapping: MappingOverride,
    ) -> Self {
        self.mapping_overrides.insert(sheet.into(), mapping);
        self
    }

    pub fn with_imported_at(mut self, imported_at: DateTime<Utc>) -> Self {
        self.imported_at = imported_at;
        self
    }

    /// Header match built from the sheet's override, with the offset taken
    /// from `range.start`.
    fn override_for(&self, sheet: &str, range: RecordRange) -> Option<HeaderMatch> {
        let supplied = self.mapping_overrides.get(sheet)?;
        let row = range.start + supplied.header_offset;
        (range.contains(row) && supplied.mapping.has_name()).then(|| HeaderMatch {
            row,
            mapping: supplied.mapping.clone(),
        })
    }

    /// Heuristic header first, then the override. The error is the warning
    /// explaining why neither produced a usable mapping.
    fn resolve_header(
        &self,
        profile: &ColumnProfile,
        grid: &SpreadsheetGrid,
        range: RecordRange,
    ) -> std::result::Result<HeaderMatch, WarningKind> {
        let detected = profile.locate(grid, range);
        match detected {
            Some(header) if header.mapping.has_name() => Ok(header),
            detected => self.override_for(&grid.name, range).ok_or(match detected {
                Some(_) => WarningKind::NoNameColumn {
                    record_start: range.start,
                },
                None => WarningKind::NoHeaderRow {
                    record_start: range.start,
                },
            }),
        }
    }
}

pub struct RecipeExtractor<'a> {
    options: &'a ExtractionOptions,
    profile: ColumnProfile,
}

impl<'a> RecipeExtractor<'a> {
    pub fn new(options: &'a ExtractionOptions) -> Self {
        Self {
            options,
            profile: ColumnProfile::recipe(),
        }
    }

    fn config(&self) -> &ExtractionConfig {
        &self.options.config
    }

    /// Extracts every recipe record of one sheet into `report`. Never fails;
    /// problems become warnings.
    pub fn extract_sheet(
        &self,
        grid: &SpreadsheetGrid,
        ctx: &mut ScanContext,
        report: &mut ExtractionReport<ExtractedRecipe>,
    ) {
        if self.config().is_skipped_sheet(&grid.name) {
            report.skip_sheet(&grid.name, WarningKind::SkippedSheet);
            return;
        }
        if grid.is_blank() {
            report.skip_sheet(&grid.name, WarningKind::EmptySheet);
            return;
        }

        let records = MarkerDetector::new(self.config()).detect_records(grid, ctx);
        if records.is_empty() {
            report.skip_sheet(&grid.name, WarningKind::NoMarkers);
            return;
        }

        report.stats.sheets_processed += 1;
        for record in &records {
            report.stats.records_seen += 1;
            if let Some(recipe) = self.build_recipe(grid, record, ctx, report) {
                debug!(
                    "Sheet '{}': recipe '{}' with {} ingredients",
                    grid.name,
                    recipe.name,
                    recipe.ingredients.len()
                );
                report.items.push(recipe);
            }
        }
    }

    fn build_recipe(
        &self,
        grid: &SpreadsheetGrid,
        record: &DetectedRecord,
        ctx: &mut ScanContext,
        report: &mut ExtractionReport<ExtractedRecipe>,
    ) -> Option<ExtractedRecipe> {
        let range = record.range;
        let header = match self.options.resolve_header(&self.profile, grid, range) {
            Ok(header) => header,
            Err(kind) => {
                report.skip_record(&grid.name, kind);
                return None;
            }
        };

        let config = self.config();
        let parser = RowParser::new(&header.mapping, config.loss_convention, &config.default_unit);

        let mut table_rows: HashSet<usize> = HashSet::from([header.row]);
        let mut ingredients: Vec<IngredientLine> = Vec::new();
        for row in (header.row + 1)..range.end {
            if grid.is_blank_row(row) {
                continue;
            }
            match parser.parse_ingredient(grid.row(row)) {
                Some(line) => {
                    table_rows.insert(row);
                    ingredients.push(line);
                }
                None => report.stats.rows_skipped += 1,
            }
        }

        if ingredients.is_empty() {
            report.skip_record(
                &grid.name,
                WarningKind::NoIngredients {
                    record_start: range.start,
                },
            );
            return None;
        }

        let view = RecordView {
            grid,
            range,
            marker: &record.marker,
            header_row: Some(header.row),
            config,
            expected: ctx.expected.as_ref(),
        };
        let name = resolve_name(&view)
            .map(|resolved| resolved.name)
            .unwrap_or_else(|| placeholder_name(&grid.name, range.start));

        if !ctx.claim_name(&name) {
            report.stats.duplicates_dropped += 1;
            report.warn(
                &grid.name,
                WarningKind::DuplicateRecipe {
                    name,
                    record_start: range.start,
                },
            );
            return None;
        }

        let category = self.category_for(&name, ctx).unwrap_or_else(|| grid.name.clone());
        let (yield_amount, yield_unit) =
            find_yield(grid, range, &table_rows, config.metadata_lookahead);
        let sales_price = find_sales_price(grid, range, &table_rows, config.metadata_lookahead);

        let mut recipe = ExtractedRecipe {
            name,
            category,
            yield_amount,
            yield_unit,
            ingredients,
            total_cost: 0.0,
            sales_price,
            cost_percentage: 0.0,
            manual_cost_override: false,
            imported_at: self.options.imported_at,
        };
        recipe.recompute_totals();
        Some(recipe)
    }

    /// Category from the expected index, marking the entry found.
    fn category_for(&self, name: &str, ctx: &mut ScanContext) -> Option<String> {
        let index = ctx.expected.as_mut()?;
        let hit = index.lookup(name, self.config().name_match_threshold)?;
        index.mark_found(&hit.name);
        (!hit.category.trim().is_empty()).then_some(hit.category)
    }
}

/// Shared loop for flat sheets: one header row, then data rows with
/// single-cell rows acting as running category headers.
fn extract_table<T>(
    grid: &SpreadsheetGrid,
    options: &ExtractionOptions,
    profile: &ColumnProfile,
    report: &mut ExtractionReport<T>,
    build: impl Fn(&RowParser<'_>, &[Cell], &str) -> Option<T>,
) {
    let config = &options.config;
    if config.is_skipped_sheet(&grid.name) {
        report.skip_sheet(&grid.name, WarningKind::SkippedSheet);
        return;
    }
    if grid.is_blank() {
        report.skip_sheet(&grid.name, WarningKind::EmptySheet);
        return;
    }

    let header = match options.resolve_header(profile, grid, grid.full_range()) {
        Ok(header) => header,
        Err(kind) => {
            report.skip_sheet(&grid.name, kind);
            return;
        }
    };

    report.stats.sheets_processed += 1;
    let parser = RowParser::new(&header.mapping, config.loss_convention, &config.default_unit);

    let mut category = String::new();
    for row in (header.row + 1)..grid.height() {
        match grid.non_blank_count(row) {
            0 => continue,
            1 => {
                let text = grid
                    .row(row)
                    .iter()
                    .find(|c| !c.is_blank())
                    .map(Cell::as_text)
                    .unwrap_or_default();
                if !is_summary_label(&text) {
                    debug!("Sheet '{}': category '{}' from row {}", grid.name, text, row);
                    category = text;
                }
                continue;
            }
            _ => {}
        }

        report.stats.records_seen += 1;
        match build(&parser, grid.row(row), &category) {
            Some(item) => report.items.push(item),
            None => report.stats.rows_skipped += 1,
        }
    }
}

fn identity_name(parser: &RowParser<'_>, row: &[Cell]) -> Option<String> {
    let name = parser.text(row, CanonicalField::Name);
    (!name.is_empty() && !is_summary_label(&name)).then_some(name)
}

fn row_category(parser: &RowParser<'_>, row: &[Cell], running: &str) -> String {
    let own = parser.text(row, CanonicalField::Category);
    if own.is_empty() {
        running.to_string()
    } else {
        own
    }
}

pub fn extract_inventory_sheet(
    grid: &SpreadsheetGrid,
    options: &ExtractionOptions,
    report: &mut ExtractionReport<ExtractedInventoryItem>,
) {
    extract_table(
        grid,
        options,
        &ColumnProfile::inventory(),
        report,
        |parser, row, category| {
            let name = identity_name(parser, row)?;
            Some(ExtractedInventoryItem {
                item_code: parser.text(row, CanonicalField::ItemCode),
                name,
                category: row_category(parser, row, category),
                unit: parser.unit(row),
                price: parser.number(row, CanonicalField::Price),
                stock_level: parser.number(row, CanonicalField::StockLevel),
            })
        },
    );
}

pub fn extract_sales_sheet(
    grid: &SpreadsheetGrid,
    options: &ExtractionOptions,
    report: &mut ExtractionReport<ExtractedSalesRecord>,
) {
    extract_table(
        grid,
        options,
        &ColumnProfile::sales(),
        report,
        |parser, row, category| {
            let item_name = identity_name(parser, row)?;
            Some(ExtractedSalesRecord {
                date: parser.date(row, CanonicalField::Date),
                item_code: parser.text(row, CanonicalField::ItemCode),
                item_name,
                category: row_category(parser, row, category),
                quantity: parser.number(row, CanonicalField::Quantity),
                revenue: parser.number(row, CanonicalField::Revenue),
                cost: parser.number(row, CanonicalField::Cost),
            })
        },
    );
}

fn check_workbook(workbook: &Workbook, options: &ExtractionOptions) -> Result<()> {
    options.config.validate()?;
    if workbook.is_unreadable() {
        return Err(CostingError::EmptyWorkbook);
    }
    Ok(())
}

fn log_report<T>(kind: &str, report: &ExtractionReport<T>) {
    info!(
        "Extracted {} {} from {} sheets ({} skipped, {} warnings)",
        report.items.len(),
        kind,
        report.stats.sheets_processed,
        report.stats.sheets_skipped,
        report.warnings.len()
    );
}

/// Extracts recipes from every sheet. Names are deduplicated across the
/// whole workbook, first occurrence in sheet order winning.
pub fn extract_recipes(
    workbook: &Workbook,
    options: &ExtractionOptions,
) -> Result<ExtractionReport<ExtractedRecipe>> {
    check_workbook(workbook, options)?;

    let extractor = RecipeExtractor::new(options);
    let mut ctx = ScanContext::new(options.expected.clone());
    let mut report = ExtractionReport::default();

    for grid in &workbook.sheets {
        extractor.extract_sheet(grid, &mut ctx, &mut report);
    }

    report.expected = ctx.into_expected();
    log_report("recipes", &report);
    Ok(report)
}

pub fn extract_inventory(
    workbook: &Workbook,
    options: &ExtractionOptions,
) -> Result<ExtractionReport<ExtractedInventoryItem>> {
    check_workbook(workbook, options)?;

    let mut report = ExtractionReport::default();
    for grid in &workbook.sheets {
        extract_inventory_sheet(grid, options, &mut report);
    }
    log_report("inventory items", &report);
    Ok(report)
}

pub fn extract_sales(
    workbook: &Workbook,
    options: &ExtractionOptions,
) -> Result<ExtractionReport<ExtractedSalesRecord>> {
    check_workbook(workbook, options)?;

    let mut report = ExtractionReport::default();
    for grid in &workbook.sheets {
        extract_sales_sheet(grid, options, &mut report);
    }
    log_report("sales records", &report);
    Ok(report)
}

/// Single-sheet convenience wrapper around [`RecipeExtractor`].
pub fn extract_recipe_sheet(
    grid: &SpreadsheetGrid,
    options: &ExtractionOptions,
) -> ExtractionReport<ExtractedRecipe> {
    let mut ctx = ScanContext::new(options.expected.clone());
    let mut report = ExtractionReport::default();
    RecipeExtractor::new(options).extract_sheet(grid, &mut ctx, &mut report);
    report.expected = ctx.into_expected();
    report
}

/// The field mapping the heuristics would pick for a sheet's first header
/// row, if any. Handy when preparing a [`MappingOverride`].
pub fn detect_mapping(grid: &SpreadsheetGrid, profile: &ColumnProfile) -> Option<FieldMapping> {
    profile.locate(grid, grid.full_range()).map(|h| h.mapping)
}
