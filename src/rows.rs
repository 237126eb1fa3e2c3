use crate::columns::{CanonicalField, FieldMapping};
use crate::config::LossConvention;
use crate::grid::Cell;
use crate::schema::IngredientLine;
use crate::utils::{coerce_date, coerce_number, is_summary_label, normalize_name};
use chrono::NaiveDate;

/// Labels of recipe-level metadata rows that can land in the name column.
const METADATA_LABELS: &[&str] = &[
    "portion",
    "portions",
    "yield",
    "sales price",
    "selling price",
    "sale price",
    "menu price",
    "cost percentage",
    "food cost",
];

/// Turns raw rows into typed fields under one [`FieldMapping`]. Coercion never
/// fails: unreadable cells fall back to zero or the empty string.
pub struct RowParser<'a> {
    mapping: &'a FieldMapping,
    loss_convention: LossConvention,
    default_unit: &'a str,
}

impl<'a> RowParser<'a> {
    pub fn new(
        mapping: &'a FieldMapping,
        loss_convention: LossConvention,
        default_unit: &'a str,
    ) -> Self {
        Self {
            mapping,
            loss_convention,
            default_unit,
        }
    }

    fn cell<'r>(&self, row: &'r [Cell], field: CanonicalField) -> Option<&'r Cell> {
        self.mapping.get(field).and_then(|col| row.get(col))
    }

    pub fn text(&self, row: &[Cell], field: CanonicalField) -> String {
        self.cell(row, field).map(Cell::as_text).unwrap_or_default()
    }

    pub fn number(&self, row: &[Cell], field: CanonicalField) -> f64 {
        self.cell(row, field).map(coerce_number).unwrap_or(0.0)
    }

    pub fn date(&self, row: &[Cell], field: CanonicalField) -> Option<NaiveDate> {
        self.cell(row, field).and_then(coerce_date)
    }

    pub fn unit(&self, row: &[Cell]) -> String {
        let unit = self.text(row, CanonicalField::Unit);
        if unit.is_empty() {
            self.default_unit.to_string()
        } else {
            unit
        }
    }

    /// Parses one ingredient row. `None` when the row has no name, or is a
    /// subtotal or recipe-metadata row rather than an ingredient.
    pub fn parse_ingredient(&self, row: &[Cell]) -> Option<IngredientLine> {
        let name = self.text(row, CanonicalField::Name);
        if name.is_empty() || is_summary_label(&name) || is_metadata_label(&name) {
            return None;
        }

        let mut line = IngredientLine {
            item_code: self.text(row, CanonicalField::ItemCode),
            name,
            unit: self.unit(row),
            qty: self.number(row, CanonicalField::Qty),
            loss: normalize_loss(self.number(row, CanonicalField::Loss)),
            net_qty: self.number(row, CanonicalField::NetQty),
            unit_cost: self.number(row, CanonicalField::UnitCost),
            total_cost: self.number(row, CanonicalField::TotalCost),
        };

        self.derive_fields(&mut line);
        Some(line)
    }

    /// Fills `net_qty`, `total_cost` and `unit_cost` when the sheet left them out.
    pub fn derive_fields(&self, line: &mut IngredientLine) {
        if line.net_qty == 0.0 && line.qty > 0.0 {
            line.net_qty = self.loss_convention.apply(line.qty, line.loss);
        }

        if line.total_cost == 0.0 && line.unit_cost > 0.0 {
            line.total_cost = line.unit_cost * line.effective_qty();
        }

        if line.unit_cost == 0.0 && line.total_cost > 0.0 && line.effective_qty() > 0.0 {
            line.unit_cost = line.total_cost / line.effective_qty();
        }
    }
}

/// Loss written as a percentage (`10` or `"10%"`) becomes a fraction.
/// Values up to 1 are already fractions, so `"0.5%"` and `1` read as 50% and
/// 100%: the percent sign is gone by the time the value gets here.
pub fn normalize_loss(loss: f64) -> f64 {
    if loss > 1.0 {
        (loss / 100.0).min(1.0)
    } else {
        loss.max(0.0)
    }
}

pub fn is_metadata_label(text: &str) -> bool {
    let key = normalize_name(text);
    METADATA_LABELS
        .iter()
        .any(|label| key == *label || key.starts_with(&format!("{label} ")))
}
