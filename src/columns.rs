use crate::error::Result;
use crate::grid::{RecordRange, SpreadsheetGrid};
use crate::utils::collapse_whitespace;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    ItemCode,
    Name,
    Category,
    Unit,
    Qty,
    Loss,
    NetQty,
    UnitCost,
    TotalCost,
    Price,
    StockLevel,
    Date,
    Quantity,
    Revenue,
    Cost,
}

/// Zero-based column for each canonical field, `None` when the header row
/// has no column for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FieldMapping {
    #[schemars(description = "Column holding the item/article code")]
    pub item_code: Option<usize>,
    #[schemars(description = "Column holding the ingredient, item or menu item name (required)")]
    pub name: Option<usize>,
    #[schemars(description = "Column holding a category or group name")]
    pub category: Option<usize>,
    #[schemars(description = "Column holding the unit of measure")]
    pub unit: Option<usize>,
    #[schemars(description = "Column holding the gross recipe quantity")]
    pub qty: Option<usize>,
    #[schemars(description = "Column holding the preparation loss (fraction or percent)")]
    pub loss: Option<usize>,
    #[schemars(description = "Column holding the net quantity after loss")]
    pub net_qty: Option<usize>,
    #[schemars(description = "Column holding the cost per unit")]
    pub unit_cost: Option<usize>,
    #[schemars(description = "Column holding the line total cost")]
    pub total_cost: Option<usize>,
    #[schemars(description = "Column holding the inventory purchase price")]
    pub price: Option<usize>,
    #[schemars(description = "Column holding the stock on hand")]
    pub stock_level: Option<usize>,
    #[schemars(description = "Column holding the sale date")]
    pub date: Option<usize>,
    #[schemars(description = "Column holding the quantity sold")]
    pub quantity: Option<usize>,
    #[schemars(description = "Column holding the sales revenue")]
    pub revenue: Option<usize>,
    #[schemars(description = "Column holding the cost of goods sold")]
    pub cost: Option<usize>,
}

impl FieldMapping {
    pub fn get(&self, field: CanonicalField) -> Option<usize> {
        match field {
            CanonicalField::ItemCode => self.item_code,
            CanonicalField::Name => self.name,
            CanonicalField::Category => self.category,
            CanonicalField::Unit => self.unit,
            CanonicalField::Qty => self.qty,
            CanonicalField::Loss => self.loss,
            CanonicalField::NetQty => self.net_qty,
            CanonicalField::UnitCost => self.unit_cost,
            CanonicalField::TotalCost => self.total_cost,
            CanonicalField::Price => self.price,
            CanonicalField::StockLevel => self.stock_level,
            CanonicalField::Date => self.date,
            CanonicalField::Quantity => self.quantity,
            CanonicalField::Revenue => self.revenue,
            CanonicalField::Cost => self.cost,
        }
    }

    pub fn set(&mut self, field: CanonicalField, column: Option<usize>) {
        let slot = match field {
            CanonicalField::ItemCode => &mut self.item_code,
            CanonicalField::Name => &mut self.name,
            CanonicalField::Category => &mut self.category,
            CanonicalField::Unit => &mut self.unit,
            CanonicalField::Qty => &mut self.qty,
            CanonicalField::Loss => &mut self.loss,
            CanonicalField::NetQty => &mut self.net_qty,
            CanonicalField::UnitCost => &mut self.unit_cost,
            CanonicalField::TotalCost => &mut self.total_cost,
            CanonicalField::Price => &mut self.price,
            CanonicalField::StockLevel => &mut self.stock_level,
            CanonicalField::Date => &mut self.date,
            CanonicalField::Quantity => &mut self.quantity,
            CanonicalField::Revenue => &mut self.revenue,
            CanonicalField::Cost => &mut self.cost,
        };
        *slot = column;
    }

    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// JSON schema handed to an external assistant asked to map columns.
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(FieldMapping)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

/// A mapping obtained outside the heuristics (e.g. from an assistant), with
/// the header row given relative to the start of the record it applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MappingOverride {
    pub header_offset: usize,
    pub mapping: FieldMapping,
}

/// The header row found for a record and the columns assigned from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    pub row: usize,
    pub mapping: FieldMapping,
}

/// Header vocabulary for one kind of sheet: the keyword groups that must all
/// appear in a header row, and the synonyms of each canonical field.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    pub signature: Vec<Vec<&'static str>>,
    pub synonyms: Vec<(CanonicalField, Vec<&'static str>)>,
}

impl ColumnProfile {
    pub fn recipe() -> Self {
        Self {
            signature: vec![
                vec!["code", "item no", "item #", "item#", "sku", "article", "ref"],
                vec!["ingredient", "description", "item name", "name", "item", "product"],
                vec!["unit", "uom", "qty", "quantity", "amount"],
            ],
            synonyms: vec![
                (
                    CanonicalField::ItemCode,
                    vec!["item code", "code", "item no", "item #", "item#", "sku", "article", "ref"],
                ),
                (
                    CanonicalField::Name,
                    vec!["ingredient", "description", "item name", "name", "product", "item"],
                ),
                (CanonicalField::Unit, vec!["unit", "uom", "measure"]),
                (
                    CanonicalField::Qty,
                    vec!["qty", "quantity", "gross qty", "gross quantity", "amount"],
                ),
                (
                    CanonicalField::Loss,
                    vec!["loss", "waste", "trim", "shrinkage"],
                ),
                (
                    CanonicalField::NetQty,
                    vec!["net qty", "net quantity", "net weight", "net"],
                ),
                (
                    CanonicalField::UnitCost,
                    vec!["unit cost", "unit price", "cost per unit", "price per unit", "cost/unit", "price"],
                ),
                (
                    CanonicalField::TotalCost,
                    vec!["total cost", "total", "line cost", "extended cost", "amount cost"],
                ),
            ],
        }
    }

    pub fn inventory() -> Self {
        Self {
            signature: vec![
                vec!["name", "description", "item", "product", "article"],
                vec!["unit", "uom", "price", "cost", "stock", "on hand", "qty", "quantity"],
            ],
            synonyms: vec![
                (
                    CanonicalField::ItemCode,
                    vec!["item code", "code", "item no", "item #", "sku", "article", "ref"],
                ),
                (
                    CanonicalField::Name,
                    vec!["item name", "name", "description", "product", "item"],
                ),
                (CanonicalField::Category, vec!["category", "group", "department", "class"]),
                (CanonicalField::Unit, vec!["unit", "uom", "measure"]),
                (
                    CanonicalField::Price,
                    vec!["price", "unit cost", "cost", "rate", "last purchase"],
                ),
                (
                    CanonicalField::StockLevel,
                    vec!["stock", "on hand", "closing", "balance", "qty", "quantity", "level"],
                ),
            ],
        }
    }

    pub fn sales() -> Self {
        Self {
            signature: vec![
                vec!["item", "name", "description", "menu", "product", "article"],
                vec!["qty", "quantity", "sold", "revenue", "sales", "amount", "net"],
            ],
            synonyms: vec![
                (CanonicalField::Date, vec!["date", "day", "period"]),
                (
                    CanonicalField::ItemCode,
                    vec!["item code", "code", "plu", "item no", "sku", "article"],
                ),
                (
                    CanonicalField::Name,
                    vec!["item name", "menu item", "name", "description", "product", "item"],
                ),
                (CanonicalField::Category, vec!["category", "group", "department", "family"]),
                (
                    CanonicalField::Quantity,
                    vec!["qty", "quantity", "sold", "covers", "count"],
                ),
                (
                    CanonicalField::Revenue,
                    vec!["revenue", "net sales", "sales", "amount", "turnover", "total"],
                ),
                (CanonicalField::Cost, vec!["cost", "cogs", "food cost"]),
            ],
        }
    }

    /// True when every signature group has at least one keyword in `text`.
    pub fn is_header_text(&self, text: &str) -> bool {
        !text.is_empty()
            && self
                .signature
                .iter()
                .all(|group| group.iter().any(|kw| text.contains(kw)))
    }

    /// First row of `range` whose text carries the full header signature.
    pub fn find_header_row(&self, grid: &SpreadsheetGrid, range: RecordRange) -> Option<usize> {
        range
            .rows()
            .find(|&row| self.is_header_text(&grid.row_text(row)))
    }

    /// Assigns columns to fields from one header row. Each field is resolved
    /// on its own: first a header cell equal to one of its synonyms, then,
    /// synonym by synonym in priority order, the first cell containing it.
    pub fn map_columns(&self, grid: &SpreadsheetGrid, header_row: usize) -> FieldMapping {
        let headers: Vec<String> = grid
            .row(header_row)
            .iter()
            .map(|cell| header_key(&cell.as_text()))
            .collect();

        let mut mapping = FieldMapping::default();
        for (field, synonyms) in &self.synonyms {
            let exact = headers
                .iter()
                .position(|h| synonyms.iter().any(|s| h == s));
            let column = exact.or_else(|| {
                synonyms.iter().find_map(|s| {
                    headers
                        .iter()
                        .position(|h| !h.is_empty() && h.contains(s))
                })
            });
            mapping.set(*field, column);
        }
        mapping
    }

    pub fn locate(&self, grid: &SpreadsheetGrid, range: RecordRange) -> Option<HeaderMatch> {
        let row = self.find_header_row(grid, range)?;
        Some(HeaderMatch {
            row,
            mapping: self.map_columns(grid, row),
        })
    }
}

fn header_key(text: &str) -> String {
    collapse_whitespace(&text.to_lowercase())
        .trim_end_matches([':', '.'])
        .to_string()
}
