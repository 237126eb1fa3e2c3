use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IngredientLine {
    #[serde(default)]
    #[schemars(description = "Inventory identifier of the ingredient, empty when the card has none")]
    pub item_code: String,

    #[schemars(description = "Ingredient name as written on the recipe card")]
    pub name: String,

    #[serde(default)]
    #[schemars(description = "Unit the quantity and unit cost are expressed in (e.g. 'kg', 'l', 'piece')")]
    pub unit: String,

    #[serde(default)]
    #[schemars(description = "Gross quantity used by the recipe")]
    pub qty: f64,

    #[serde(default)]
    #[schemars(description = "Preparation loss as a fraction of qty (0.1 = 10%)")]
    pub loss: f64,

    #[serde(default)]
    #[schemars(description = "Quantity after applying loss; 0 when it could not be determined")]
    pub net_qty: f64,

    #[serde(default)]
    #[schemars(description = "Cost of one unit of the ingredient")]
    pub unit_cost: f64,

    #[serde(default)]
    #[schemars(description = "Cost of the ingredient within the recipe")]
    pub total_cost: f64,
}

impl IngredientLine {
    /// Quantity costs are charged against: `net_qty` when known, else `qty`.
    pub fn effective_qty(&self) -> f64 {
        if self.net_qty > 0.0 {
            self.net_qty
        } else {
            self.qty
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedRecipe {
    pub name: String,

    #[serde(default)]
    #[schemars(description = "Menu category; taken from the expected-recipe index or the sheet name")]
    pub category: String,

    pub yield_amount: f64,

    pub yield_unit: String,

    pub ingredients: Vec<IngredientLine>,

    #[schemars(description = "Sum of ingredient total costs unless manually overridden")]
    pub total_cost: f64,

    #[serde(default)]
    pub sales_price: f64,

    #[serde(default)]
    #[schemars(description = "total_cost / sales_price * 100, or 0 when no sales price is known")]
    pub cost_percentage: f64,

    #[serde(default)]
    #[schemars(description = "True when total_cost was set by hand and no longer equals the ingredient sum")]
    pub manual_cost_override: bool,

    pub imported_at: DateTime<Utc>,
}

impl ExtractedRecipe {
    pub fn ingredient_cost_sum(&self) -> f64 {
        self.ingredients.iter().map(|i| i.total_cost).sum()
    }

    /// Re-derives `total_cost` and `cost_percentage` from the ingredients and
    /// drops any manual override.
    pub fn recompute_totals(&mut self) {
        self.total_cost = self.ingredient_cost_sum();
        self.manual_cost_override = false;
        self.recompute_cost_percentage();
    }

    pub fn recompute_cost_percentage(&mut self) {
        self.cost_percentage = cost_percentage(self.total_cost, self.sales_price);
    }

    pub fn cost_per_portion(&self) -> f64 {
        if self.yield_amount > 0.0 {
            self.total_cost / self.yield_amount
        } else {
            self.total_cost
        }
    }
}

pub fn cost_percentage(total_cost: f64, sales_price: f64) -> f64 {
    if sales_price > 0.0 {
        total_cost / sales_price * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedInventoryItem {
    #[serde(default)]
    pub item_code: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock_level: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedSalesRecord {
    #[schemars(description = "Sale date; absent when the register row carried no readable date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub item_code: String,
    pub item_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub cost: f64,
}

/// A single observed price from a receipt scan or supplier price list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReceiptItem {
    #[serde(default)]
    pub item_code: String,
    pub name: String,
    #[serde(default)]
    pub unit: String,
    pub unit_cost: f64,
}

impl ReceiptItem {
    pub fn new(
        item_code: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        unit_cost: f64,
    ) -> Self {
        Self {
            item_code: item_code.into(),
            name: name.into(),
            unit: unit.into(),
            unit_cost,
        }
    }
}
