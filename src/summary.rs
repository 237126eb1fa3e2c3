use serde::{Deserialize, Serialize};

/// One ingredient whose unit cost moved during a propagation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientPriceChange {
    pub recipe_name: String,
    pub ingredient_name: String,
    pub item_code: String,
    pub old_unit_cost: f64,
    pub new_unit_cost: f64,
    /// Relative change in percent; 100 when the old cost was zero.
    pub change_pct: f64,
    pub old_total_cost: f64,
    pub new_total_cost: f64,
    /// The receipt unit could not be converted to the ingredient unit and the
    /// price was applied as is.
    pub unit_mismatch: bool,
}

impl IngredientPriceChange {
    pub fn total_delta(&self) -> f64 {
        self.new_total_cost - self.old_total_cost
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostUpdateSummary {
    pub recipes_updated: usize,
    pub ingredients_updated: usize,
    pub total_cost_before: f64,
    pub total_cost_after: f64,
    pub receipts_matched: usize,
    /// Names of receipt lines that matched no inventory item.
    pub unmatched_receipts: Vec<String>,
    pub unit_mismatches: usize,
    /// In recipe order, then ingredient order.
    pub changes: Vec<IngredientPriceChange>,
}

impl CostUpdateSummary {
    pub fn net_change(&self) -> f64 {
        self.total_cost_after - self.total_cost_before
    }

    pub fn largest_increase(&self) -> Option<&IngredientPriceChange> {
        self.changes
            .iter()
            .filter(|c| c.change_pct > 0.0)
            .max_by(|a, b| a.change_pct.total_cmp(&b.change_pct))
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(
            "Recipe,Ingredient,Item Code,Old Unit Cost,New Unit Cost,Change %,Old Total,New Total,Unit Mismatch\n",
        );

        for change in &self.changes {
            output.push_str(&format!(
                "{},{},{},{:.4},{:.4},{:.2},{:.4},{:.4},{}\n",
                csv_field(&change.recipe_name),
                csv_field(&change.ingredient_name),
                csv_field(&change.item_code),
                change.old_unit_cost,
                change.new_unit_cost,
                change.change_pct,
                change.old_total_cost,
                change.new_total_cost,
                change.unit_mismatch
            ));
        }

        output
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Recipe Cost Update\n\n");
        output.push_str(&format!(
            "**Recipes updated:** {}  \n**Ingredients updated:** {}  \n**Receipts matched:** {}\n\n",
            self.recipes_updated, self.ingredients_updated, self.receipts_matched
        ));
        output.push_str(&format!(
            "**Total cost:** {:.2} -> {:.2} ({:+.2})\n\n",
            self.total_cost_before,
            self.total_cost_after,
            self.net_change()
        ));

        if !self.changes.is_empty() {
            output.push_str("## Price Changes\n\n");
            output.push_str("| Recipe | Ingredient | Old | New | Change |\n");
            output.push_str("|---|---|---:|---:|---:|\n");
            for change in &self.changes {
                let marker = if change.unit_mismatch {
                    " **[UNIT MISMATCH]**"
                } else {
                    ""
                };
                output.push_str(&format!(
                    "| {} | {}{} | {:.4} | {:.4} | {:+.1}% |\n",
                    change.recipe_name,
                    change.ingredient_name,
                    marker,
                    change.old_unit_cost,
                    change.new_unit_cost,
                    change.change_pct
                ));
            }
            output.push('\n');
        }

        if !self.unmatched_receipts.is_empty() {
            output.push_str("## Unmatched Receipt Items\n\n");
            for name in &self.unmatched_receipts {
                output.push_str(&format!("- {}\n", name));
            }
            output.push('\n');
        }

        output
    }
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}
