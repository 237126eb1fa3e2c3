use crate::error::Result;
use crate::schema::ExtractedRecipe;
use crate::utils::name_key;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Corrections to extracted recipes, applied in order.
/// This struct is serialized to JSON Schema and handed to an external assistant.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct RecipeOverrides {
    #[schemars(
        description = "Ordered list of modifications to apply to recipes. Later modifications see the result of earlier ones."
    )]
    #[serde(default)]
    pub modifications: Vec<RecipeModification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecipeModification {
    /// Rename a recipe (e.g., 'Beef Stew 2' -> 'Beef Stew').
    Rename {
        #[schemars(description = "The current recipe name; case and spacing are ignored.")]
        target: String,
        #[schemars(description = "The new name.")]
        new_name: String,
    },

    /// Remove a recipe entirely.
    Delete { target: String },

    /// Change the category or yield.
    UpdateMetadata {
        target: String,
        #[schemars(description = "New menu category (optional).")]
        new_category: Option<String>,
        #[schemars(description = "New yield amount (optional).")]
        new_yield_amount: Option<f64>,
        #[schemars(description = "New yield unit, e.g. 'portions' (optional).")]
        new_yield_unit: Option<String>,
    },

    /// Set the menu price; the cost percentage follows.
    SetSalesPrice { target: String, sales_price: f64 },

    /// Pin the recipe total to a manual value. The ingredient lines are kept
    /// and the recipe is flagged as manually overridden.
    OverrideTotalCost { target: String, total_cost: f64 },

    /// Multiply every ingredient quantity (and therefore cost) by a factor,
    /// e.g. 2.0 to double a batch.
    ScaleQuantities { target: String, factor: f64 },
}

impl RecipeOverrides {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Applies the overrides to a copy of `recipes`; the input is untouched.
    pub fn apply(&self, recipes: &[ExtractedRecipe]) -> Vec<ExtractedRecipe> {
        let mut recipes = recipes.to_vec();
        for modification in &self.modifications {
            apply_single_modification(&mut recipes, modification);
        }
        recipes
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RecipeOverrides)
    }
}

fn find_mut<'a>(recipes: &'a mut [ExtractedRecipe], target: &str) -> Option<&'a mut ExtractedRecipe> {
    let key = name_key(target);
    recipes.iter_mut().find(|r| name_key(&r.name) == key)
}

fn apply_single_modification(recipes: &mut Vec<ExtractedRecipe>, modification: &RecipeModification) {
    match modification {
        RecipeModification::Rename { target, new_name } => {
            if let Some(recipe) = find_mut(recipes, target) {
                recipe.name = new_name.trim().to_string();
            }
        }

        RecipeModification::Delete { target } => {
            let key = name_key(target);
            recipes.retain(|r| name_key(&r.name) != key);
        }

        RecipeModification::UpdateMetadata {
            target,
            new_category,
            new_yield_amount,
            new_yield_unit,
        } => {
            if let Some(recipe) = find_mut(recipes, target) {
                if let Some(c) = new_category {
                    recipe.category = c.clone();
                }
                if let Some(amount) = new_yield_amount.filter(|a| *a > 0.0) {
                    recipe.yield_amount = amount;
                }
                if let Some(unit) = new_yield_unit {
                    recipe.yield_unit = unit.clone();
                }
            }
        }

        RecipeModification::SetSalesPrice {
            target,
            sales_price,
        } => {
            if let Some(recipe) = find_mut(recipes, target) {
                recipe.sales_price = sales_price.max(0.0);
                recipe.recompute_cost_percentage();
            }
        }

        RecipeModification::OverrideTotalCost { target, total_cost } => {
            if let Some(recipe) = find_mut(recipes, target) {
                recipe.total_cost = *total_cost;
                recipe.manual_cost_override = true;
                recipe.recompute_cost_percentage();
            }
        }

        RecipeModification::ScaleQuantities { target, factor } => {
            if let Some(recipe) = find_mut(recipes, target) {
                for line in &mut recipe.ingredients {
                    line.qty *= factor;
                    line.net_qty *= factor;
                    line.total_cost *= factor;
                }
                if recipe.manual_cost_override {
                    recipe.total_cost *= factor;
                    recipe.recompute_cost_percentage();
                } else {
                    recipe.recompute_totals();
                }
            }
        }
    }
}
