//! Cost propagation: new receipt prices pushed through to every recipe
//! ingredient that references the same inventory item.

use crate::config::CostingConfig;
use crate::error::Result;
use crate::matcher::IngredientMatcher;
use crate::schema::{ExtractedInventoryItem, ExtractedRecipe, IngredientLine, ReceiptItem};
use crate::summary::{CostUpdateSummary, IngredientPriceChange};
use crate::units::try_convert;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recipes after propagation together with what changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostUpdate {
    pub recipes: Vec<ExtractedRecipe>,
    pub summary: CostUpdateSummary,
}

/// Latest observed price for one inventory item.
#[derive(Debug, Clone, PartialEq)]
struct ObservedPrice {
    unit_cost: f64,
    unit: String,
}

pub struct CostPropagator {
    config: CostingConfig,
}

impl CostPropagator {
    pub fn new(config: CostingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CostingConfig {
        &self.config
    }

    /// Matches `receipts` to `inventory` and reprices every linked recipe
    /// ingredient. The input recipes are left untouched.
    pub fn propagate(
        &self,
        recipes: &[ExtractedRecipe],
        inventory: &[ExtractedInventoryItem],
        receipts: &[ReceiptItem],
    ) -> Result<CostUpdate> {
        let matcher = IngredientMatcher::new(inventory, self.config.match_threshold)?;
        let matches = matcher.match_all(receipts);

        let mut prices: BTreeMap<usize, ObservedPrice> = BTreeMap::new();
        for m in &matches.matches {
            let receipt = &receipts[m.receipt_index];
            let unit = if receipt.unit.trim().is_empty() {
                inventory[m.inventory_index].unit.clone()
            } else {
                receipt.unit.clone()
            };
            // later receipts for the same item replace earlier ones
            prices.insert(
                m.inventory_index,
                ObservedPrice {
                    unit_cost: receipt.unit_cost,
                    unit,
                },
            );
        }

        let mut summary = CostUpdateSummary {
            receipts_matched: matches.matches.len(),
            unmatched_receipts: matches
                .unmatched
                .iter()
                .map(|&i| receipts[i].name.clone())
                .collect(),
            ..Default::default()
        };

        let mut updated = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            let mut recipe = recipe.clone();
            summary.total_cost_before += recipe.total_cost;

            let mut changed = false;
            for ingredient in &mut recipe.ingredients {
                let Some(index) = matcher.link_ingredient(&ingredient.item_code, &ingredient.name)
                else {
                    continue;
                };
                let Some(price) = prices.get(&index) else {
                    continue;
                };

                if let Some(change) = self.reprice(&recipe.name, ingredient, price) {
                    if change.unit_mismatch {
                        summary.unit_mismatches += 1;
                    }
                    summary.ingredients_updated += 1;
                    summary.changes.push(change);
                    changed = true;
                }
            }

            if changed {
                summary.recipes_updated += 1;
                if recipe.manual_cost_override {
                    recipe.recompute_cost_percentage();
                } else {
                    recipe.recompute_totals();
                }
                debug!(
                    "Recipe '{}' repriced to {:.4}",
                    recipe.name, recipe.total_cost
                );
            }

            summary.total_cost_after += recipe.total_cost;
            updated.push(recipe);
        }

        info!(
            "Cost propagation: {} ingredients in {} recipes updated, total {:.2} -> {:.2}",
            summary.ingredients_updated,
            summary.recipes_updated,
            summary.total_cost_before,
            summary.total_cost_after
        );

        Ok(CostUpdate {
            recipes: updated,
            summary,
        })
    }

    /// Applies `price` to one ingredient when the change clears the noise floor.
    fn reprice(
        &self,
        recipe_name: &str,
        ingredient: &mut IngredientLine,
        price: &ObservedPrice,
    ) -> Option<IngredientPriceChange> {
        let (new_unit_cost, unit_mismatch) = match try_convert(&price.unit, &ingredient.unit) {
            Some(factor) if factor > 0.0 => (price.unit_cost / factor, false),
            _ => {
                warn!(
                    "No conversion from '{}' to '{}' for '{}' in '{}'; price applied unconverted",
                    price.unit, ingredient.unit, ingredient.name, recipe_name
                );
                (price.unit_cost, true)
            }
        };

        let old_unit_cost = ingredient.unit_cost;
        let change_pct = change_pct(old_unit_cost, new_unit_cost);
        if change_pct.abs() <= self.config.noise_floor_pct {
            return None;
        }

        let old_total_cost = ingredient.total_cost;
        ingredient.unit_cost = new_unit_cost;
        ingredient.total_cost = new_unit_cost * ingredient.effective_qty();

        Some(IngredientPriceChange {
            recipe_name: recipe_name.to_string(),
            ingredient_name: ingredient.name.clone(),
            item_code: ingredient.item_code.clone(),
            old_unit_cost,
            new_unit_cost,
            change_pct,
            old_total_cost,
            new_total_cost: ingredient.total_cost,
            unit_mismatch,
        })
    }
}

/// Percentage change from `old` to `new`; a move away from zero counts as 100%.
pub fn change_pct(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        if new == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        (new - old) / old * 100.0
    }
}

pub fn propagate_costs(
    recipes: &[ExtractedRecipe],
    inventory: &[ExtractedInventoryItem],
    receipts: &[ReceiptItem],
    config: &CostingConfig,
) -> Result<CostUpdate> {
    CostPropagator::new(config.clone())?.propagate(recipes, inventory, receipts)
}
