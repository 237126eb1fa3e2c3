use crate::error::{CostingError, Result};
use crate::schema::ExtractedRecipe;
use log::debug;

/// Checks and restores the `total_cost == sum(ingredient totals)` invariant.
/// Recipes carrying a manual total override are exempt.
pub struct RecipeVerifier {
    tolerance: f64,
}

impl RecipeVerifier {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    fn is_off(&self, recipe: &ExtractedRecipe) -> bool {
        !recipe.manual_cost_override
            && (recipe.total_cost - recipe.ingredient_cost_sum()).abs() > self.tolerance
    }

    /// Fails on the first recipe whose stated total is further than the
    /// tolerance from its ingredient sum.
    pub fn verify(&self, recipes: &[ExtractedRecipe]) -> Result<()> {
        match recipes.iter().find(|r| self.is_off(r)) {
            Some(recipe) => Err(CostingError::RecipeTotalMismatch {
                recipe: recipe.name.clone(),
                stated: recipe.total_cost,
                computed: recipe.ingredient_cost_sum(),
            }),
            None => Ok(()),
        }
    }

    pub fn mismatched<'r>(&self, recipes: &'r [ExtractedRecipe]) -> Vec<&'r str> {
        recipes
            .iter()
            .filter(|r| self.is_off(r))
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Recomputes totals and cost percentages of every recipe that fails
    /// [`verify`](Self::verify), returning the adjusted names.
    pub fn enforce(&self, recipes: &mut [ExtractedRecipe]) -> Vec<String> {
        let mut adjusted = Vec::new();
        for recipe in recipes.iter_mut() {
            if !self.is_off(recipe) {
                continue;
            }
            debug!(
                "Recipe '{}': total {:.4} reset to ingredient sum {:.4}",
                recipe.name,
                recipe.total_cost,
                recipe.ingredient_cost_sum()
            );
            recipe.recompute_totals();
            adjusted.push(recipe.name.clone());
        }
        adjusted
    }
}
