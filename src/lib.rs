//! # Kitchen Costing
//!
//! A library for pulling recipe cost cards, stock lists and sales registers
//! out of loosely structured spreadsheet exports, and for keeping recipe
//! costs in sync as new ingredient prices arrive from receipts.
//!
//! ## Core Concepts
//!
//! - **Grid**: a sheet handed in already loaded, as rows of optional cells
//! - **Markers**: rows that look like the start of a recipe (banner titles, `NAME` labels, expected names)
//! - **Column Mapping**: header text matched against synonym lists, one optional column per field
//! - **Matching**: receipt lines tied to inventory items by code, then by name similarity
//! - **Propagation**: new prices pushed into every recipe ingredient that references the item
//!
//! ## Example
//!
//! ```rust,ignore
//! use kitchen_costing::*;
//!
//! let sheet = SpreadsheetGrid::from_text_rows(
//!     "Mains",
//!     vec![
//!         vec!["STANDARD RECIPE CARD"],
//!         vec!["NAME", "Beef Stew"],
//!         vec!["Sales Price", "10.00"],
//!         vec!["Code", "Ingredient", "Unit", "Qty", "Unit Cost"],
//!         vec!["1001", "Beef", "kg", "1", "2.00"],
//!         vec!["1002", "Carrot", "kg", "1", "3.00"],
//!     ],
//! );
//!
//! let report = extract_recipes(&Workbook::new(vec![sheet]), &ExtractionOptions::default()).unwrap();
//! let recipes = report.items;
//! assert_eq!(recipes[0].cost_percentage, 50.0);
//!
//! let inventory = vec![ExtractedInventoryItem {
//!     item_code: "1001".to_string(),
//!     name: "Beef".to_string(),
//!     unit: "kg".to_string(),
//!     ..Default::default()
//! }];
//! let receipts = vec![ReceiptItem::new("1001", "Beef chuck", "kg", 2.50)];
//!
//! let update = process_receipts(&recipes, &inventory, &receipts, &CostingConfig::default()).unwrap();
//! println!("{}", update.summary.to_markdown());
//! ```

pub mod columns;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod grid;
pub mod ingestion;
pub mod markers;
pub mod matcher;
pub mod overrides;
pub mod resolve;
pub mod rows;
pub mod schema;
pub mod summary;
pub mod units;
pub mod utils;
pub mod verify;

pub use columns::{CanonicalField, ColumnProfile, FieldMapping, HeaderMatch, MappingOverride};
pub use config::{CostingConfig, ExtractionConfig, LossConvention};
pub use context::{ExpectedEntry, ExpectedNameIndex, ScanContext};
pub use engine::{propagate_costs, CostPropagator, CostUpdate};
pub use error::{CostingError, Result};
pub use grid::{Cell, RecordRange, SpreadsheetGrid, Workbook};
pub use ingestion::*;
pub use markers::{Marker, MarkerDetector, MarkerKind};
pub use matcher::{match_receipts, IngredientMatch, IngredientMatcher, MatchConfidence, MatchResult};
pub use overrides::*;
pub use schema::*;
pub use summary::{CostUpdateSummary, IngredientPriceChange};
pub use units::{convert, normalize_unit, try_convert};
pub use utils::{normalize_name, similarity};
pub use verify::RecipeVerifier;

use log::{debug, info};

pub struct CostingProcessor;

impl CostingProcessor {
    /// Matches receipts to inventory and propagates the new prices through
    /// the recipes.
    pub fn process(
        recipes: &[ExtractedRecipe],
        inventory: &[ExtractedInventoryItem],
        receipts: &[ReceiptItem],
        config: &CostingConfig,
    ) -> Result<CostUpdate> {
        config.validate()?;

        info!(
            "Processing {} receipt items against {} inventory items",
            receipts.len(),
            inventory.len()
        );
        debug!(
            "{} recipes with {} ingredient lines in scope",
            recipes.len(),
            recipes.iter().map(|r| r.ingredients.len()).sum::<usize>()
        );

        propagate_costs(recipes, inventory, receipts, config)
    }

    /// Same as [`process`](Self::process), then checks every recipe total
    /// against its ingredient sum.
    pub fn process_with_verification(
        recipes: &[ExtractedRecipe],
        inventory: &[ExtractedInventoryItem],
        receipts: &[ReceiptItem],
        config: &CostingConfig,
        tolerance: f64,
    ) -> Result<CostUpdate> {
        let update = Self::process(recipes, inventory, receipts, config)?;

        RecipeVerifier::new(tolerance).verify(&update.recipes)?;

        Ok(update)
    }
}

pub fn process_receipts(
    recipes: &[ExtractedRecipe],
    inventory: &[ExtractedInventoryItem],
    receipts: &[ReceiptItem],
    config: &CostingConfig,
) -> Result<CostUpdate> {
    CostingProcessor::process(recipes, inventory, receipts, config)
}

pub fn process_receipts_with_verification(
    recipes: &[ExtractedRecipe],
    inventory: &[ExtractedInventoryItem],
    receipts: &[ReceiptItem],
    config: &CostingConfig,
    tolerance: f64,
) -> Result<CostUpdate> {
    CostingProcessor::process_with_verification(recipes, inventory, receipts, config, tolerance)
}
