//! Static unit conversion table for kitchen weights and volumes.
//!
//! Every unit is stored as its size in a base unit (grams or millilitres), so
//! any two units of the same dimension convert in both directions. Long-form
//! and plural spellings resolve to the short codes through [`UNIT_ALIASES`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Weight,
    Volume,
}

/// Grams per unit.
const WEIGHT_UNITS: &[(&str, f64)] = &[
    ("g", 1.0),
    ("kg", 1000.0),
    ("lb", 453.592_37),
    ("oz", 28.349_523_125),
];

/// Millilitres per unit (US customary for the imperial measures).
const VOLUME_UNITS: &[(&str, f64)] = &[
    ("ml", 1.0),
    ("l", 1000.0),
    ("gal", 3785.411_784),
    ("qt", 946.352_946),
    ("pt", 473.176_473),
    ("cup", 236.588_236_5),
    ("tbsp", 14.786_764_781),
    ("tsp", 4.928_921_594),
];

pub const UNIT_ALIASES: &[(&str, &str)] = &[
    ("gram", "g"),
    ("grams", "g"),
    ("gr", "g"),
    ("grs", "g"),
    ("gm", "g"),
    ("gms", "g"),
    ("kilogram", "kg"),
    ("kilograms", "kg"),
    ("kilo", "kg"),
    ("kilos", "kg"),
    ("kgs", "kg"),
    ("pound", "lb"),
    ("pounds", "lb"),
    ("lbs", "lb"),
    ("ounce", "oz"),
    ("ounces", "oz"),
    ("millilitre", "ml"),
    ("millilitres", "ml"),
    ("milliliter", "ml"),
    ("milliliters", "ml"),
    ("mls", "ml"),
    ("litre", "l"),
    ("litres", "l"),
    ("liter", "l"),
    ("liters", "l"),
    ("ltr", "l"),
    ("lt", "l"),
    ("gallon", "gal"),
    ("gallons", "gal"),
    ("quart", "qt"),
    ("quarts", "qt"),
    ("pint", "pt"),
    ("pints", "pt"),
    ("cups", "cup"),
    ("tablespoon", "tbsp"),
    ("tablespoons", "tbsp"),
    ("tbs", "tbsp"),
    ("tbl", "tbsp"),
    ("teaspoon", "tsp"),
    ("teaspoons", "tsp"),
    ("tsps", "tsp"),
];

/// Lowercases, trims, drops a trailing period and resolves aliases.
/// Unknown units come back in their cleaned form.
pub fn normalize_unit(unit: &str) -> String {
    let cleaned = unit.trim().trim_end_matches('.').trim().to_lowercase();

    UNIT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == cleaned)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(cleaned)
}

fn lookup(unit: &str) -> Option<(Dimension, f64)> {
    if let Some((_, f)) = WEIGHT_UNITS.iter().find(|(code, _)| *code == unit) {
        return Some((Dimension::Weight, *f));
    }
    VOLUME_UNITS
        .iter()
        .find(|(code, _)| *code == unit)
        .map(|(_, f)| (Dimension::Volume, *f))
}

pub fn dimension_of(unit: &str) -> Option<Dimension> {
    lookup(&normalize_unit(unit)).map(|(d, _)| d)
}

/// Factor such that `quantity_in_to = quantity_in_from * factor`, or `None`
/// when no conversion exists. Identical units (after alias resolution)
/// always convert with `1.0`, known or not.
pub fn try_convert(from_unit: &str, to_unit: &str) -> Option<f64> {
    let from = normalize_unit(from_unit);
    let to = normalize_unit(to_unit);

    if from == to {
        return Some(1.0);
    }

    let (from_dim, from_size) = lookup(&from)?;
    let (to_dim, to_size) = lookup(&to)?;

    if from_dim != to_dim {
        return None;
    }

    Some(from_size / to_size)
}

/// Like [`try_convert`] but falls back to `1.0` for unsupported pairs.
pub fn convert(from_unit: &str, to_unit: &str) -> f64 {
    try_convert(from_unit, to_unit).unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_weight() {
        assert_eq!(convert("kg", "g"), 1000.0);
        assert_eq!(convert("g", "kg"), 0.001);
    }

    #[test]
    fn test_unknown_pair_falls_back() {
        assert_eq!(convert("kg", "banana"), 1.0);
        assert_eq!(try_convert("kg", "banana"), None);
    }

    #[test]
    fn test_cross_dimension_is_unsupported() {
        assert_eq!(try_convert("kg", "l"), None);
        assert_eq!(convert("kg", "l"), 1.0);
    }

    #[test]
    fn test_aliases() {
        assert_eq!(normalize_unit(" Kilograms "), "kg");
        assert_eq!(normalize_unit("Lbs."), "lb");
        assert_eq!(normalize_unit("Litre"), "l");
        assert_eq!(normalize_unit("piece"), "piece");
        assert_eq!(convert("kilo", "grams"), 1000.0);
    }

    #[test]
    fn test_same_unit_is_identity() {
        assert_eq!(try_convert("piece", "Piece"), Some(1.0));
        assert_eq!(try_convert("each", "each"), Some(1.0));
    }

    #[test]
    fn test_imperial_pairs() {
        assert!((convert("lb", "oz") - 16.0).abs() < 1e-9);
        assert!((convert("gal", "qt") - 4.0).abs() < 1e-6);
        assert!((convert("tbsp", "tsp") - 3.0).abs() < 1e-6);
        assert!((convert("l", "ml") - 1000.0).abs() < 1e-9);
        assert!((convert("cup", "tbsp") - 16.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_of() {
        assert_eq!(dimension_of("Grams"), Some(Dimension::Weight));
        assert_eq!(dimension_of("tsp"), Some(Dimension::Volume));
        assert_eq!(dimension_of("bunch"), None);
    }
}
