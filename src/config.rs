use crate::error::{CostingError, Result};
use crate::utils::normalize_name;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a fractional `loss` turns `qty` into `net_qty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LossConvention {
    /// `net_qty = qty * (1 - loss)`: loss is trimmed off the purchased quantity.
    #[default]
    Reduce,
    /// `net_qty = qty + loss * qty`: loss is added on top of the usable quantity.
    Gross,
}

impl LossConvention {
    pub fn apply(self, qty: f64, loss: f64) -> f64 {
        match self {
            LossConvention::Reduce => qty * (1.0 - loss),
            LossConvention::Gross => qty + loss * qty,
        }
    }
}

/// Heuristic constants for the spreadsheet extraction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Longest row span a single recipe record may cover.
    pub max_record_span: usize,
    /// Lowercase phrases whose presence in a row's text marks a recipe banner.
    pub banner_phrases: Vec<String>,
    /// First-cell labels that start a record (compared exactly after trimming).
    pub name_labels: Vec<String>,
    /// Label and known-name markers this close to a banner belong to it.
    pub banner_proximity: usize,
    /// How many leading columns the known-name scan looks at.
    pub known_name_columns: usize,
    /// Sheets whose name contains one of these are not record sheets.
    pub skip_sheet_keywords: Vec<String>,
    pub loss_convention: LossConvention,
    pub default_unit: String,
    /// Minimum similarity (strictly exceeded) for fuzzy recipe-name lookups.
    pub name_match_threshold: f64,
    /// Cells to the right of a metadata keyword searched for its value.
    pub metadata_lookahead: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_record_span: 50,
            banner_phrases: vec![
                "standard recipe card".to_string(),
                "standard recipe".to_string(),
                "recipe card".to_string(),
                "recipe costing".to_string(),
                "cost card".to_string(),
            ],
            name_labels: vec!["NAME".to_string()],
            banner_proximity: 5,
            known_name_columns: 3,
            skip_sheet_keywords: vec![
                "summary".to_string(),
                "index".to_string(),
                "contents".to_string(),
                "toc".to_string(),
                "overview".to_string(),
            ],
            loss_convention: LossConvention::default(),
            default_unit: "piece".to_string(),
            name_match_threshold: 0.7,
            metadata_lookahead: 4,
        }
    }
}

impl ExtractionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_record_span == 0 {
            return Err(CostingError::InvalidConfig(
                "max_record_span must be at least 1".to_string(),
            ));
        }
        validate_threshold(self.name_match_threshold)?;
        if self.default_unit.trim().is_empty() {
            return Err(CostingError::InvalidConfig(
                "default_unit must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// True when the sheet name marks a summary/index style sheet. Single-word
    /// keywords must match a whole word of the name.
    pub fn is_skipped_sheet(&self, sheet_name: &str) -> bool {
        let name = normalize_name(sheet_name);
        let words: Vec<&str> = name.split_whitespace().collect();

        self.skip_sheet_keywords.iter().any(|keyword| {
            let keyword = normalize_name(keyword);
            if keyword.is_empty() {
                false
            } else if keyword.contains(' ') {
                name.contains(&keyword)
            } else {
                words.contains(&keyword.as_str())
            }
        })
    }
}

/// Thresholds for ingredient matching and cost propagation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostingConfig {
    /// Similarity a receipt name must strictly exceed to match an inventory item.
    pub match_threshold: f64,
    /// Price changes at or below this absolute percentage are ignored.
    pub noise_floor_pct: f64,
}

impl Default for CostingConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.7,
            noise_floor_pct: 0.1,
        }
    }
}

impl CostingConfig {
    pub fn with_threshold(match_threshold: f64) -> Self {
        Self {
            match_threshold,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.match_threshold)?;
        if !self.noise_floor_pct.is_finite() || self.noise_floor_pct < 0.0 {
            return Err(CostingError::InvalidConfig(format!(
                "noise_floor_pct must be a non-negative number, got {}",
                self.noise_floor_pct
            )));
        }
        Ok(())
    }
}

pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(CostingError::InvalidThreshold(threshold));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_conventions() {
        assert!((LossConvention::Reduce.apply(2.0, 0.25) - 1.5).abs() < 1e-12);
        assert!((LossConvention::Gross.apply(2.0, 0.25) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ExtractionConfig::from_json(r#"{"max_record_span": 30, "loss_convention": "gross"}"#)
                .unwrap();
        assert_eq!(config.max_record_span, 30);
        assert_eq!(config.loss_convention, LossConvention::Gross);
        assert_eq!(config.default_unit, "piece");
        assert_eq!(config.name_labels, vec!["NAME".to_string()]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ExtractionConfig::from_json(r#"{"max_record_span": 0}"#),
            Err(CostingError::InvalidConfig(_))
        ));
        assert!(matches!(
            CostingConfig::from_json(r#"{"match_threshold": 1.5}"#),
            Err(CostingError::InvalidThreshold(_))
        ));
        assert!(matches!(
            CostingConfig::from_json("not json"),
            Err(CostingError::SerializationError(_))
        ));
    }

    #[test]
    fn test_skipped_sheets() {
        let config = ExtractionConfig::default();
        assert!(config.is_skipped_sheet("Recipe Summary"));
        assert!(config.is_skipped_sheet("INDEX"));
        assert!(config.is_skipped_sheet("Table of Contents"));
        assert!(!config.is_skipped_sheet("Main Course"));
        assert!(!config.is_skipped_sheet("Stocks & Sauces"));
    }
}
