//! Receipt lines to inventory identities: identifier equality first, then
//! name similarity strictly above a threshold.

use crate::config::validate_threshold;
use crate::error::Result;
use crate::schema::{ExtractedInventoryItem, ReceiptItem};
use crate::utils::{normalize_name, similarity_normalized};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "score", rename_all = "snake_case")]
pub enum MatchConfidence {
    /// Identifiers were equal; the threshold was not consulted.
    Exact,
    Similarity(f64),
}

impl MatchConfidence {
    pub fn score(&self) -> f64 {
        match self {
            MatchConfidence::Exact => 1.0,
            MatchConfidence::Similarity(score) => *score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientMatch {
    pub receipt_index: usize,
    /// The receipt's identity: its trimmed code, or its normalized name when
    /// it has no code.
    pub receipt_key: String,
    pub inventory_index: usize,
    pub item_code: String,
    pub confidence: MatchConfidence,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// In receipt order.
    pub matches: Vec<IngredientMatch>,
    /// Indices of receipts that matched nothing.
    pub unmatched: Vec<usize>,
}

impl MatchResult {
    pub fn as_map(&self) -> BTreeMap<String, String> {
        self.matches
            .iter()
            .map(|m| (m.receipt_key.clone(), m.item_code.clone()))
            .collect()
    }

    pub fn match_for(&self, receipt_index: usize) -> Option<&IngredientMatch> {
        self.matches
            .iter()
            .find(|m| m.receipt_index == receipt_index)
    }

    pub fn exact_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| m.confidence == MatchConfidence::Exact)
            .count()
    }
}

pub fn receipt_key(receipt: &ReceiptItem) -> String {
    let code = receipt.item_code.trim();
    if code.is_empty() {
        normalize_name(&receipt.name)
    } else {
        code.to_string()
    }
}

/// Matches names and codes against one inventory list. Inventory names are
/// normalized once up front.
pub struct IngredientMatcher<'a> {
    inventory: &'a [ExtractedInventoryItem],
    normalized: Vec<String>,
    threshold: f64,
}

impl<'a> IngredientMatcher<'a> {
    pub fn new(inventory: &'a [ExtractedInventoryItem], threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self {
            inventory,
            normalized: inventory.iter().map(|i| normalize_name(&i.name)).collect(),
            threshold,
        })
    }

    pub fn inventory(&self) -> &'a [ExtractedInventoryItem] {
        self.inventory
    }

    /// Index of the first inventory item with this code. Blank codes never match.
    pub fn find_code(&self, code: &str) -> Option<usize> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        self.inventory
            .iter()
            .position(|item| item.item_code.trim() == code)
    }

    /// Best-scoring inventory item whose score strictly exceeds the threshold.
    /// Ties keep the earlier item.
    pub fn find_similar(&self, name: &str) -> Option<(usize, f64)> {
        let needle = normalize_name(name);
        if needle.is_empty() {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for (index, candidate) in self.normalized.iter().enumerate() {
            let score = similarity_normalized(&needle, candidate);
            if score > self.threshold && best.map_or(true, |(_, b)| score > b) {
                best = Some((index, score));
            }
        }
        best
    }

    pub fn match_item(&self, code: &str, name: &str) -> Option<(usize, MatchConfidence)> {
        self.find_code(code)
            .map(|index| (index, MatchConfidence::Exact))
            .or_else(|| {
                self.find_similar(name)
                    .map(|(index, score)| (index, MatchConfidence::Similarity(score)))
            })
    }

    /// Inventory item a recipe ingredient refers to. A coded ingredient is
    /// linked by its code alone; only uncoded ingredients fall back to names.
    pub fn link_ingredient(&self, code: &str, name: &str) -> Option<usize> {
        if code.trim().is_empty() {
            self.find_similar(name).map(|(index, _)| index)
        } else {
            self.find_code(code)
        }
    }

    pub fn match_all(&self, receipts: &[ReceiptItem]) -> MatchResult {
        let mut result = MatchResult::default();

        for (receipt_index, receipt) in receipts.iter().enumerate() {
            match self.match_item(&receipt.item_code, &receipt.name) {
                Some((inventory_index, confidence)) => {
                    let item = &self.inventory[inventory_index];
                    debug!(
                        "Receipt '{}' -> '{}' ({:?})",
                        receipt.name, item.name, confidence
                    );
                    result.matches.push(IngredientMatch {
                        receipt_index,
                        receipt_key: receipt_key(receipt),
                        inventory_index,
                        item_code: item.item_code.clone(),
                        confidence,
                    });
                }
                None => {
                    debug!("Receipt '{}' matched no inventory item", receipt.name);
                    result.unmatched.push(receipt_index);
                }
            }
        }

        info!(
            "Matched {} of {} receipt items ({} by code)",
            result.matches.len(),
            receipts.len(),
            result.exact_count()
        );
        result
    }
}

pub fn match_receipts(
    receipts: &[ReceiptItem],
    inventory: &[ExtractedInventoryItem],
    threshold: f64,
) -> Result<MatchResult> {
    Ok(IngredientMatcher::new(inventory, threshold)?.match_all(receipts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CostingError;
    use crate::utils::similarity;

    fn item(code: &str, name: &str) -> ExtractedInventoryItem {
        ExtractedInventoryItem {
            item_code: code.to_string(),
            name: name.to_string(),
            unit: "kg".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_name_match_above_threshold() {
        let inventory = vec![item("A1", "Olive Oil")];
        let receipts = vec![ReceiptItem::new("", "olive  oil", "l", 9.0)];

        let result = match_receipts(&receipts, &inventory, 0.7).unwrap();
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].item_code, "A1");
        assert_eq!(result.as_map().get("olive oil"), Some(&"A1".to_string()));

        // identical after normalization, so only a threshold of 1.0 rejects it
        let strict = match_receipts(&receipts, &inventory, 1.0).unwrap();
        assert!(strict.matches.is_empty());
        assert_eq!(strict.unmatched, vec![0]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let inventory = vec![item("T1", "Fresh Tomato")];
        let receipts = vec![ReceiptItem::new("", "Tomato", "kg", 2.0)];
        let score = similarity("Tomato", "Fresh Tomato");

        assert!(match_receipts(&receipts, &inventory, score)
            .unwrap()
            .matches
            .is_empty());
        assert_eq!(
            match_receipts(&receipts, &inventory, score - 0.01)
                .unwrap()
                .matches
                .len(),
            1
        );
    }

    #[test]
    fn test_code_match_bypasses_threshold() {
        let inventory = vec![item("A1", "Olive Oil"), item("B7", "Flour T55")];
        let receipts = vec![ReceiptItem::new(" B7 ", "Mehl Typ 550", "kg", 1.1)];

        let result = match_receipts(&receipts, &inventory, 1.0).unwrap();
        assert_eq!(result.matches[0].item_code, "B7");
        assert_eq!(result.matches[0].confidence, MatchConfidence::Exact);
        assert_eq!(result.exact_count(), 1);
    }

    #[test]
    fn test_blank_codes_fall_back_to_names() {
        let inventory = vec![item("", "Sea Salt"), item("", "Caster Sugar")];
        let receipts = vec![ReceiptItem::new("", "caster sugar", "kg", 1.0)];

        let result = match_receipts(&receipts, &inventory, 0.7).unwrap();
        assert_eq!(result.matches[0].inventory_index, 1);
        assert!(matches!(
            result.matches[0].confidence,
            MatchConfidence::Similarity(_)
        ));
    }

    #[test]
    fn test_coded_ingredients_link_by_code_only() {
        let inventory = vec![item("1001", "Beef Chuck"), item("", "Caster Sugar")];
        let matcher = IngredientMatcher::new(&inventory, 0.7).unwrap();

        assert_eq!(matcher.link_ingredient(" 1001 ", "anything"), Some(0));
        assert_eq!(matcher.link_ingredient("X9", "Beef"), None);
        assert_eq!(matcher.link_ingredient("", "caster sugar"), Some(1));
        // receipts still fall back to names
        assert!(matcher.match_item("X9", "Beef").is_some());
    }

    #[test]
    fn test_ties_keep_earlier_item() {
        let inventory = vec![item("R", "Tomato Red"), item("G", "Tomato Green")];
        let matcher = IngredientMatcher::new(&inventory, 0.5).unwrap();
        let (index, _) = matcher.find_similar("Tomato").unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(matches!(
            match_receipts(&[], &[], 1.5),
            Err(CostingError::InvalidThreshold(_))
        ));
        assert!(IngredientMatcher::new(&[], -0.1).is_err());
    }
}
