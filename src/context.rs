use crate::error::Result;
use crate::utils::{name_key, normalize_name, similarity_normalized};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedEntry {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub found: bool,
}

/// Recipe names the caller expects to find, with their menu categories.
/// Loaded from the `{name: {category, found}}` JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectedNameIndex {
    entries: BTreeMap<String, ExpectedEntry>,
}

/// An entry hit by one of the index lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedMatch {
    pub name: String,
    pub category: String,
    pub score: f64,
}

impl ExpectedNameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, name: impl Into<String>, category: impl Into<String>) {
        self.entries.insert(
            name.into(),
            ExpectedEntry {
                category: category.into(),
                found: false,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ExpectedEntry> {
        self.entries.get(name)
    }

    pub fn is_found(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.found)
    }

    pub fn mark_found(&mut self, name: &str) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.found = true;
        }
    }

    pub fn unfound_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.found)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn find_exact(&self, text: &str) -> Option<ExpectedMatch> {
        let text = text.trim();
        self.entries.get(text).map(|e| ExpectedMatch {
            name: text.to_string(),
            category: e.category.clone(),
            score: 1.0,
        })
    }

    /// Case and whitespace insensitive lookup.
    pub fn find_insensitive(&self, text: &str) -> Option<ExpectedMatch> {
        let key = name_key(text);
        if key.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(name, _)| name_key(name) == key)
            .map(|(name, e)| ExpectedMatch {
                name: name.clone(),
                category: e.category.clone(),
                score: 1.0,
            })
    }

    /// Best similarity match strictly above `threshold`; ties keep the entry
    /// that sorts first.
    pub fn find_fuzzy(&self, text: &str, threshold: f64) -> Option<ExpectedMatch> {
        let needle = normalize_name(text);
        if needle.is_empty() {
            return None;
        }

        let mut best: Option<ExpectedMatch> = None;
        for (name, entry) in &self.entries {
            let score = similarity_normalized(&needle, &normalize_name(name));
            if score > threshold && best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(ExpectedMatch {
                    name: name.clone(),
                    category: entry.category.clone(),
                    score,
                });
            }
        }
        best
    }

    /// Exact, then insensitive, then fuzzy.
    pub fn lookup(&self, text: &str, threshold: f64) -> Option<ExpectedMatch> {
        self.find_exact(text)
            .or_else(|| self.find_insensitive(text))
            .or_else(|| self.find_fuzzy(text, threshold))
    }
}

/// Mutable state for one extraction run: the expected-name index with its
/// found flags and the first-wins dedup set. Never shared across runs.
#[derive(Debug, Default)]
pub struct ScanContext {
    pub expected: Option<ExpectedNameIndex>,
    seen_names: HashSet<String>,
}

impl ScanContext {
    pub fn new(expected: Option<ExpectedNameIndex>) -> Self {
        Self {
            expected,
            seen_names: HashSet::new(),
        }
    }

    /// Claims `name` for this run. Returns false when an earlier record
    /// already resolved to the same case/whitespace-insensitive name.
    pub fn claim_name(&mut self, name: &str) -> bool {
        self.seen_names.insert(name_key(name))
    }

    pub fn has_seen(&self, name: &str) -> bool {
        self.seen_names.contains(&name_key(name))
    }

    pub fn into_expected(self) -> Option<ExpectedNameIndex> {
        self.expected
    }
}
