// std imports
use std::collections::HashMap;

// 3rd party imports
use polars::prelude::*;

// internal imports
use crate::workspace::Category;

use super::parser::Calibration;

/// Parsed table of a single file
///
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub table: DataFrame,
    /// Only set for annotated spectra
    pub calibration: Option<Calibration>,
}

impl ParsedTable {
    pub fn new(table: DataFrame) -> Self {
        Self {
            table,
            calibration: None,
        }
    }

    pub fn with_calibration(table: DataFrame, calibration: Calibration) -> Self {
        Self {
            table,
            calibration: Some(calibration),
        }
    }
}

/// Parsed tables per category, keyed by file name.
/// Entries are only replaced by a forced reparse or dropped when their category is cleared.
///
#[derive(Debug, Default)]
pub struct ParseCache {
    entries: HashMap<Category, HashMap<String, ParsedTable>>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, category: Category, file_name: &str) -> bool {
        self.entries
            .get(&category)
            .is_some_and(|tables| tables.contains_key(file_name))
    }

    pub fn get(&self, category: Category, file_name: &str) -> Option<&ParsedTable> {
        self.entries
            .get(&category)
            .and_then(|tables| tables.get(file_name))
    }

    /// Adds or replaces the table of the given file
    ///
    pub fn insert(&mut self, category: Category, file_name: String, table: ParsedTable) {
        self.entries
            .entry(category)
            .or_default()
            .insert(file_name, table);
    }

    /// Number of cached files of the category
    ///
    pub fn len(&self, category: Category) -> usize {
        self.entries.get(&category).map_or(0, |tables| tables.len())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|tables| tables.is_empty())
    }

    /// Sorted names of the cached files of the category
    ///
    pub fn file_names(&self, category: Category) -> Vec<String> {
        let mut file_names: Vec<String> = self
            .entries
            .get(&category)
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default();
        file_names.sort();
        file_names
    }

    /// Sorted names of the cached files of all required categories
    ///
    pub fn file_lists(&self) -> HashMap<Category, Vec<String>> {
        Category::REQUIRED
            .iter()
            .map(|category| (*category, self.file_names(*category)))
            .collect()
    }

    /// Drops all entries of the category
    ///
    pub fn clear(&mut self, category: Category) {
        self.entries.remove(&category);
    }
}
