use indexmap::IndexMap;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::{FilterExpression, FilterKey, Predicate, parse};
use crate::domain::TFError;
use crate::table::Classification;

/// How the visible rows must be rebuilt after a registry change.
#[derive(Debug, Clone)]
pub enum Recompute {
    Unchanged,
    /// Intersect the current rows with one more predicate.
    Narrow(Predicate),
    /// Re-evaluate every enabled predicate against the base table.
    Full,
}

/// Known filters in insertion order.
#[derive(Debug, Default)]
pub struct FilterRegistry {
    filters: IndexMap<FilterKey, FilterExpression>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut expr: FilterExpression) -> Result<Recompute, TFError> {
        // Filters are addressed by their text, which must stay unique
        if self.filters.contains_key(expr.key()) || self.key_of(&expr.canonical_text()).is_some() {
            return Err(TFError::DuplicateFilter(expr.canonical_text()));
        }
        debug!("Adding filter \"{}\"", expr.key());
        expr.set_enabled(true);
        let predicate = expr.predicate().clone();
        self.filters.insert(expr.key().clone(), expr);
        Ok(Recompute::Narrow(predicate))
    }

    pub fn remove(&mut self, key: &FilterKey) -> Recompute {
        match self.filters.shift_remove(key) {
            Some(expr) => {
                debug!("Removed filter \"{}\"", expr.key());
                Recompute::Full
            }
            None => Recompute::Unchanged,
        }
    }

    pub fn toggle(&mut self, key: &FilterKey) -> Result<Recompute, TFError> {
        let expr = self
            .filters
            .get_mut(key)
            .ok_or_else(|| TFError::UnknownFilter(key.canonical_text()))?;
        let enabled = !expr.enabled();
        expr.set_enabled(enabled);
        debug!("Filter \"{key}\" enabled: {enabled}");
        if enabled {
            Ok(Recompute::Narrow(expr.predicate().clone()))
        } else {
            Ok(Recompute::Full)
        }
    }

    pub fn clear(&mut self) -> Recompute {
        debug!("Clearing {} filters", self.filters.len());
        self.filters.clear();
        Recompute::Full
    }

    /// Drop filters that no longer fit the new table and disarm the others.
    pub fn on_table_reloaded(&mut self, classification: &Classification) -> Recompute {
        let previous = std::mem::take(&mut self.filters);
        for (key, _) in previous {
            let source = format!("{}{} {}", key.column, key.operator.symbol(), key.value);
            match parse(&source, key.negated, classification) {
                Ok(mut expr) => {
                    expr.set_enabled(false);
                    self.filters.insert(key, expr);
                }
                Err(e) => warn!("Dropping filter \"{key}\" after reload: {e}"),
            }
        }
        Recompute::Full
    }

    pub fn enabled_predicates(&self) -> Vec<&Predicate> {
        self.filters
            .values()
            .filter(|f| f.enabled())
            .map(|f| f.predicate())
            .collect()
    }

    pub fn highlighted_columns(&self) -> BTreeSet<String> {
        self.filters
            .values()
            .filter(|f| f.enabled())
            .map(|f| f.column().to_string())
            .collect()
    }

    /// Key of the filter whose canonical text is `text`.
    pub fn key_of(&self, text: &str) -> Option<&FilterKey> {
        self.filters.keys().find(|k| k.canonical_text() == text)
    }

    pub fn get(&self, key: &FilterKey) -> Option<&FilterExpression> {
        self.filters.get(key)
    }

    pub fn get_index(&self, idx: usize) -> Option<&FilterExpression> {
        self.filters.get_index(idx).map(|(_, f)| f)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterExpression> {
        self.filters.values()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
