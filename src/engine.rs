use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::domain::TFError;
use crate::filter::{FilterExpression, FilterKey, FilterRegistry, Recompute, parse};
use crate::table::{Classification, Table, classify};
use crate::view::{SortKey, ViewDeriver, ViewState, hits};

/// A loaded table together with its filters and the derived view.
///
/// Every mutation leaves the view consistent with the enabled filters.
pub struct FilterEngine {
    table: Table,
    classification: Classification,
    registry: FilterRegistry,
    view: ViewDeriver,
}

impl FilterEngine {
    pub fn new(table: Table) -> Self {
        let classification = classify(&table);
        debug!(
            "Classified {} numeric and {} text columns",
            classification.numeric.len(),
            classification.text.len()
        );
        let view = ViewDeriver::new(&table);
        Self {
            table,
            classification,
            registry: FilterRegistry::new(),
            view,
        }
    }

    /// Parse `raw` against the current table and add it as an enabled filter.
    pub fn add_filter(&mut self, raw: &str, negated: bool) -> Result<FilterKey, TFError> {
        let expr = parse(raw, negated, &self.classification)?;
        let key = expr.key().clone();
        self.add(expr)?;
        Ok(key)
    }

    pub fn add(&mut self, expr: FilterExpression) -> Result<(), TFError> {
        let change = self.registry.add(expr)?;
        self.apply(change);
        Ok(())
    }

    /// Remove the filter with this canonical text. Returns false if unknown.
    pub fn remove(&mut self, canonical_text: &str) -> bool {
        match self.registry.key_of(canonical_text).cloned() {
            Some(key) => {
                let change = self.registry.remove(&key);
                self.apply(change);
                true
            }
            None => false,
        }
    }

    /// Flip the filter with this canonical text. Returns its new state.
    pub fn toggle(&mut self, canonical_text: &str) -> Result<bool, TFError> {
        let key = self
            .registry
            .key_of(canonical_text)
            .cloned()
            .ok_or_else(|| TFError::UnknownFilter(canonical_text.to_string()))?;
        let change = self.registry.toggle(&key)?;
        self.apply(change);
        Ok(self.registry.get(&key).is_some_and(|f| f.enabled()))
    }

    pub fn clear(&mut self) {
        let change = self.registry.clear();
        self.apply(change);
    }

    /// Swap in a freshly loaded table. Filters whose column is gone are
    /// dropped, the others are kept but disabled. The sort is reset.
    pub fn reload(&mut self, table: Table) {
        let classification = classify(&table);
        let before = self.registry.len();
        let change = self.registry.on_table_reloaded(&classification);
        info!(
            "Reloaded {}: kept {}/{} filters, disabled",
            table.title(),
            self.registry.len(),
            before
        );
        self.view = ViewDeriver::new(&table);
        self.table = table;
        self.classification = classification;
        self.apply(change);
    }

    pub fn sort(&mut self, column: usize, ascending: bool) -> bool {
        match self.table.column_at(column) {
            Some(c) => {
                let name = c.name().to_string();
                self.view.sort(&self.table, &name, ascending)
            }
            None => false,
        }
    }

    pub fn unsort(&mut self) {
        self.view.unsort();
    }

    fn apply(&mut self, change: Recompute) {
        let highlights = self.registry.highlighted_columns();
        match change {
            Recompute::Unchanged => {}
            Recompute::Narrow(predicate) => self.view.narrow(&self.table, &predicate, highlights),
            Recompute::Full => {
                let predicates = self.registry.enabled_predicates();
                self.view.refresh(&self.table, &predicates, highlights);
            }
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.registry
    }

    pub fn view_state(&self) -> &ViewState {
        self.view.state()
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        self.view.sort_keys()
    }

    pub fn row_count(&self) -> usize {
        self.view.state().rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.table.ncols()
    }

    /// Row id of the `row`-th visible row.
    pub fn row_id(&self, row: usize) -> Option<usize> {
        self.view.state().rows.get(row).copied()
    }

    /// Display value at a visible row and table column.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.row_id(row).and_then(|id| self.table.cell(id, column))
    }

    pub fn highlights(&self) -> &BTreeSet<String> {
        &self.view.state().highlights
    }

    pub fn hits(&self) -> String {
        hits(self.row_count(), self.table.nrows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::languages;
    use polars::df;

    fn visible(engine: &FilterEngine) -> Vec<usize> {
        engine.view_state().rows.to_vec()
    }

    #[test]
    fn scenario_a() {
        for (filter, expected) in [
            ("Col2 : rust", vec![1]),
            ("Col2 : java*", vec![2, 3]),
            ("Col1 < 12", vec![0, 1]),
        ] {
            let mut engine = FilterEngine::new(languages());
            engine.add_filter(filter, false).unwrap();
            assert_eq!(visible(&engine), expected, "{filter}");
        }
    }

    #[test]
    fn scenario_b_unknown_column() {
        let mut engine = FilterEngine::new(languages());
        let err = engine.add_filter("Col3 < 12", false).unwrap_err();
        assert!(matches!(err, TFError::FilterInvalid(_)));
        assert!(engine.filters().is_empty());
        assert_eq!(engine.row_count(), 5);
    }

    #[test]
    fn scenario_c_toggle() {
        let mut engine = FilterEngine::new(languages());
        engine.add_filter("Col1 < 12", false).unwrap();

        assert!(!engine.toggle("Col1< 12").unwrap());
        assert_eq!(visible(&engine), [0, 1, 2, 3, 4]);
        assert!(engine.highlights().is_empty());

        assert!(engine.toggle("Col1< 12").unwrap());
        assert_eq!(visible(&engine), [0, 1]);
        assert!(engine.highlights().contains("Col1"));
    }

    #[test]
    fn scenario_d_duplicate() {
        let mut engine = FilterEngine::new(languages());
        engine.add_filter("Col1 < 12", false).unwrap();
        let err = engine.add_filter("Col1 < 12", false).unwrap_err();
        assert!(matches!(err, TFError::DuplicateFilter(_)));
        assert_eq!(engine.filters().len(), 1);
        assert_eq!(visible(&engine), [0, 1]);
    }

    #[test]
    fn filters_sharing_a_text_cannot_coexist() {
        let df = df!("not Col1" => [1, 20], "Col1" => [5, 15]).unwrap();
        let mut engine = FilterEngine::new(Table::from_dataframe("t", &df).unwrap());
        engine.add_filter("not Col1 < 12", false).unwrap();
        let err = engine.add_filter("Col1 < 12", true).unwrap_err();
        assert!(matches!(err, TFError::DuplicateFilter(_)));

        assert!(!engine.toggle("not Col1< 12").unwrap());
        assert_eq!(engine.filters().len(), 1);
        assert_eq!(engine.row_count(), 2);
    }

    #[test]
    fn toggle_cycle_reproduces_the_view() {
        let mut engine = FilterEngine::new(languages());
        engine.add_filter("Col1 > 10", false).unwrap();
        engine.add_filter("Col2 : j*", false).unwrap();
        engine.toggle("Col1> 10").unwrap();
        engine.toggle("Col2= j*").unwrap();
        let baseline = engine.view_state().clone();

        engine.toggle("Col1> 10").unwrap();
        let once = engine.view_state().clone();

        engine.toggle("Col1> 10").unwrap();
        assert_eq!(engine.view_state(), &baseline);
        engine.toggle("Col1> 10").unwrap();
        assert_eq!(engine.view_state(), &once);
    }

    #[test]
    fn remove_then_add_round_trip() {
        let mut engine = FilterEngine::new(languages());
        engine.add_filter("Col1 > 10", false).unwrap();
        engine.add_filter("Col2 : *a*", false).unwrap();
        let before = engine.view_state().clone();

        assert!(engine.remove("Col2= *a*"));
        assert_eq!(visible(&engine), [1, 2, 3, 4]);
        assert!(!engine.remove("Col2= *a*"));

        engine.add_filter("Col2 = *a*", false).unwrap();
        assert_eq!(engine.view_state(), &before);
    }

    #[test]
    fn negated_filter() {
        let mut engine = FilterEngine::new(languages());
        engine.add_filter("Col2 : java*", true).unwrap();
        assert_eq!(visible(&engine), [0, 1, 4]);
        assert_eq!(engine.hits(), "3 / 5 rows");
    }

    #[test]
    fn clear_resets_view_and_highlights() {
        let mut engine = FilterEngine::new(languages());
        engine.add_filter("Col1 > 10", false).unwrap();
        engine.add_filter("Col2 : j*", false).unwrap();
        assert_eq!(
            engine.highlights(),
            &BTreeSet::from(["Col1".to_string(), "Col2".to_string()])
        );
        engine.clear();
        assert!(engine.filters().is_empty());
        assert!(engine.highlights().is_empty());
        assert_eq!(engine.hits(), "5 rows");
    }

    #[test]
    fn sort_is_kept_while_filtering() {
        let mut engine = FilterEngine::new(languages());
        assert!(engine.sort(1, true));
        // c++, java, javascript, python, rust
        assert_eq!(visible(&engine), [4, 3, 2, 0, 1]);

        engine.add_filter("Col1 >= 11", false).unwrap();
        assert_eq!(visible(&engine), [4, 3, 2, 1]);

        engine.toggle("Col1>= 11").unwrap();
        assert_eq!(visible(&engine), [4, 3, 2, 0, 1]);
        assert_eq!(engine.cell(0, 1), Some("c++"));
        assert_eq!(engine.row_id(0), Some(4));

        engine.unsort();
        assert_eq!(visible(&engine), [0, 1, 2, 3, 4]);
        assert!(!engine.sort(7, true));
    }

    #[test]
    fn reload_disarms_kept_filters() {
        let mut engine = FilterEngine::new(languages());
        engine.add_filter("Col1 < 12", false).unwrap();
        engine.add_filter("Col2 : rust", false).unwrap();
        engine.sort(0, false);

        let df = df!("Col1" => [1, 20, 5]).unwrap();
        engine.reload(Table::from_dataframe("other", &df).unwrap());

        assert_eq!(engine.filters().len(), 1);
        assert_eq!(visible(&engine), [0, 1, 2]);
        assert!(engine.highlights().is_empty());
        assert!(engine.sort_keys().is_empty());
        assert_eq!(engine.table().title(), "other");

        assert!(engine.toggle("Col1< 12").unwrap());
        assert_eq!(visible(&engine), [0, 2]);
    }
}
