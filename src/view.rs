use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, trace};

use crate::filter::Predicate;
use crate::table::{Column, ColumnValues, Table};

/// Rows currently visible (by row id, in display order) and the columns
/// under an enabled filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub rows: Arc<Vec<usize>>,
    pub highlights: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub column: String,
    pub ascending: bool,
}

/// Owns the [`ViewState`] and the sort history applied on top of it.
///
/// Sorts are remembered one entry per column, most recent last, and applied
/// together after every recompute so the display order only depends on the
/// visible rows and the history.
#[derive(Debug, Default)]
pub struct ViewDeriver {
    state: ViewState,
    sort: Vec<SortKey>,
}

impl ViewDeriver {
    pub fn new(table: &Table) -> Self {
        Self {
            state: ViewState {
                rows: Arc::new((0..table.nrows()).collect()),
                highlights: BTreeSet::new(),
            },
            sort: Vec::new(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    /// Row ids of the base table accepted by every predicate, in table order.
    ///
    /// Only the rows of a full recompute. Highlights come from the registry
    /// and are handed to [`refresh`](Self::refresh) with the predicates.
    pub fn visible_rows(table: &Table, predicates: &[&Predicate]) -> Vec<usize> {
        let Some(bound) = bind(table, predicates) else {
            return Vec::new();
        };
        (0..table.nrows())
            .filter(|&row| bound.iter().all(|(p, c)| p.accepts(c, row)))
            .collect()
    }

    pub fn refresh(
        &mut self,
        table: &Table,
        predicates: &[&Predicate],
        highlights: BTreeSet<String>,
    ) {
        let start_time = Instant::now();
        let mut rows = Self::visible_rows(table, predicates);
        self.order(table, &mut rows);
        trace!(
            "Full recompute with {} filters: {}/{} rows in {}ms",
            predicates.len(),
            rows.len(),
            table.nrows(),
            start_time.elapsed().as_millis()
        );
        self.state = ViewState {
            rows: Arc::new(rows),
            highlights,
        };
    }

    /// Keep only the visible rows `predicate` accepts. Order is preserved.
    pub fn narrow(&mut self, table: &Table, predicate: &Predicate, highlights: BTreeSet<String>) {
        let start_time = Instant::now();
        let rows: Vec<usize> = match bind(table, &[predicate]) {
            Some(bound) => {
                let (p, c) = bound[0];
                self.state
                    .rows
                    .iter()
                    .copied()
                    .filter(|&row| p.accepts(c, row))
                    .collect()
            }
            None => Vec::new(),
        };
        trace!(
            "Narrowed on {}: {} -> {} rows in {}ms",
            predicate.column(),
            self.state.rows.len(),
            rows.len(),
            start_time.elapsed().as_millis()
        );
        self.state = ViewState {
            rows: Arc::new(rows),
            highlights,
        };
    }

    /// Stable sort of the visible rows. Returns false for an unknown column.
    pub fn sort(&mut self, table: &Table, column: &str, ascending: bool) -> bool {
        if table.column(column).is_none() {
            return false;
        }
        self.sort.retain(|k| k.column != column);
        self.sort.push(SortKey {
            column: column.to_string(),
            ascending,
        });
        let mut rows = self.state.rows.as_ref().clone();
        self.order(table, &mut rows);
        self.state.rows = Arc::new(rows);
        true
    }

    /// Forget the sort history and return to table order.
    pub fn unsort(&mut self) {
        self.sort.clear();
        let mut rows = self.state.rows.as_ref().clone();
        rows.sort_unstable();
        self.state.rows = Arc::new(rows);
    }

    fn order(&self, table: &Table, rows: &mut [usize]) {
        let keys: Vec<(&Column, bool)> = self
            .sort
            .iter()
            .rev()
            .filter_map(|k| table.column(&k.column).map(|c| (c, k.ascending)))
            .collect();
        if keys.is_empty() {
            return;
        }
        rows.sort_by(|&a, &b| {
            keys.iter()
                .map(|(c, ascending)| compare_cells(c, a, b, *ascending))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }
}

fn bind<'t, 'p>(
    table: &'t Table,
    predicates: &[&'p Predicate],
) -> Option<Vec<(&'p Predicate, &'t Column)>> {
    predicates
        .iter()
        .map(|p| match table.column(p.column()) {
            Some(c) => Some((*p, c)),
            None => {
                error!("Filter on unknown column {}", p.column());
                None
            }
        })
        .collect()
}

// Missing cells go last in both directions. Missing text is stored empty.
fn compare_cells(column: &Column, a: usize, b: usize, ascending: bool) -> Ordering {
    let directed = |o: Ordering| if ascending { o } else { o.reverse() };
    match column.values() {
        ColumnValues::Numeric(v) => match (v[a], v[b]) {
            (Some(x), Some(y)) => directed(x.total_cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        ColumnValues::Text(v) => match (v[a].is_empty(), v[b].is_empty()) {
            (false, false) => directed(v[a].cmp(&v[b])),
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (true, true) => Ordering::Equal,
        },
    }
}

/// `"3 / 5 rows"` while filtered, `"5 rows"` otherwise.
pub fn hits(visible: usize, total: usize) -> String {
    if visible == total {
        format!("{total} rows")
    } else {
        format!("{visible} / {total} rows")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse;
    use crate::table::{classify, tests::languages};
    use polars::df;

    fn predicates(table: &Table, filters: &[&str]) -> Vec<Predicate> {
        let classification = classify(table);
        filters
            .iter()
            .map(|f| parse(f, false, &classification).unwrap().predicate().clone())
            .collect()
    }

    fn rows(table: &Table, filters: &[&str]) -> Vec<usize> {
        let owned = predicates(table, filters);
        let refs: Vec<&Predicate> = owned.iter().collect();
        ViewDeriver::visible_rows(table, &refs)
    }

    #[test]
    fn scenario_rows() {
        let table = languages();
        assert_eq!(rows(&table, &["Col2 : rust"]), [1]);
        assert_eq!(rows(&table, &["Col2 : java*"]), [2, 3]);
        assert_eq!(rows(&table, &["Col1 < 12"]), [0, 1]);
        assert_eq!(rows(&table, &[]), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn filters_compose_as_intersection() {
        let table = languages();
        let single: Vec<BTreeSet<usize>> = ["Col1 > 10", "Col2 : *a*", "Col1 <= 13"]
            .iter()
            .map(|f| rows(&table, &[f]).into_iter().collect())
            .collect();
        let expected: BTreeSet<usize> = single
            .iter()
            .skip(1)
            .fold(single[0].clone(), |acc, s| &acc & s);

        let combined = rows(&table, &["Col1 > 10", "Col2 : *a*", "Col1 <= 13"]);
        assert_eq!(combined.into_iter().collect::<BTreeSet<_>>(), expected);
        assert_eq!(expected, BTreeSet::from([2, 3]));
    }

    #[test]
    fn wildcard_keeps_non_missing_rows() {
        let df = df!(
            "n" => [Some(1.0), None, Some(3.0)],
            "s" => [Some("a"), Some("b"), None]
        )
        .unwrap();
        let table = Table::from_dataframe("t", &df).unwrap();
        assert_eq!(rows(&table, &["n = *"]), [0, 2]);
        assert_eq!(rows(&table, &["s : *"]), [0, 1]);
    }

    #[test]
    fn narrow_matches_full_recompute() {
        let table = languages();
        let owned = predicates(&table, &["Col1 > 10", "Col2 : j*"]);
        let mut view = ViewDeriver::new(&table);
        view.narrow(&table, &owned[0], BTreeSet::new());
        view.narrow(&table, &owned[1], BTreeSet::new());
        assert_eq!(
            *view.state().rows,
            ViewDeriver::visible_rows(&table, &[&owned[0], &owned[1]])
        );
    }

    #[test]
    fn sort_is_stable_and_keeps_visible_set() {
        let df = df!(
            "k" => [2, 1, 2, 1, 3],
            "s" => ["b", "a", "B", "c", "a"]
        )
        .unwrap();
        let table = Table::from_dataframe("t", &df).unwrap();
        let mut view = ViewDeriver::new(&table);

        assert!(view.sort(&table, "k", true));
        assert_eq!(*view.state().rows, [1, 3, 0, 2, 4]);

        assert!(view.sort(&table, "k", false));
        assert_eq!(*view.state().rows, [4, 0, 2, 1, 3]);

        // case-sensitive: uppercase first
        assert!(view.sort(&table, "s", true));
        assert_eq!(*view.state().rows, [2, 4, 1, 0, 3]);

        assert!(!view.sort(&table, "missing", true));

        view.unsort();
        assert_eq!(*view.state().rows, [0, 1, 2, 3, 4]);
        assert!(view.sort_keys().is_empty());
    }

    #[test]
    fn sort_survives_full_recompute() {
        let df = df!(
            "k" => [3, 1, 2, 1, 3],
            "s" => ["x", "y", "x", "x", "y"]
        )
        .unwrap();
        let table = Table::from_dataframe("t", &df).unwrap();
        let owned = predicates(&table, &["s : x"]);
        let mut view = ViewDeriver::new(&table);

        view.sort(&table, "s", false);
        view.sort(&table, "k", true);
        let sorted_all = view.state().rows.clone();
        assert_eq!(*sorted_all, [1, 3, 2, 4, 0]);

        view.narrow(&table, &owned[0], BTreeSet::new());
        let narrowed = view.state().rows.clone();
        assert_eq!(*narrowed, [3, 2, 0]);

        view.refresh(&table, &[&owned[0]], BTreeSet::new());
        assert_eq!(view.state().rows, narrowed);

        view.refresh(&table, &[], BTreeSet::new());
        assert_eq!(view.state().rows, sorted_all);
    }

    #[test]
    fn missing_numbers_sort_last() {
        let df = df!("n" => [None, Some(2.0), Some(1.0)]).unwrap();
        let table = Table::from_dataframe("t", &df).unwrap();
        let mut view = ViewDeriver::new(&table);
        view.sort(&table, "n", true);
        assert_eq!(*view.state().rows, [2, 1, 0]);
        view.sort(&table, "n", false);
        assert_eq!(*view.state().rows, [1, 2, 0]);
    }

    #[test]
    fn missing_text_sorts_last() {
        let df = df!("s" => [Some("b"), None, Some("a")]).unwrap();
        let table = Table::from_dataframe("t", &df).unwrap();
        let mut view = ViewDeriver::new(&table);
        view.sort(&table, "s", true);
        assert_eq!(*view.state().rows, [2, 0, 1]);
        view.sort(&table, "s", false);
        assert_eq!(*view.state().rows, [0, 2, 1]);
    }

    #[test]
    fn hit_count() {
        assert_eq!(hits(5, 5), "5 rows");
        assert_eq!(hits(2, 5), "2 / 5 rows");
    }
}
