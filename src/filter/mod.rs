//! Typed filter expressions over a [`Table`](crate::table::Table).
//!
//! A filter is written `<column><operator><value>`, parsed against the
//! table's column classification and compiled into a [`Predicate`]. The
//! [`FilterRegistry`] keeps every known filter keyed by its [`FilterKey`].

use std::fmt;

use regex::Regex;
use thiserror::Error;

use crate::table::{Column, ColumnValues};

pub mod parser;
pub mod registry;

pub use parser::parse;
pub use registry::{FilterRegistry, Recompute};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("Cannot read a filter from \"{0}\", expected <column> <operator> <value>")]
    Unparseable(String),
    #[error("\"{0}\" is not a column of this file")]
    UnknownColumn(String),
    #[error("Invalid filter value \"{0}\"")]
    InvalidValue(String),
    #[error("Operators allowed for the {kind} column {column}: {allowed}")]
    OperatorMismatch {
        column: String,
        kind: &'static str,
        allowed: &'static str,
    },
    #[error("Filter value \"{0}\" must be a number")]
    NotANumber(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
        }
    }

    fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Operator::Eq => lhs == rhs,
            Operator::Lt => lhs < rhs,
            Operator::Lte => lhs <= rhs,
            Operator::Gt => lhs > rhs,
            Operator::Gte => lhs >= rhs,
        }
    }
}

/// Identity of a filter. Its `Display` is the canonical text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterKey {
    pub column: String,
    pub operator: Operator,
    pub value: String,
    pub negated: bool,
}

impl FilterKey {
    pub fn canonical_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "not ")?;
        }
        write!(f, "{}{} {}", self.column, self.operator.symbol(), self.value)
    }
}

#[derive(Debug, Clone)]
pub enum Test {
    Compare(Operator, f64),
    /// Numeric cell is not missing.
    Present,
    /// Case-insensitive full match of a translated glob.
    Matches(Regex),
    /// Text cell is not empty.
    NonEmpty,
}

#[derive(Debug, Clone)]
pub struct Predicate {
    column: String,
    test: Test,
    negated: bool,
}

impl Predicate {
    pub fn new(column: impl Into<String>, test: Test, negated: bool) -> Self {
        Self {
            column: column.into(),
            test,
            negated,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn test(&self) -> &Test {
        &self.test
    }

    /// `column` must be the table column this predicate names.
    pub fn accepts(&self, column: &Column, row: usize) -> bool {
        let hit = match (&self.test, column.values()) {
            (Test::Compare(op, rhs), ColumnValues::Numeric(v)) => {
                v[row].is_some_and(|lhs| op.compare(lhs, *rhs))
            }
            (Test::Present, ColumnValues::Numeric(v)) => v[row].is_some(),
            (Test::Matches(re), ColumnValues::Text(v)) => re.is_match(&v[row]),
            (Test::NonEmpty, ColumnValues::Text(v)) => !v[row].is_empty(),
            _ => false,
        };
        hit != self.negated
    }
}

#[derive(Debug, Clone)]
pub struct FilterExpression {
    key: FilterKey,
    predicate: Predicate,
    enabled: bool,
}

impl FilterExpression {
    pub fn new(key: FilterKey, predicate: Predicate) -> Self {
        Self {
            key,
            predicate,
            enabled: true,
        }
    }

    pub fn key(&self) -> &FilterKey {
        &self.key
    }

    pub fn canonical_text(&self) -> String {
        self.key.canonical_text()
    }

    pub fn column(&self) -> &str {
        &self.key.column
    }

    pub fn operator(&self) -> Operator {
        self.key.operator
    }

    pub fn raw_value(&self) -> &str {
        &self.key.value
    }

    pub fn negated(&self) -> bool {
        self.key.negated
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_text_carries_negation() {
        let key = FilterKey {
            column: "Col1".to_string(),
            operator: Operator::Lte,
            value: "12".to_string(),
            negated: true,
        };
        assert_eq!(key.canonical_text(), "not Col1<= 12");
    }

    #[test]
    fn missing_numbers_never_compare() {
        let df = polars::df!("n" => [Some(1.0), None]).unwrap();
        let table = crate::table::Table::from_dataframe("t", &df).unwrap();
        let column = table.column("n").unwrap();

        let lt = Predicate::new("n", Test::Compare(Operator::Lt, 5.0), false);
        assert!(lt.accepts(column, 0));
        assert!(!lt.accepts(column, 1));

        let not_lt = Predicate::new("n", Test::Compare(Operator::Lt, 5.0), true);
        assert!(!not_lt.accepts(column, 0));
        assert!(not_lt.accepts(column, 1));
    }

    #[test]
    fn mismatched_column_kind_rejects() {
        let df = polars::df!("s" => ["a"]).unwrap();
        let table = crate::table::Table::from_dataframe("t", &df).unwrap();
        let p = Predicate::new("s", Test::Present, false);
        assert!(!p.accepts(table.column("s").unwrap(), 0));
    }
}
