use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::{FilterError, FilterExpression, FilterKey, Operator, Predicate, Test};
use crate::table::{Classification, ColumnKind};

const TEXT_OPERATORS: &str = "':' or '='";
const NUMERIC_OPERATORS: &str = "'=', '<', '<=', '>' or '>='";

/// Parse `<column><operator><value>` into an enabled filter.
///
/// The first operator found splits the text. Column and value are trimmed.
pub fn parse(
    raw: &str,
    negated: bool,
    classification: &Classification,
) -> Result<FilterExpression, FilterError> {
    let result = parse_inner(raw, negated, classification);
    if let Err(e) = &result {
        debug!("Rejected filter {raw:?}: {e}");
    }
    result
}

fn parse_inner(
    raw: &str,
    negated: bool,
    classification: &Classification,
) -> Result<FilterExpression, FilterError> {
    let (column, symbol, value) =
        split(raw).ok_or_else(|| FilterError::Unparseable(raw.trim().to_string()))?;

    let kind = classification
        .kind_of(column)
        .ok_or_else(|| FilterError::UnknownColumn(column.to_string()))?;

    if !is_valid_value(value) {
        return Err(FilterError::InvalidValue(value.to_string()));
    }

    let operator = match (kind, symbol) {
        (ColumnKind::Text, ":" | "=") => Operator::Eq,
        (ColumnKind::Text, _) => {
            return Err(mismatch(column, kind, TEXT_OPERATORS));
        }
        (ColumnKind::Numeric, "=") => Operator::Eq,
        (ColumnKind::Numeric, "<") => Operator::Lt,
        (ColumnKind::Numeric, "<=") => Operator::Lte,
        (ColumnKind::Numeric, ">") => Operator::Gt,
        (ColumnKind::Numeric, ">=") => Operator::Gte,
        (ColumnKind::Numeric, _) => {
            return Err(mismatch(column, kind, NUMERIC_OPERATORS));
        }
    };

    let test = match (kind, value) {
        (ColumnKind::Numeric, "*") => Test::Present,
        (ColumnKind::Text, "*") => Test::NonEmpty,
        (ColumnKind::Numeric, _) => Test::Compare(operator, parse_number(value)?),
        (ColumnKind::Text, _) => Test::Matches(glob_to_regex(value)?),
    };

    let key = FilterKey {
        column: column.to_string(),
        operator,
        value: value.to_string(),
        negated,
    };
    Ok(FilterExpression::new(key, Predicate::new(column, test, negated)))
}

fn mismatch(column: &str, kind: ColumnKind, allowed: &'static str) -> FilterError {
    FilterError::OperatorMismatch {
        column: column.to_string(),
        kind: kind.label(),
        allowed,
    }
}

fn split(raw: &str) -> Option<(&str, &'static str, &str)> {
    let (idx, c) = raw.char_indices().find(|(_, c)| matches!(c, '<' | '>' | ':' | '='))?;
    let rest = &raw[idx + 1..];
    let symbol = match c {
        '<' if rest.starts_with('=') => "<=",
        '>' if rest.starts_with('=') => ">=",
        '<' => "<",
        '>' => ">",
        ':' => ":",
        _ => "=",
    };
    let value = &raw[idx + symbol.len()..];
    Some((raw[..idx].trim(), symbol, value.trim()))
}

fn is_valid_value(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '?' | '*' | ':' | ',' | '.' | '%' | ' '))
}

fn parse_number(value: &str) -> Result<f64, FilterError> {
    value
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| !n.is_nan())
        .ok_or_else(|| FilterError::NotANumber(value.to_string()))
}

fn glob_to_regex(value: &str) -> Result<Regex, FilterError> {
    let mut pattern = String::from("^");
    let mut literal = String::new();
    for c in value.chars() {
        if matches!(c, '*' | '?') {
            pattern.push_str(&regex::escape(&literal));
            literal.clear();
            pattern.push_str(if c == '*' { ".*" } else { "." });
        } else {
            literal.push(c);
        }
    }
    pattern.push_str(&regex::escape(&literal));
    pattern.push('$');

    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|_| FilterError::InvalidValue(value.to_string()))
}
