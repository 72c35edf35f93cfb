//! In-process evaluation of filters against JSON rows
//!
//! Used by the memory backend. Semantics follow PostgreSQL where it matters for
//! lifecycle queries: comparisons against NULL never match and NULLs sort last.

use crate::query_builder::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use crate::query_builder::ordering::SortOrder;
use crate::storage::Row;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

impl QueryFilter {
    /// Whether a row satisfies this filter
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            QueryFilter::Condition(condition) => condition.matches(row),
            QueryFilter::Group {
                operator: LogicalOperator::And,
                filters,
            } => filters.iter().all(|f| f.matches(row)),
            QueryFilter::Group {
                operator: LogicalOperator::Or,
                filters,
            } => filters.is_empty() || filters.iter().any(|f| f.matches(row)),
        }
    }
}

impl QueryCondition {
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(&self.field).unwrap_or(&Value::Null);

        match (&self.operator, &self.value) {
            (QueryOperator::IsNull, _) => actual.is_null(),
            (QueryOperator::IsNotNull, _) => !actual.is_null(),
            (QueryOperator::Eq, None) => actual.is_null(),
            (QueryOperator::Ne, None) => !actual.is_null(),
            (QueryOperator::Eq, Some(expected)) => {
                compare_values(actual, expected) == Some(Ordering::Equal)
            }
            (QueryOperator::Ne, Some(expected)) => matches!(
                compare_values(actual, expected),
                Some(Ordering::Less | Ordering::Greater)
            ),
            (QueryOperator::Gt, Some(expected)) => {
                compare_values(actual, expected) == Some(Ordering::Greater)
            }
            (QueryOperator::Gte, Some(expected)) => matches!(
                compare_values(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            (QueryOperator::Lt, Some(expected)) => {
                compare_values(actual, expected) == Some(Ordering::Less)
            }
            (QueryOperator::Lte, Some(expected)) => matches!(
                compare_values(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            (QueryOperator::Like, Some(Value::String(pattern))) => match actual {
                Value::String(text) => like_match(text, pattern),
                _ => false,
            },
            (QueryOperator::ILike, Some(Value::String(pattern))) => match actual {
                Value::String(text) => {
                    like_match(&text.to_lowercase(), &pattern.to_lowercase())
                }
                _ => false,
            },
            (QueryOperator::In, Some(Value::Array(candidates))) => candidates
                .iter()
                .any(|c| compare_values(actual, c) == Some(Ordering::Equal)),
            (QueryOperator::NotIn, Some(Value::Array(candidates))) => {
                !actual.is_null()
                    && candidates
                        .iter()
                        .all(|c| compare_values(actual, c) != Some(Ordering::Equal))
            }
            _ => false,
        }
    }
}

/// Compare two JSON values the way their SQL columns would compare.
///
/// Strings that both parse as RFC3339 compare as instants, numbers compare
/// numerically. Returns `None` when either side is NULL or the kinds differ.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::String(a), Value::String(b)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => Some(a.cmp(b)),
        },
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Number(a), Value::String(b)) => a.as_f64()?.partial_cmp(&b.parse::<f64>().ok()?),
        (Value::String(a), Value::Number(b)) => a.parse::<f64>().ok()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ if left == right => Some(Ordering::Equal),
        _ => None,
    }
}

/// Sort rows by the given columns. NULLs sort after values in ascending order.
pub fn sort_rows(rows: &mut [Row], order_by: &[(String, SortOrder)]) {
    if order_by.is_empty() {
        return;
    }

    rows.sort_by(|a, b| {
        for (field, order) in order_by {
            let left = a.get(field).unwrap_or(&Value::Null);
            let right = b.get(field).unwrap_or(&Value::Null);
            let ordering = match (left.is_null(), right.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => compare_values(left, right).unwrap_or(Ordering::Equal),
            };
            let ordering = match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// SQL LIKE matching: `%` is any run of characters, `_` is exactly one
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_match_from(&text, &pattern)
}

fn like_match_from(text: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('%', rest)) => (0..=text.len()).any(|skip| like_match_from(&text[skip..], rest)),
        Some(('_', rest)) => !text.is_empty() && like_match_from(&text[1..], rest),
        Some((c, rest)) => text.first() == Some(c) && like_match_from(&text[1..], rest),
    }
}
