//! Query builder utilities
//!
//! This module provides SQL query construction utilities.

use crate::query_builder::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use crate::query_builder::ordering::SortOrder;
use crate::schema::quote_identifier;
use serde_json::Value;

/// A bound parameter together with the column it is compared against.
///
/// The column lets the Postgres backend bind the value with the column's type.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParam {
    pub column: String,
    pub value: Value,
}

impl QueryParam {
    pub fn new(column: &str, value: Value) -> Self {
        Self {
            column: column.to_string(),
            value,
        }
    }
}

pub struct SqlGenerator;

impl SqlGenerator {
    /// Build WHERE clause from conditions, numbering placeholders from `first_param`
    pub fn build_where_clause(
        conditions: &[QueryFilter],
        first_param: usize,
    ) -> (String, Vec<QueryParam>) {
        if conditions.is_empty() {
            return ("".to_string(), Vec::new());
        }

        let mut values = Vec::new();
        let mut param_counter = first_param;

        let conditions_sql = conditions
            .iter()
            .map(|condition| Self::build_condition_sql(condition, &mut values, &mut param_counter))
            .collect::<Vec<_>>()
            .join(" AND ");

        if conditions_sql.is_empty() {
            ("".to_string(), values)
        } else {
            (format!("WHERE {}", conditions_sql), values)
        }
    }

    fn build_condition_sql(
        filter: &QueryFilter,
        values: &mut Vec<QueryParam>,
        param_counter: &mut usize,
    ) -> String {
        match filter {
            QueryFilter::Condition(condition) => {
                Self::build_single_condition_sql(condition, values, param_counter)
            }
            QueryFilter::Group { filters, .. } if filters.is_empty() => "1=1".to_string(),
            QueryFilter::Group { operator, filters } => {
                let operator_str = match operator {
                    LogicalOperator::And => " AND ",
                    LogicalOperator::Or => " OR ",
                };

                let group_conditions = filters
                    .iter()
                    .map(|f| Self::build_condition_sql(f, values, param_counter))
                    .collect::<Vec<_>>()
                    .join(operator_str);

                format!("({})", group_conditions)
            }
        }
    }

    fn push_param(
        field: &str,
        value: &Value,
        values: &mut Vec<QueryParam>,
        param_counter: &mut usize,
    ) -> String {
        values.push(QueryParam::new(field, value.clone()));
        let param = format!("${}", param_counter);
        *param_counter += 1;
        param
    }

    fn build_single_condition_sql(
        condition: &QueryCondition,
        values: &mut Vec<QueryParam>,
        param_counter: &mut usize,
    ) -> String {
        let field = quote_identifier(&condition.field);
        let name = condition.field.as_str();

        let binary = |symbol: &str, values: &mut Vec<QueryParam>, counter: &mut usize| {
            match &condition.value {
                Some(value) => {
                    let param = Self::push_param(name, value, values, counter);
                    format!("{} {} {}", field, symbol, param)
                }
                None => "1=0".to_string(),
            }
        };

        match &condition.operator {
            QueryOperator::Eq => match &condition.value {
                Some(value) if !value.is_null() => {
                    let param = Self::push_param(name, value, values, param_counter);
                    format!("{} = {}", field, param)
                }
                _ => format!("{} IS NULL", field),
            },
            QueryOperator::Ne => match &condition.value {
                Some(value) if !value.is_null() => {
                    let param = Self::push_param(name, value, values, param_counter);
                    format!("{} != {}", field, param)
                }
                _ => format!("{} IS NOT NULL", field),
            },
            QueryOperator::Gt => binary(">", values, param_counter),
            QueryOperator::Gte => binary(">=", values, param_counter),
            QueryOperator::Lt => binary("<", values, param_counter),
            QueryOperator::Lte => binary("<=", values, param_counter),
            QueryOperator::Like => binary("LIKE", values, param_counter),
            QueryOperator::ILike => binary("ILIKE", values, param_counter),
            QueryOperator::In | QueryOperator::NotIn => {
                let negated = condition.operator == QueryOperator::NotIn;
                match &condition.value {
                    Some(Value::Array(array_values)) if !array_values.is_empty() => {
                        let placeholders: Vec<String> = array_values
                            .iter()
                            .map(|value| Self::push_param(name, value, values, param_counter))
                            .collect();
                        let keyword = if negated { "NOT IN" } else { "IN" };
                        format!("{} {} ({})", field, keyword, placeholders.join(", "))
                    }
                    // Empty IN matches nothing, empty NOT IN matches everything
                    _ if negated => "1=1".to_string(),
                    _ => "1=0".to_string(),
                }
            }
            QueryOperator::IsNull => format!("{} IS NULL", field),
            QueryOperator::IsNotNull => format!("{} IS NOT NULL", field),
        }
    }

    /// Build ORDER BY clause
    pub fn build_order_clause(order_by: &[(String, SortOrder)]) -> String {
        if order_by.is_empty() {
            return "".to_string();
        }

        let order_items: Vec<String> = order_by
            .iter()
            .map(|(field, order)| format!("{} {}", quote_identifier(field), order.to_sql()))
            .collect();

        format!("ORDER BY {}", order_items.join(", "))
    }

    /// Build LIMIT/OFFSET clause
    pub fn build_limit_clause(limit: Option<i64>, offset: Option<i64>) -> String {
        let mut clauses = Vec::new();

        if let Some(limit) = limit {
            clauses.push(format!("LIMIT {}", limit));
        }

        if let Some(offset) = offset {
            clauses.push(format!("OFFSET {}", offset));
        }

        clauses.join(" ")
    }
}
