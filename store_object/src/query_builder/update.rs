use crate::query_builder::sql_generation::QueryParam;
use crate::schema::quote_identifier;
use serde_json::Value;

/// Ordered list of `column = value` assignments for an UPDATE
///
/// Assignments keep insertion order so placeholder numbering is stable. Setting the
/// same column twice keeps the later value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSet {
    pub operations: Vec<(String, Value)>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field to a specific value (JSON null writes SQL NULL)
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        let field = field.into();
        match self.operations.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = value,
            None => self.operations.push((field, value)),
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.operations
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Build the SET clause. Nulls are inlined, everything else becomes `$n`.
    ///
    /// Returns the clause, the bound parameters and the next free placeholder number.
    pub fn to_sql(&self, first_param: usize) -> (String, Vec<QueryParam>, usize) {
        let mut params = Vec::new();
        let mut next = first_param;

        let assignments: Vec<String> = self
            .operations
            .iter()
            .map(|(field, value)| {
                if value.is_null() {
                    format!("{} = NULL", quote_identifier(field))
                } else {
                    params.push(QueryParam::new(field, value.clone()));
                    let sql = format!("{} = ${}", quote_identifier(field), next);
                    next += 1;
                    sql
                }
            })
            .collect();

        (format!("SET {}", assignments.join(", ")), params, next)
    }
}
