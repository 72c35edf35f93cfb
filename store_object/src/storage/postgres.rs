//! PostgreSQL storage via sqlx
//!
//! Rows are read back as `to_jsonb(r)` so one code path serves every model. Parameters
//! are bound with the type of the column they are compared against or written to.

use super::{Executor, Row, Storage, Transaction};
use crate::errors::StoreError;
use crate::query_builder::{QueryBuilder, QueryParam, UpdateSet};
use crate::schema::{quote_identifier, TableSchema};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use config::DatabaseConfig;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::{PgPool, Postgres, Row as _};
use std::time::Duration;
use tracing::{debug, trace};
use uuid::Uuid;

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Bind a JSON value by sniffing its shape, for columns whose type is unknown
macro_rules! bind_json_param {
    ($query:expr, $param:expr) => {
        match $param {
            Value::String(s) => {
                // Try to parse as RFC3339 timestamp first
                if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
                    $query.bind(dt.with_timezone(&Utc))
                } else if let Ok(uuid) = Uuid::parse_str(&s) {
                    $query.bind(uuid)
                } else {
                    $query.bind(s)
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    $query.bind(i)
                } else if let Some(f) = n.as_f64() {
                    $query.bind(f)
                } else {
                    $query.bind(n.to_string())
                }
            }
            Value::Bool(b) => $query.bind(b),
            Value::Null => $query.bind(Option::<String>::None),
            other => $query.bind(sqlx::types::Json(other)),
        }
    };
}

#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool sized and timed from the database configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let connection_string = config.connection_string();

        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&connection_string).await?;
        debug!(
            "[POSTGRES] connected to {}:{}/{}",
            config.host, config.port, config.database
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn join_clauses(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `INSERT ... RETURNING to_jsonb(r)`. Null values are left out so column defaults apply.
pub fn insert_sql(schema: &TableSchema, row: &Row) -> (String, Vec<QueryParam>) {
    let table = quote_identifier(&schema.name);
    let values: Vec<(&String, &Value)> = row.iter().filter(|(_, v)| !v.is_null()).collect();

    if values.is_empty() {
        return (
            format!("INSERT INTO {} AS r DEFAULT VALUES RETURNING to_jsonb(r) AS row", table),
            Vec::new(),
        );
    }

    let columns: Vec<String> = values.iter().map(|(c, _)| quote_identifier(c)).collect();
    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("${}", i)).collect();
    let params = values
        .into_iter()
        .map(|(c, v)| QueryParam::new(c, v.clone()))
        .collect();

    (
        format!(
            "INSERT INTO {} AS r ({}) VALUES ({}) RETURNING to_jsonb(r) AS row",
            table,
            columns.join(", "),
            placeholders.join(", ")
        ),
        params,
    )
}

pub fn select_sql(schema: &TableSchema, query: &QueryBuilder) -> (String, Vec<QueryParam>) {
    let (where_clause, order_clause, limit_clause, params) = query.build();
    let base = format!(
        "SELECT to_jsonb(r) AS row FROM {} AS r",
        quote_identifier(&schema.name)
    );
    (
        join_clauses(&[
            base.as_str(),
            where_clause.as_str(),
            order_clause.as_str(),
            limit_clause.as_str(),
        ]),
        params,
    )
}

pub fn count_sql(schema: &TableSchema, query: &QueryBuilder) -> (String, Vec<QueryParam>) {
    let (where_clause, params) = query.build_where_clause();
    let base = format!("SELECT COUNT(*) FROM {}", quote_identifier(&schema.name));
    (join_clauses(&[base.as_str(), where_clause.as_str()]), params)
}

/// SET placeholders come first, WHERE placeholders continue the numbering
pub fn update_sql(
    schema: &TableSchema,
    update: &UpdateSet,
    query: &QueryBuilder,
) -> (String, Vec<QueryParam>) {
    let (set_clause, mut params, next) = update.to_sql(1);
    let (where_clause, where_params) = query.build_where_clause_from(next);
    params.extend(where_params);

    let base = format!("UPDATE {}", quote_identifier(&schema.name));
    (
        join_clauses(&[base.as_str(), set_clause.as_str(), where_clause.as_str()]),
        params,
    )
}

pub fn delete_sql(schema: &TableSchema, query: &QueryBuilder) -> (String, Vec<QueryParam>) {
    let (where_clause, params) = query.build_where_clause();
    let base = format!("DELETE FROM {}", quote_identifier(&schema.name));
    (join_clauses(&[base.as_str(), where_clause.as_str()]), params)
}

fn type_error(schema: &TableSchema, column: &str, sql_type: &str, value: &Value) -> StoreError {
    StoreError::validation(
        &schema.name,
        column,
        format!("cannot bind {} as {}", value, sql_type),
    )
}

/// Bind one parameter using its column's declared SQL type
fn bind_param<'q>(
    query: PgQuery<'q>,
    schema: &TableSchema,
    param: QueryParam,
) -> Result<PgQuery<'q>, StoreError> {
    let Some(sql_type) = schema.sql_type_of(&param.column) else {
        return Ok(bind_json_param!(query, param.value));
    };
    let column = param.column.as_str();
    let value = param.value;
    let invalid = || type_error(schema, column, sql_type, &value);

    let bound = match sql_type {
        "UUID" => match value.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
            Some(uuid) => query.bind(uuid),
            None if value.is_null() => query.bind(Option::<Uuid>::None),
            None => return Err(invalid()),
        },
        t if t.starts_with("TIMESTAMP") => {
            match value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            {
                Some(dt) => query.bind(dt.with_timezone(&Utc)),
                None if value.is_null() => query.bind(Option::<DateTime<Utc>>::None),
                None => return Err(invalid()),
            }
        }
        "DATE" => match value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        {
            Some(date) => query.bind(date),
            None if value.is_null() => query.bind(Option::<NaiveDate>::None),
            None => return Err(invalid()),
        },
        "SMALLINT" => match value.as_i64().and_then(|i| i16::try_from(i).ok()) {
            Some(i) => query.bind(i),
            None if value.is_null() => query.bind(Option::<i16>::None),
            None => return Err(invalid()),
        },
        "INTEGER" => match value.as_i64().and_then(|i| i32::try_from(i).ok()) {
            Some(i) => query.bind(i),
            None if value.is_null() => query.bind(Option::<i32>::None),
            None => return Err(invalid()),
        },
        "BIGINT" => match value.as_i64() {
            Some(i) => query.bind(i),
            None if value.is_null() => query.bind(Option::<i64>::None),
            None => return Err(invalid()),
        },
        // u64 columns; bigint has an implicit cast to numeric
        t if t.starts_with("NUMERIC") => match (value.as_i64(), value.as_f64()) {
            (Some(i), _) => query.bind(i),
            (None, Some(f)) => query.bind(f),
            _ if value.is_null() => query.bind(Option::<i64>::None),
            _ => return Err(invalid()),
        },
        "REAL" => match value.as_f64() {
            Some(f) => query.bind(f as f32),
            None if value.is_null() => query.bind(Option::<f32>::None),
            None => return Err(invalid()),
        },
        "DOUBLE PRECISION" => match value.as_f64() {
            Some(f) => query.bind(f),
            None if value.is_null() => query.bind(Option::<f64>::None),
            None => return Err(invalid()),
        },
        "BOOLEAN" => match value.as_bool() {
            Some(b) => query.bind(b),
            None if value.is_null() => query.bind(Option::<bool>::None),
            None => return Err(invalid()),
        },
        "JSONB" | "JSON" => query.bind(sqlx::types::Json(value.clone())),
        "TEXT[]" => match serde_json::from_value::<Option<Vec<String>>>(value.clone()) {
            Ok(items) => query.bind(items),
            Err(_) => return Err(invalid()),
        },
        _ => match &value {
            Value::String(s) => query.bind(s.clone()),
            Value::Null => query.bind(Option::<String>::None),
            other => bind_json_param!(query, other.clone()),
        },
    };
    Ok(bound)
}

fn bind_all<'q>(
    sql: &'q str,
    schema: &TableSchema,
    params: Vec<QueryParam>,
) -> Result<PgQuery<'q>, StoreError> {
    params
        .into_iter()
        .try_fold(sqlx::query(sql), |query, param| bind_param(query, schema, param))
}

fn json_row(row: sqlx::postgres::PgRow, table: &str) -> Result<Row, StoreError> {
    let value: Value = row
        .try_get("row")
        .map_err(|e| StoreError::database_operation(table, "decode", e))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::validation(
            table,
            "row",
            format!("expected a JSON object, got {}", other),
        )),
    }
}

async fn run_insert<'e, E>(exec: E, schema: &TableSchema, row: Row) -> Result<Row, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let (sql, params) = insert_sql(schema, &row);
    debug!("[INSERT] SQL: {}", sql);
    let stored = bind_all(&sql, schema, params)?
        .fetch_one(exec)
        .await
        .map_err(|e| StoreError::database_operation(&schema.name, "insert", e))?;
    json_row(stored, &schema.name)
}

async fn run_select<'e, E>(
    exec: E,
    schema: &TableSchema,
    query: &QueryBuilder,
) -> Result<Vec<Row>, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let (sql, params) = select_sql(schema, query);
    debug!("[SELECT] SQL: {}", sql);
    trace!("[SELECT] params count: {}", params.len());
    bind_all(&sql, schema, params)?
        .fetch_all(exec)
        .await
        .map_err(|e| StoreError::database_operation(&schema.name, "select", e))?
        .into_iter()
        .map(|row| json_row(row, &schema.name))
        .collect()
}

async fn run_count<'e, E>(exec: E, schema: &TableSchema, query: &QueryBuilder) -> Result<i64, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let (sql, params) = count_sql(schema, query);
    debug!("[COUNT] SQL: {}", sql);
    let row = bind_all(&sql, schema, params)?
        .fetch_one(exec)
        .await
        .map_err(|e| StoreError::database_operation(&schema.name, "count", e))?;
    row.try_get::<i64, _>(0)
        .map_err(|e| StoreError::database_operation(&schema.name, "count", e))
}

async fn run_update<'e, E>(
    exec: E,
    schema: &TableSchema,
    update: &UpdateSet,
    query: &QueryBuilder,
) -> Result<u64, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    if update.is_empty() {
        return Ok(0);
    }
    let (sql, params) = update_sql(schema, update, query);
    debug!("[UPDATE_WHERE] Table: {}", schema.name);
    debug!("[UPDATE_WHERE] SQL: {}", sql);
    trace!("[UPDATE_WHERE] params count: {}", params.len());
    let result = bind_all(&sql, schema, params)?
        .execute(exec)
        .await
        .map_err(|e| StoreError::database_operation(&schema.name, "update", e))?;
    Ok(result.rows_affected())
}

async fn run_delete<'e, E>(exec: E, schema: &TableSchema, query: &QueryBuilder) -> Result<u64, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let (sql, params) = delete_sql(schema, query);
    debug!("[DELETE_WHERE] SQL: {}", sql);
    let result = bind_all(&sql, schema, params)?
        .execute(exec)
        .await
        .map_err(|e| StoreError::database_operation(&schema.name, "delete", e))?;
    Ok(result.rows_affected())
}

/// Autocommit executor over the pool
#[derive(Debug)]
pub struct PgPoolExecutor {
    pool: PgPool,
}

#[async_trait]
impl Executor for PgPoolExecutor {
    async fn insert(&mut self, schema: &TableSchema, row: Row) -> Result<Row, StoreError> {
        run_insert(&self.pool, schema, row).await
    }

    async fn select(&mut self, schema: &TableSchema, query: &QueryBuilder) -> Result<Vec<Row>, StoreError> {
        run_select(&self.pool, schema, query).await
    }

    async fn count(&mut self, schema: &TableSchema, query: &QueryBuilder) -> Result<i64, StoreError> {
        run_count(&self.pool, schema, query).await
    }

    async fn update(
        &mut self,
        schema: &TableSchema,
        update: &UpdateSet,
        query: &QueryBuilder,
    ) -> Result<u64, StoreError> {
        run_update(&self.pool, schema, update, query).await
    }

    async fn delete(&mut self, schema: &TableSchema, query: &QueryBuilder) -> Result<u64, StoreError> {
        run_delete(&self.pool, schema, query).await
    }
}

/// Wraps a `sqlx::Transaction`; sqlx rolls back when it is dropped uncommitted
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Executor for PgTransaction {
    async fn insert(&mut self, schema: &TableSchema, row: Row) -> Result<Row, StoreError> {
        run_insert(&mut *self.tx, schema, row).await
    }

    async fn select(&mut self, schema: &TableSchema, query: &QueryBuilder) -> Result<Vec<Row>, StoreError> {
        run_select(&mut *self.tx, schema, query).await
    }

    async fn count(&mut self, schema: &TableSchema, query: &QueryBuilder) -> Result<i64, StoreError> {
        run_count(&mut *self.tx, schema, query).await
    }

    async fn update(
        &mut self,
        schema: &TableSchema,
        update: &UpdateSet,
        query: &QueryBuilder,
    ) -> Result<u64, StoreError> {
        run_update(&mut *self.tx, schema, update, query).await
    }

    async fn delete(&mut self, schema: &TableSchema, query: &QueryBuilder) -> Result<u64, StoreError> {
        run_delete(&mut *self.tx, schema, query).await
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    fn as_executor(&mut self) -> &mut dyn Executor {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::transaction("commit", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StoreError::transaction("rollback", e))
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::transaction("begin", e))?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn executor(&self) -> Result<Box<dyn Executor>, StoreError> {
        Ok(Box::new(PgPoolExecutor {
            pool: self.pool.clone(),
        }))
    }

    async fn migrate(&self, schema: &TableSchema, recreate: bool) -> Result<(), StoreError> {
        let mut statements = Vec::new();
        if recreate {
            statements.push(schema.drop_table_sql());
        }
        statements.push(schema.create_table_sql());
        statements.extend(schema.create_indexes_sql());

        for sql in statements {
            debug!("[MIGRATE] SQL: {}", sql);
            sqlx::query(&sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::database_operation(&schema.name, "migrate", e))?;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation("", "ping", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::QueryFilter;
    use crate::schema::ColumnDef;
    use serde_json::json;

    fn parents() -> TableSchema {
        TableSchema::new("parents", "id")
            .column(ColumnDef::new("id", "UUID", false))
            .column(ColumnDef::new("name", "VARCHAR", false))
            .with_lifecycle()
    }

    #[test]
    fn insert_skips_nulls_and_returns_json() {
        let mut row = Row::new();
        row.insert("name".to_string(), json!("Parent#1"));
        row.insert("__deleted_at__".to_string(), Value::Null);

        let (sql, params) = insert_sql(&parents(), &row);
        assert_eq!(
            sql,
            "INSERT INTO \"parents\" AS r (\"name\") VALUES ($1) RETURNING to_jsonb(r) AS row"
        );
        assert_eq!(params, vec![QueryParam::new("name", json!("Parent#1"))]);
    }

    #[test]
    fn update_numbers_set_before_where() {
        let update = UpdateSet::new()
            .set("__deleted_at__", json!("2024-01-01T00:00:00Z"))
            .set("__updated_at__", json!("2024-01-01T00:00:00Z"));
        let query = QueryBuilder::new()
            .filter(QueryFilter::eq("parent_id", json!("p")))
            .filter(QueryFilter::is_null("__deleted_at__"));

        let (sql, params) = update_sql(&parents(), &update, &query);
        assert_eq!(
            sql,
            "UPDATE \"parents\" SET \"__deleted_at__\" = $1, \"__updated_at__\" = $2 \
             WHERE \"parent_id\" = $3 AND \"__deleted_at__\" IS NULL"
        );
        assert_eq!(params.len(), 3);
        assert_eq!(params[2].column, "parent_id");
    }

    #[test]
    fn select_count_and_delete_statements() {
        let query = QueryBuilder::new()
            .filter(QueryFilter::is_not_null("__deleted_at__"))
            .limit(5);

        let (select, _) = select_sql(&parents(), &query);
        assert_eq!(
            select,
            "SELECT to_jsonb(r) AS row FROM \"parents\" AS r WHERE \"__deleted_at__\" IS NOT NULL LIMIT 5"
        );

        let (count, _) = count_sql(&parents(), &query);
        assert_eq!(count, "SELECT COUNT(*) FROM \"parents\" WHERE \"__deleted_at__\" IS NOT NULL");

        let (delete, _) = delete_sql(&parents(), &QueryBuilder::new());
        assert_eq!(delete, "DELETE FROM \"parents\"");
    }

    #[test]
    fn binding_rejects_values_of_the_wrong_type() {
        let param = QueryParam::new("id", json!("not-a-uuid"));
        assert!(matches!(
            bind_param(sqlx::query("SELECT 1"), &parents(), param),
            Err(StoreError::Validation { .. })
        ));

        let param = QueryParam::new("__created_at__", json!("2024-01-01T00:00:00Z"));
        assert!(bind_param(sqlx::query("SELECT 1"), &parents(), param).is_ok());
    }
}
