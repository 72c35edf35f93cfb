use crate::query_builder::{QueryBuilder, QueryFilter, QueryParam, SortOrder, UpdateSet};
use crate::storage::Row;
use serde_json::{json, Value};

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

// ========================================
// SQL generation
// ========================================

#[test]
fn test_where_clause_numbers_params_in_order() {
    let query = QueryBuilder::new()
        .filter(QueryFilter::eq("parent_id", json!("a")))
        .filter(QueryFilter::is_null("__deleted_at__"))
        .filter(QueryFilter::in_values("name", vec![json!("x"), json!("y")]));

    let (sql, params) = query.build_where_clause();

    assert_eq!(
        sql,
        "WHERE \"parent_id\" = $1 AND \"__deleted_at__\" IS NULL AND \"name\" IN ($2, $3)"
    );
    assert_eq!(
        params,
        vec![
            QueryParam::new("parent_id", json!("a")),
            QueryParam::new("name", json!("x")),
            QueryParam::new("name", json!("y")),
        ]
    );
}

#[test]
fn test_where_clause_from_offset() {
    let query = QueryBuilder::new().filter(QueryFilter::eq("id", json!(7)));
    let (sql, params) = query.build_where_clause_from(3);

    assert_eq!(sql, "WHERE \"id\" = $3");
    assert_eq!(params.len(), 1);
}

#[test]
fn test_empty_in_and_not_in() {
    let (sql, params) = QueryBuilder::new()
        .filter(QueryFilter::in_values("status", vec![]))
        .filter(QueryFilter::not_in_values("kind", vec![]))
        .build_where_clause();

    assert_eq!(sql, "WHERE 1=0 AND 1=1");
    assert!(params.is_empty());
}

#[test]
fn test_nested_groups() {
    let query = QueryBuilder::new().filter(QueryFilter::or(vec![
        QueryFilter::eq("status", json!("active")),
        QueryFilter::and(vec![
            QueryFilter::gt("age", json!(18)),
            QueryFilter::lte("age", json!(65)),
        ]),
    ]));

    let (sql, params) = query.build_where_clause();
    assert_eq!(
        sql,
        "WHERE (\"status\" = $1 OR (\"age\" > $2 AND \"age\" <= $3))"
    );
    assert_eq!(params.len(), 3);
}

#[test]
fn test_eq_null_becomes_is_null() {
    let (sql, params) = QueryBuilder::new()
        .filter(QueryFilter::eq("__deleted_at__", Value::Null))
        .build_where_clause();

    assert_eq!(sql, "WHERE \"__deleted_at__\" IS NULL");
    assert!(params.is_empty());
}

#[test]
fn test_field_names_are_quoted() {
    let (sql, _) = QueryBuilder::new()
        .filter(QueryFilter::eq("name\"; DROP TABLE x; --", json!(1)))
        .build_where_clause();

    assert_eq!(sql, "WHERE \"name\"\"; DROP TABLE x; --\" = $1");
}

#[test]
fn test_order_and_limit() {
    let (where_clause, order, limit, _) = QueryBuilder::new()
        .order_by("__created_at__", SortOrder::Desc)
        .order_by("name", SortOrder::Asc)
        .limit(10)
        .offset(20)
        .build();

    assert_eq!(where_clause, "");
    assert_eq!(order, "ORDER BY \"__created_at__\" DESC, \"name\" ASC");
    assert_eq!(limit, "LIMIT 10 OFFSET 20");
}

#[test]
fn test_conditions_only_drops_paging() {
    let query = QueryBuilder::new()
        .filter(QueryFilter::eq("a", json!(1)))
        .order_by("a", SortOrder::Asc)
        .limit(1)
        .conditions_only();

    assert_eq!(query.conditions().len(), 1);
    assert!(query.ordering().is_empty());
    assert_eq!(query.limit_value(), None);
}

#[test]
fn test_update_set_sql() {
    let update = UpdateSet::new()
        .set("__deleted_at__", json!("2024-01-01T00:00:00Z"))
        .set("__updated_at__", json!("2024-01-01T00:00:00Z"))
        .set("__deleted_at__", Value::Null);

    let (sql, params, next) = update.to_sql(1);

    assert_eq!(sql, "SET \"__deleted_at__\" = NULL, \"__updated_at__\" = $1");
    assert_eq!(params, vec![QueryParam::new("__updated_at__", json!("2024-01-01T00:00:00Z"))]);
    assert_eq!(next, 2);
    assert_eq!(update.len(), 2);
}

// ========================================
// In-process evaluation
// ========================================

#[test]
fn test_matches_null_semantics() {
    let alive = row(json!({"id": 1, "__deleted_at__": null}));
    let dead = row(json!({"id": 2, "__deleted_at__": "2024-05-01T10:00:00Z"}));

    let is_alive = QueryFilter::is_null("__deleted_at__");
    assert!(is_alive.matches(&alive));
    assert!(!is_alive.matches(&dead));

    // Comparing NULL with a value never matches, in either direction
    let ne = QueryFilter::ne("__deleted_at__", json!("2024-05-01T10:00:00Z"));
    assert!(!ne.matches(&alive));
    assert!(!ne.matches(&dead));
}

#[test]
fn test_matches_timestamps_across_offsets() {
    let record = row(json!({"at": "2024-05-01T10:00:00+00:00"}));

    assert!(QueryFilter::eq("at", json!("2024-05-01T10:00:00Z")).matches(&record));
    assert!(QueryFilter::gt("at", json!("2024-05-01T09:59:59Z")).matches(&record));
    assert!(QueryFilter::lt("at", json!("2024-05-01T12:00:00+01:00")).matches(&record));
}

#[test]
fn test_matches_numbers_and_in() {
    let record = row(json!({"count": 5, "kind": "b"}));

    assert!(QueryFilter::gte("count", json!(5.0)).matches(&record));
    assert!(!QueryFilter::lt("count", json!(5)).matches(&record));
    assert!(QueryFilter::in_values("kind", vec![json!("a"), json!("b")]).matches(&record));
    assert!(!QueryFilter::not_in_values("kind", vec![json!("b")]).matches(&record));
    assert!(!QueryFilter::in_values("kind", vec![]).matches(&record));
}

#[test]
fn test_matches_like_patterns() {
    let record = row(json!({"name": "Parent#12"}));

    assert!(QueryFilter::like("name", "Parent#%").matches(&record));
    assert!(QueryFilter::like("name", "Parent#__").matches(&record));
    assert!(!QueryFilter::like("name", "parent%").matches(&record));
    assert!(QueryFilter::ilike("name", "parent%").matches(&record));
}

#[test]
fn test_sort_rows_nulls_last() {
    use crate::query_builder::evaluate::sort_rows;

    let mut rows = vec![
        row(json!({"n": null})),
        row(json!({"n": 3})),
        row(json!({"n": 1})),
    ];
    sort_rows(&mut rows, &[("n".to_string(), SortOrder::Asc)]);

    let values: Vec<Value> = rows.iter().map(|r| r["n"].clone()).collect();
    assert_eq!(values, vec![json!(1), json!(3), Value::Null]);
}
