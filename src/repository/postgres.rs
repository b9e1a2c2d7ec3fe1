use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder, types::Json};
use uuid::Uuid;

use super::{Collection, DataClient, DataError, Filter, Query, Row};

/// PostgresClient
///
/// `DataClient` backed by the hosted backend's Postgres database.
///
/// Rows travel as JSON: reads project whole rows with `to_jsonb(t)`, writes expand the
/// submitted object with `jsonb_populate_record` so column types are resolved by the
/// table itself. Column and table identifiers come only from the `Collection`
/// whitelist; every value is a bound parameter.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Creates a new client using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(builder: &mut QueryBuilder<'static, Postgres>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        builder.push(format!("to_jsonb(t.\"{}\") = ", filter.column));
        builder.push_bind(Json(filter.value.clone()));
    }
}

fn select_sql(collection: Collection, query: &Query) -> Result<QueryBuilder<'static, Postgres>, DataError> {
    query.check(collection)?;

    let mut builder = QueryBuilder::new(format!(
        "SELECT to_jsonb(t) FROM \"{}\" AS t",
        collection.table()
    ));
    push_filters(&mut builder, &query.filters);

    for (i, order) in query.order.iter().enumerate() {
        builder.push(if i == 0 { " ORDER BY " } else { ", " });
        builder.push(format!(
            "t.\"{}\" {}",
            order.column,
            if order.ascending { "ASC" } else { "DESC" }
        ));
    }

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
    Ok(builder)
}

fn count_sql(collection: Collection, filters: &[Filter]) -> Result<QueryBuilder<'static, Postgres>, DataError> {
    filters
        .iter()
        .try_for_each(|f| collection.check_column(&f.column))?;

    let mut builder = QueryBuilder::new(format!(
        "SELECT COUNT(*) FROM \"{}\" AS t",
        collection.table()
    ));
    push_filters(&mut builder, filters);
    Ok(builder)
}

fn insert_sql(collection: Collection, row: Row) -> Result<QueryBuilder<'static, Postgres>, DataError> {
    let columns: Vec<String> = row.keys().cloned().collect();
    columns.iter().try_for_each(|c| collection.check_column(c))?;

    let table = collection.table();
    if columns.is_empty() {
        return Ok(QueryBuilder::new(format!(
            "INSERT INTO \"{table}\" AS t DEFAULT VALUES RETURNING to_jsonb(t)"
        )));
    }

    let target = columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let source = columns
        .iter()
        .map(|c| format!("r.\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO \"{table}\" AS t ({target}) SELECT {source} FROM jsonb_populate_record(NULL::\"{table}\", "
    ));
    builder.push_bind(Json(Value::Object(row)));
    builder.push(") AS r RETURNING to_jsonb(t)");
    Ok(builder)
}

fn update_sql(collection: Collection, id: Uuid, mut changes: Row) -> Result<QueryBuilder<'static, Postgres>, DataError> {
    // The primary key and timestamps are never taken from the caller.
    for column in ["id", "created_at", "updated_at"] {
        changes.remove(column);
    }
    changes.keys().try_for_each(|c| collection.check_column(c))?;

    let table = collection.table();
    let mut assignments: Vec<String> = changes
        .keys()
        .map(|c| format!("\"{c}\" = r.\"{c}\""))
        .collect();
    assignments.push("\"updated_at\" = now()".to_string());

    let mut builder = QueryBuilder::new(format!(
        "UPDATE \"{table}\" AS t SET {} FROM jsonb_populate_record(NULL::\"{table}\", ",
        assignments.join(", ")
    ));
    builder.push_bind(Json(Value::Object(changes)));
    builder.push(") AS r WHERE t.\"id\" = ");
    builder.push_bind(id);
    builder.push(" RETURNING to_jsonb(t)");
    Ok(builder)
}

#[async_trait]
impl DataClient for PostgresClient {
    async fn select(&self, collection: Collection, query: &Query) -> Result<Vec<Row>, DataError> {
        let mut builder = select_sql(collection, query)?;
        let rows = builder
            .build_query_scalar::<Json<Row>>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|Json(row)| row).collect())
    }

    async fn count(&self, collection: Collection, filters: &[Filter]) -> Result<i64, DataError> {
        let mut builder = count_sql(collection, filters)?;
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert(&self, collection: Collection, row: Row) -> Result<Row, DataError> {
        let mut builder = insert_sql(collection, row)?;
        let Json(stored) = builder
            .build_query_scalar::<Json<Row>>()
            .fetch_one(&self.pool)
            .await?;
        tracing::debug!(table = collection.table(), "row inserted");
        Ok(stored)
    }

    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        changes: Row,
    ) -> Result<Option<Row>, DataError> {
        let mut builder = update_sql(collection, id, changes)?;
        let updated = builder
            .build_query_scalar::<Json<Row>>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated.map(|Json(row)| row))
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, DataError> {
        let result = sqlx::query(&format!(
            "DELETE FROM \"{}\" WHERE \"id\" = $1",
            collection.table()
        ))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn select_orders_and_filters_with_bound_values() {
        let query = Query::new()
            .eq("status", "upcoming")
            .order("event_date", true)
            .limit(5);
        let builder = select_sql(Collection::Events, &query).unwrap();
        assert_eq!(
            builder.sql(),
            "SELECT to_jsonb(t) FROM \"events\" AS t WHERE to_jsonb(t.\"status\") = $1 \
             ORDER BY t.\"event_date\" ASC LIMIT $2"
        );
    }

    #[test]
    fn select_applies_order_keys_in_sequence() {
        let query = Query::new()
            .order("is_featured", false)
            .order("created_at", false);
        let builder = select_sql(Collection::ProjectSubmissions, &query).unwrap();
        assert!(
            builder
                .sql()
                .ends_with("ORDER BY t.\"is_featured\" DESC, t.\"created_at\" DESC")
        );
    }

    #[test]
    fn unknown_columns_never_reach_sql() {
        let query = Query::new().eq("id; DROP TABLE events", 1);
        assert!(matches!(
            select_sql(Collection::Events, &query),
            Err(DataError::UnknownColumn { .. })
        ));

        let bad = row(json!({ "title": "x", "is_admin": true }));
        assert!(insert_sql(Collection::Events, bad).is_err());
    }

    #[test]
    fn insert_lists_only_submitted_columns() {
        let builder = insert_sql(
            Collection::Partnerships,
            row(json!({ "name": "Acme", "description": "Tools" })),
        )
        .unwrap();
        let sql = builder.sql();
        assert!(sql.starts_with("INSERT INTO \"partnerships\" AS t ("));
        assert!(sql.contains("r.\"name\"") && sql.contains("r.\"description\""));
        assert!(!sql.contains("\"created_at\""));
        assert!(sql.contains("jsonb_populate_record(NULL::\"partnerships\", $1)"));
        assert!(sql.ends_with("RETURNING to_jsonb(t)"));
    }

    #[test]
    fn update_ignores_key_and_stamps_updated_at() {
        let builder = update_sql(
            Collection::ProjectSubmissions,
            Uuid::nil(),
            row(json!({ "id": "other", "is_featured": true })),
        )
        .unwrap();
        assert_eq!(
            builder.sql(),
            "UPDATE \"project_submissions\" AS t SET \"is_featured\" = r.\"is_featured\", \
             \"updated_at\" = now() FROM jsonb_populate_record(NULL::\"project_submissions\", $1) \
             AS r WHERE t.\"id\" = $2 RETURNING to_jsonb(t)"
        );
    }

    #[test]
    fn count_with_filter() {
        let filters = vec![Filter {
            column: "published".to_string(),
            value: Value::Bool(true),
        }];
        let builder = count_sql(Collection::Posts, &filters).unwrap();
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM \"posts\" AS t WHERE to_jsonb(t.\"published\") = $1"
        );
    }
}
