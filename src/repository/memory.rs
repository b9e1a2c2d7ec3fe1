use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::{cmp::Ordering, collections::HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Collection, DataClient, DataError, Filter, Query, Row};

/// InMemoryClient
///
/// A `DataClient` holding every collection in process memory. Used by the test suite
/// and by local runs started without `DATABASE_URL`. It applies the same column
/// whitelist and defaults as the database schema, and orders the way Postgres does
/// (nulls sort last ascending, first descending).
#[derive(Default)]
pub struct InMemoryClient {
    tables: RwLock<HashMap<Collection, Vec<Row>>>,
    /// When set, every operation fails with `DataError::Unavailable`.
    failure: Option<String>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose every call fails, for exercising error paths.
    pub fn new_failing(reason: &str) -> Self {
        Self {
            tables: RwLock::default(),
            failure: Some(reason.to_string()),
        }
    }

    fn available(&self) -> Result<(), DataError> {
        match &self.failure {
            Some(reason) => Err(DataError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

fn matches(row: &Row, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|f| row.get(&f.column).unwrap_or(&Value::Null) == &f.value)
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => {
            // Timestamps compare chronologically regardless of fractional-second width.
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => Ordering::Equal,
    }
}

fn sort_rows(rows: &mut [Row], query: &Query) {
    rows.sort_by(|a, b| {
        for order in &query.order {
            let left = a.get(&order.column).unwrap_or(&Value::Null);
            let right = b.get(&order.column).unwrap_or(&Value::Null);
            let ordering = compare_values(left, right);
            let ordering = if order.ascending {
                ordering
            } else {
                ordering.reverse()
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl DataClient for InMemoryClient {
    async fn select(&self, collection: Collection, query: &Query) -> Result<Vec<Row>, DataError> {
        self.available()?;
        query.check(collection)?;

        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(&collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        sort_rows(&mut rows, query);
        if let Some(limit) = query.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(rows)
    }

    async fn count(&self, collection: Collection, filters: &[Filter]) -> Result<i64, DataError> {
        self.available()?;
        filters
            .iter()
            .try_for_each(|f| collection.check_column(&f.column))?;

        let tables = self.tables.read().await;
        let count = tables
            .get(&collection)
            .map(|rows| rows.iter().filter(|row| matches(row, filters)).count())
            .unwrap_or(0);
        Ok(count as i64)
    }

    async fn insert(&self, collection: Collection, mut row: Row) -> Result<Row, DataError> {
        self.available()?;
        row.keys().try_for_each(|c| collection.check_column(c))?;

        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at").or_insert_with(now);
        row.entry("updated_at").or_insert_with(now);
        for (column, value) in collection.defaults() {
            row.entry(column).or_insert(value);
        }
        for column in collection.columns() {
            row.entry(*column).or_insert(Value::Null);
        }

        let mut tables = self.tables.write().await;
        tables.entry(collection).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        mut changes: Row,
    ) -> Result<Option<Row>, DataError> {
        self.available()?;
        for column in ["id", "created_at", "updated_at"] {
            changes.remove(column);
        }
        changes.keys().try_for_each(|c| collection.check_column(c))?;

        let key = Value::String(id.to_string());
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .get_mut(&collection)
            .and_then(|rows| rows.iter_mut().find(|row| row.get("id") == Some(&key)))
        else {
            return Ok(None);
        };

        row.extend(changes);
        row.insert("updated_at".to_string(), now());
        Ok(Some(row.clone()))
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, DataError> {
        self.available()?;
        let key = Value::String(id.to_string());
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&collection) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|row| row.get("id") != Some(&key));
        Ok(rows.len() < before)
    }
}
