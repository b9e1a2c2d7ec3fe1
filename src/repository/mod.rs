use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::InMemoryClient;
pub use postgres::PostgresClient;

/// A record as exchanged with the backend: a JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// Collection
///
/// The closed set of record collections in the hosted store. Each carries its table
/// name and column whitelist; identifiers pushed into SQL only ever come from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Profiles,
    Events,
    Posts,
    Partnerships,
    ProjectSubmissions,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Profiles => "profiles",
            Collection::Events => "events",
            Collection::Posts => "posts",
            Collection::Partnerships => "partnerships",
            Collection::ProjectSubmissions => "project_submissions",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Collection::Profiles => &[
                "id", "email", "full_name", "avatar_url", "bio", "organization", "role",
                "is_admin", "created_at", "updated_at",
            ],
            Collection::Events => &[
                "id", "title", "description", "event_date", "location", "image_url",
                "registration_link", "status", "created_by", "created_at", "updated_at",
            ],
            Collection::Posts => &[
                "id", "title", "content", "excerpt", "image_url", "published", "created_by",
                "created_at", "updated_at",
            ],
            Collection::Partnerships => &[
                "id", "name", "description", "logo_url", "website_url", "created_at",
                "updated_at",
            ],
            Collection::ProjectSubmissions => &[
                "id", "user_id", "title", "overview", "live_url", "github_url", "built_on",
                "built_on_other_text", "is_featured", "created_at", "updated_at",
            ],
        }
    }

    /// Column defaults mirrored from `migrations/`. Used by clients that do not have a
    /// database applying them (the in-memory client); `id` and timestamps are generated.
    pub fn defaults(&self) -> Vec<(&'static str, Value)> {
        match self {
            Collection::Profiles => vec![("is_admin", Value::Bool(false))],
            Collection::Events => vec![("status", Value::from("upcoming"))],
            Collection::Posts => vec![("published", Value::Bool(false))],
            Collection::Partnerships => vec![],
            Collection::ProjectSubmissions => vec![
                ("built_on", Value::from("windsurf")),
                ("is_featured", Value::Bool(false)),
            ],
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    /// Rejects any column outside the whitelist.
    pub fn check_column(&self, column: &str) -> Result<(), DataError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(DataError::UnknownColumn {
                collection: self.table(),
                column: column.to_string(),
            })
        }
    }
}

/// Equality filter: `column = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Query
///
/// A select against one collection: equality filters, ordering keys applied in
/// sequence, and an optional row limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<i64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks every filter and ordering column against the collection whitelist.
    pub fn check(&self, collection: Collection) -> Result<(), DataError> {
        self.filters
            .iter()
            .map(|f| f.column.as_str())
            .chain(self.order.iter().map(|o| o.column.as_str()))
            .try_for_each(|column| collection.check_column(column))
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("unknown column `{column}` on `{collection}`")]
    UnknownColumn {
        collection: &'static str,
        column: String,
    },
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("failed to decode record: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// DataClient
///
/// The generic data-access contract of the hosted backend: select, count, insert,
/// update and delete against named collections. Handlers only ever see this trait;
/// row-level security is the backend's business.
///
/// **Send + Sync + async_trait** make `Arc<dyn DataClient>` shareable across Axum tasks.
#[async_trait]
pub trait DataClient: Send + Sync {
    async fn select(&self, collection: Collection, query: &Query) -> Result<Vec<Row>, DataError>;

    async fn count(&self, collection: Collection, filters: &[Filter]) -> Result<i64, DataError>;

    /// Inserts one row; absent columns take their defaults. Returns the stored row.
    async fn insert(&self, collection: Collection, row: Row) -> Result<Row, DataError>;

    /// Applies `changes` to the row with this id, stamping `updated_at`.
    /// `None` when no such row exists.
    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        changes: Row,
    ) -> Result<Option<Row>, DataError>;

    /// Returns whether a row was removed.
    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, DataError>;
}

/// The concrete type used to share the data client across the application state.
pub type DataState = Arc<dyn DataClient>;

// --- Typed helpers over the JSON row interface ---

pub fn to_row<T: Serialize>(value: &T) -> Result<Row, DataError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(DataError::NotAnObject),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, DataError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub async fn fetch_all<T: DeserializeOwned>(
    client: &dyn DataClient,
    collection: Collection,
    query: &Query,
) -> Result<Vec<T>, DataError> {
    client
        .select(collection, query)
        .await?
        .into_iter()
        .map(from_row)
        .collect()
}

pub async fn fetch_by_id<T: DeserializeOwned>(
    client: &dyn DataClient,
    collection: Collection,
    id: Uuid,
) -> Result<Option<T>, DataError> {
    let query = Query::new().eq("id", id.to_string()).limit(1);
    match client.select(collection, &query).await?.into_iter().next() {
        Some(row) => Ok(Some(from_row(row)?)),
        None => Ok(None),
    }
}
