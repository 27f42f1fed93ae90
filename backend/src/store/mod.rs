//! Remote table store.
//!
//! Handlers describe what they want with a [`Query`] and hand it to a
//! [`Store`]. Production talks to PostgREST over HTTPS
//! ([`postgrest::PostgrestClient`]); tests swap in [`memory::MemoryStore`].

pub mod memory;
pub mod postgrest;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// A raw row as returned by the store, keyed by column name.
pub type Row = Map<String, Value>;

pub type DynStore = Arc<dyn Store>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed row: {0}")]
    MalformedRow(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Runs a single query and returns the affected (or selected) rows.
    async fn execute(&self, query: Query) -> StoreResult<Vec<Row>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Select,
    Insert(Row),
    Update(Row),
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(String, Value),
    /// Case-insensitive LIKE with `%` and `_` wildcards.
    ILike(String, String),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(col, _) | Filter::ILike(col, _) => col,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub operation: Operation,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    fn new(table: &str, operation: Operation) -> Self {
        Self {
            table: table.to_string(),
            operation,
            filters: vec![],
            order: None,
        }
    }

    pub fn select(table: &str) -> Self {
        Self::new(table, Operation::Select)
    }

    pub fn insert(table: &str, row: Row) -> Self {
        Self::new(table, Operation::Insert(row))
    }

    pub fn update(table: &str, changes: Row) -> Self {
        Self::new(table, Operation::Update(changes))
    }

    pub fn delete(table: &str) -> Self {
        Self::new(table, Operation::Delete)
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn ilike(mut self, column: &str, pattern: &str) -> Self {
        self.filters
            .push(Filter::ILike(column.to_string(), pattern.to_string()));
        self
    }

    pub fn order(mut self, column: &str, descending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending,
        });
        self
    }
}
