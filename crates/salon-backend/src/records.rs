//! Durable record store: CRUD over named collections of JSON rows.
//!
//! The hosted service exposes table-like collections (`users`,
//! `direct_messages`, `servers`, `channels`, ...) queried with
//! equality/conjunction/disjunction predicates and ordered by a timestamp
//! column.  Rows are plain JSON objects; typed decoding happens at the
//! call site with serde.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::QueryError;

/// One stored row.
pub type Row = serde_json::Map<String, Value>;

/// A query predicate over row columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(String, Value),
    /// Every sub-filter must match.
    All(Vec<Filter>),
    /// At least one sub-filter must match.
    Any(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::All(filters.into_iter().collect())
    }

    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Any(filters.into_iter().collect())
    }

    /// Evaluate this predicate against a row.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::Eq(column, value) => row.get(column) == Some(value),
            Self::All(filters) => filters.iter().all(|f| f.matches(row)),
            Self::Any(filters) => filters.iter().any(|f| f.matches(row)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Result ordering by a single column (in practice a timestamp).
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Descending,
        }
    }
}

/// CRUD over the hosted record store.
///
/// `insert` returns the stored row: the service assigns `id` and
/// `created_at` when the caller leaves them out.
#[async_trait]
pub trait Records: Send + Sync {
    async fn select(
        &self,
        collection: &str,
        filter: Filter,
        order: Option<Order>,
    ) -> Result<Vec<Row>, QueryError>;

    async fn insert(&self, collection: &str, row: Row) -> Result<Row, QueryError>;

    async fn update(
        &self,
        collection: &str,
        filter: Filter,
        patch: Row,
    ) -> Result<Vec<Row>, QueryError>;
}
