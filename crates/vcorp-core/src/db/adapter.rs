// Database adapter trait — the abstraction every storage backend implements.
//
// The adapter works with `serde_json::Value` to stay schema-agnostic; the
// typed models in `db::models` convert to and from Value at the call sites.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VcorpError;

/// Result type for adapter operations.
pub type AdapterResult<T> = std::result::Result<T, VcorpError>;

// ─── Where Clause ────────────────────────────────────────────────

/// Comparison operators for WHERE clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Equal (default).
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Value is in the given list.
    In,
    /// String contains substring.
    Contains,
    /// String starts with prefix.
    StartsWith,
    /// String ends with suffix.
    EndsWith,
}

impl Default for Operator {
    fn default() -> Self {
        Self::Eq
    }
}

/// A single WHERE condition.
///
/// Field names may use dotted paths ("autoCharge.nextChargeDate") to reach
/// into nested documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    /// The field name to filter on.
    pub field: String,
    /// The comparison value.
    pub value: serde_json::Value,
    /// The comparison operator (default: Eq).
    #[serde(default)]
    pub operator: Operator,
    /// Connector to the next clause. None means this is the last/only clause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector: Option<Connector>,
}

/// Logical connector between WHERE clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    And,
    Or,
}

impl WhereClause {
    /// Simple equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator: Operator::Eq,
            connector: None,
        }
    }

    /// Filter with an explicit operator.
    pub fn with_op(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator,
            connector: None,
        }
    }

    /// Add an AND connector.
    pub fn and(mut self) -> Self {
        self.connector = Some(Connector::And);
        self
    }

    /// Add an OR connector.
    pub fn or(mut self) -> Self {
        self.connector = Some(Connector::Or);
        self
    }
}

// ─── Sort / Pagination ───────────────────────────────────────────

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort specification (field + direction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Query parameters for `find_many`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindManyQuery {
    pub where_clauses: Vec<WhereClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

// ─── Adapter Trait ───────────────────────────────────────────────

/// The core database adapter trait.
///
/// Backends (MongoDB, in-memory) implement this. Billing relies on two
/// guarantees: `update` applies its WHERE filter and its write as a single
/// atomic step, and `increment` adds to a numeric field without
/// read-modify-write races.
#[async_trait]
pub trait Adapter: Send + Sync + fmt::Debug {
    /// Create a new record in the given model/collection.
    /// Returns the created record (with auto-generated fields like `id`, `createdAt`).
    async fn create(
        &self,
        model: &str,
        data: serde_json::Value,
    ) -> AdapterResult<serde_json::Value>;

    /// Find a single record matching the WHERE clauses.
    /// Returns `None` if no match found.
    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// Find multiple records matching the query parameters.
    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>>;

    /// Count records matching the WHERE clauses.
    async fn count(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<i64>;

    /// Update a single record matching the WHERE clauses.
    /// The filter check and the write happen as one atomic step.
    /// Returns the updated record, or `None` if no match was found.
    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// Update multiple records matching the WHERE clauses.
    /// Returns the number of affected rows.
    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<i64>;

    /// Atomically add `delta` to a numeric field on a single matching record.
    /// Returns the updated record, or `None` if no match was found.
    async fn increment(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        delta: f64,
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// Delete a single record matching the WHERE clauses.
    async fn delete(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<()>;

    /// Delete multiple records matching the WHERE clauses.
    /// Returns the number of deleted rows.
    async fn delete_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<i64>;
}

/// Convenience constructor for a database error.
pub fn db_error(message: impl Into<String>) -> VcorpError {
    VcorpError::Database(message.into())
}
