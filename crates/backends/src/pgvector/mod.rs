//! PostgreSQL + pgvector provider using sqlx.
//!
//! Vector similarity over an `embedding` column with metadata filtering
//! pushed down as a parameterized predicate over a JSON column.

pub mod sql;

use async_trait::async_trait;
use omnivec_core::constants::{
    MAX_QUERY_LIMIT, PG_POOL_ACQUIRE_TIMEOUT_SECS, PG_POOL_IDLE_TIMEOUT_SECS,
    PG_POOL_MAX_CONNECTIONS,
};
use omnivec_core::{Filter, FilterError, FilterValue};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::config::require_env;
use crate::error::BackendError;
use crate::traits::{ScoredPoint, VectorSearch};

pub use sql::{SqlFilter, translate};

/// Default table and metadata column names.
pub const DEFAULT_TABLE: &str = "documents";
pub const DEFAULT_METADATA_COLUMN: &str = "metadata";

#[derive(Clone, Debug)]
pub struct PgVectorStore {
    pool: PgPool,
    table: String,
    column: String,
}

impl PgVectorStore {
    /// Connect to `database_url` and prepare a store over `table`.
    ///
    /// # Errors
    /// `BackendError::Database` if the pool cannot be established.
    pub async fn new(database_url: &str, table: impl Into<String>) -> Result<Self, BackendError> {
        let pool = PgPoolOptions::new()
            .max_connections(PG_POOL_MAX_CONNECTIONS)
            .acquire_timeout(std::time::Duration::from_secs(PG_POOL_ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(std::time::Duration::from_secs(PG_POOL_IDLE_TIMEOUT_SECS))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        let table = table.into();
        tracing::info!(%table, "PgVectorStore initialized");
        Ok(Self { pool, table, column: DEFAULT_METADATA_COLUMN.to_owned() })
    }

    /// Connect using `DATABASE_URL` and the default table name.
    ///
    /// # Errors
    /// `BackendError::Config` if `DATABASE_URL` is unset.
    pub async fn from_env() -> Result<Self, BackendError> {
        let url = require_env("DATABASE_URL")?;
        Self::new(&url, DEFAULT_TABLE).await
    }

    /// Use a different metadata column.
    #[must_use]
    pub fn with_metadata_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}

#[async_trait]
impl VectorSearch for PgVectorStore {
    async fn search(
        &self,
        query: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, BackendError> {
        let limit = limit.min(MAX_QUERY_LIMIT);
        // The query vector is $1; the filter fragment starts numbering at 2
        // and LIMIT takes the next free index after it.
        let translated = match filter {
            Some(f) => {
                f.err()?;
                Some(sql::translate(f, &self.column, 2)?)
            },
            None => None,
        };
        let (where_sql, limit_index) = match &translated {
            Some(t) => (format!("WHERE {}", t.clause), t.next_index),
            None => (String::new(), 2),
        };
        let statement = format!(
            "SELECT id, {column} AS metadata,
                    1.0 - (embedding <=> $1::vector) AS score
               FROM {table} {where_sql}
              ORDER BY embedding <=> $1::vector
              LIMIT ${limit_index}",
            column = self.column,
            table = self.table,
        );
        tracing::debug!(limit, filtered = filter.is_some(), "pgvector search");

        let vec_str =
            format!("[{}]", query.iter().map(ToString::to_string).collect::<Vec<_>>().join(","));
        let mut q = sqlx::query(&statement).bind(&vec_str);
        if let Some(t) = &translated {
            for arg in &t.args {
                q = bind_value(q, arg)?;
            }
        }
        q = q.bind(usize_to_i64(limit));

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(ScoredPoint {
                    id: row.try_get("id")?,
                    score: row.try_get("score")?,
                    metadata: row.try_get("metadata")?,
                })
            })
            .collect()
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

/// Bind one translated argument by its runtime type.
fn bind_value<'q>(q: PgQuery<'q>, value: &'q FilterValue) -> Result<PgQuery<'q>, BackendError> {
    Ok(match value {
        FilterValue::Str(s) => q.bind(s.as_str()),
        FilterValue::Int(i) => q.bind(*i),
        FilterValue::Float(f) => q.bind(*f),
        FilterValue::Bool(b) => q.bind(*b),
        FilterValue::List(items) => bind_list(q, items)?,
    })
}

/// Bind a homogeneous list as the matching Postgres array type.
fn bind_list<'q>(q: PgQuery<'q>, items: &[FilterValue]) -> Result<PgQuery<'q>, BackendError> {
    let Some(first) = items.first() else {
        // Empty lists translate to boolean literals and never reach a bind.
        return Err(BackendError::Filter(FilterError::InvalidQuery(
            "empty list cannot be bound".to_owned(),
        )));
    };
    match first {
        FilterValue::Str(_) => {
            let values: Vec<String> = items
                .iter()
                .map(|v| match v {
                    FilterValue::Str(s) => Ok(s.clone()),
                    other => Err(mixed_list_error(other)),
                })
                .collect::<Result<_, _>>()?;
            Ok(q.bind(values))
        },
        FilterValue::Int(_) => {
            let values: Vec<i64> = items
                .iter()
                .map(|v| match v {
                    FilterValue::Int(i) => Ok(*i),
                    other => Err(mixed_list_error(other)),
                })
                .collect::<Result<_, _>>()?;
            Ok(q.bind(values))
        },
        FilterValue::Float(_) => {
            let values: Vec<f64> = items
                .iter()
                .map(|v| match v {
                    FilterValue::Float(f) => Ok(*f),
                    other => Err(mixed_list_error(other)),
                })
                .collect::<Result<_, _>>()?;
            Ok(q.bind(values))
        },
        FilterValue::Bool(_) => {
            let values: Vec<bool> = items
                .iter()
                .map(|v| match v {
                    FilterValue::Bool(b) => Ok(*b),
                    other => Err(mixed_list_error(other)),
                })
                .collect::<Result<_, _>>()?;
            Ok(q.bind(values))
        },
        FilterValue::List(_) => Err(BackendError::Filter(FilterError::InvalidQuery(
            "list elements must be scalars".to_owned(),
        ))),
    }
}

fn mixed_list_error(value: &FilterValue) -> BackendError {
    BackendError::Filter(FilterError::InvalidQuery(format!(
        "list elements must all share one type, found {}",
        value.type_name()
    )))
}

/// Convert `usize` to `i64` for SQL LIMIT binds.
fn usize_to_i64(val: usize) -> i64 {
    i64::try_from(val).unwrap_or(i64::MAX)
}
