use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres};
use tracing::error;

/// Failure reported by the record store. Never carries a raw `sqlx::Error` past the gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    UniqueViolation,
    Other,
}

impl StoreError {
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Other,
            message: message.into(),
        }
    }

    pub fn unique(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::UniqueViolation,
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::unique(db.message()),
            sqlx::Error::Database(db) => Self::other(db.message()),
            _ => Self::other(e.to_string()),
        }
    }
}

pub type QueryResult<T> = Result<T, StoreError>;

/// Positional query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Int(i32),
    BigInt(i64),
}

/// Executes parameterized statements against the pool and reports every failure as a `StoreError`.
#[derive(Clone)]
pub struct Gateway {
    pool: PgPool,
}

impl Gateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn query<T>(&self, sql: &str, params: Vec<SqlParam>) -> QueryResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        self.query_with(sql, params, |rows| rows).await
    }

    /// Like [`Gateway::query`], applying `transform` to the rows when the statement succeeds.
    pub async fn query_with<T, U, F>(
        &self,
        sql: &str,
        params: Vec<SqlParam>,
        transform: F,
    ) -> QueryResult<U>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        F: FnOnce(Vec<T>) -> U,
    {
        let mut q = sqlx::query_as::<Postgres, T>(sql);
        for p in params {
            q = match p {
                SqlParam::Text(v) => q.bind(v),
                SqlParam::Int(v) => q.bind(v),
                SqlParam::BigInt(v) => q.bind(v),
            };
        }

        match q.fetch_all(&self.pool).await {
            Ok(rows) => Ok(transform(rows)),
            Err(e) => {
                error!(error = %e, "query failed");
                Err(StoreError::from(e))
            }
        }
    }
}
