//! Shared database types for Volha
//!
//! This module provides the storage error classification, the connection
//! scope repositories are constructed with, and pool construction.

use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use thiserror::Error;
use tokio::time::Instant;

use crate::config::Config;
use crate::error::ErrorKind;

/// Database-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Unknown entity type: {0}")]
    UnknownType(String),

    #[error("Payload of type {found} does not match requested type {expected}")]
    InvalidType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Record already exists ({0})")]
    AlreadyExists(String),

    #[error("Referenced record is missing or still in use ({0})")]
    ForeignKeyViolation(String),

    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("Deadline exceeded")]
    Timeout,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Database connection error: {0}")]
    Connection(sqlx::Error),
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::NotFound => ErrorKind::NotFound,
            RepositoryError::UnknownType(_) => ErrorKind::UnknownType,
            RepositoryError::InvalidType { .. } => ErrorKind::InvalidType,
            RepositoryError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            RepositoryError::ForeignKeyViolation(_) => ErrorKind::ForeignKeyViolation,
            RepositoryError::InvalidCriteria(_) => ErrorKind::FailedPrecondition,
            RepositoryError::Timeout
            | RepositoryError::InvalidData(_)
            | RepositoryError::Connection(_) => ErrorKind::Internal,
        }
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RepositoryError::AlreadyExists(db_err.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::ForeignKeyViolation(
                    db_err.constraint().unwrap_or("foreign key").to_string(),
                )
            }
            sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::Decode(_) => RepositoryError::InvalidData(err.to_string()),
            other => RepositoryError::Connection(other),
        }
    }
}

/// Where repository statements run.
///
/// `Pool` hands out a fresh connection per statement; `Tx` routes every
/// statement through a transaction the caller owns and will finish.
pub enum DbScope<'t> {
    Pool(PgPool),
    Tx(&'t mut Transaction<'static, Postgres>),
}

impl<'t> DbScope<'t> {
    pub fn pool(pool: PgPool) -> Self {
        DbScope::Pool(pool)
    }

    pub fn tx(transaction: &'t mut Transaction<'static, Postgres>) -> Self {
        DbScope::Tx(transaction)
    }

    pub fn in_transaction(&self) -> bool {
        matches!(self, DbScope::Tx(_))
    }

    /// Borrow this scope for a shorter-lived repository
    pub fn reborrow(&mut self) -> DbScope<'_> {
        match self {
            DbScope::Pool(pool) => DbScope::Pool(pool.clone()),
            DbScope::Tx(transaction) => DbScope::Tx(&mut **transaction),
        }
    }

    /// Connection for a single statement
    pub async fn conn(&mut self) -> std::result::Result<DbConn<'_>, sqlx::Error> {
        match self {
            DbScope::Pool(pool) => Ok(DbConn::Pooled(pool.acquire().await?)),
            DbScope::Tx(transaction) => Ok(DbConn::Borrowed(&mut ***transaction)),
        }
    }

    /// Connection for a multi-statement write that must be atomic.
    ///
    /// Inside an ambient transaction the statements join it and
    /// [`Atomic::commit`] is a no-op. Otherwise a transaction is opened here;
    /// dropping the guard without committing rolls it back.
    pub async fn atomic(&mut self) -> std::result::Result<Atomic<'_>, sqlx::Error> {
        match self {
            DbScope::Pool(pool) => Ok(Atomic::Owned(pool.begin().await?)),
            DbScope::Tx(transaction) => Ok(Atomic::Ambient(&mut ***transaction)),
        }
    }
}

/// A connection checked out of the pool or borrowed from the ambient transaction
pub enum DbConn<'c> {
    Pooled(PoolConnection<Postgres>),
    Borrowed(&'c mut PgConnection),
}

impl Deref for DbConn<'_> {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        match self {
            DbConn::Pooled(conn) => conn,
            DbConn::Borrowed(conn) => conn,
        }
    }
}

impl DerefMut for DbConn<'_> {
    fn deref_mut(&mut self) -> &mut PgConnection {
        match self {
            DbConn::Pooled(conn) => conn,
            DbConn::Borrowed(conn) => conn,
        }
    }
}

/// Guard for an atomic statement sequence, see [`DbScope::atomic`]
pub enum Atomic<'c> {
    Owned(Transaction<'static, Postgres>),
    Ambient(&'c mut PgConnection),
}

impl Atomic<'_> {
    pub fn conn(&mut self) -> &mut PgConnection {
        match self {
            Atomic::Owned(transaction) => transaction,
            Atomic::Ambient(conn) => conn,
        }
    }

    pub async fn commit(self) -> std::result::Result<(), sqlx::Error> {
        match self {
            Atomic::Owned(transaction) => transaction.commit().await,
            Atomic::Ambient(_) => Ok(()),
        }
    }
}

/// Run a storage round trip, giving up with `Timeout` once `deadline` passes.
///
/// The in-flight future is dropped on timeout, which abandons the query.
pub async fn within_deadline<T, F>(
    deadline: Option<Instant>,
    fut: F,
) -> std::result::Result<T, RepositoryError>
where
    F: Future<Output = std::result::Result<T, RepositoryError>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| RepositoryError::Timeout)?,
        None => fut.await,
    }
}

/// Build the connection pool described by `config`
pub async fn connect(config: &Config) -> std::result::Result<PgPool, sqlx::Error> {
    tracing::debug!(
        max_connections = config.db_max_connections,
        min_connections = config.db_min_connections,
        "Connecting to database"
    );
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(&config.database_url)
        .await
}
