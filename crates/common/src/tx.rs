//! Transaction runner
//!
//! Service-layer mutations run their repository calls through
//! [`TxRunner::run_in_tx`]. A scope that already carries a transaction is
//! reused as-is, so runner calls nest without opening nested transactions.

use futures_core::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};

use crate::db::DbScope;
use crate::error::{Error, OpContext, Result};

const OP_RUN_IN_TX: &str = "tx.run_in_tx";

#[derive(Clone)]
pub struct TxRunner {
    pool: PgPool,
}

impl TxRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Scope for operations that do not need a transaction
    pub fn scope(&self) -> DbScope<'static> {
        DbScope::pool(self.pool.clone())
    }

    /// Run `f` in a fresh transaction on this runner's pool.
    pub async fn run_in_tx<T, F>(&self, f: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut Transaction<'static, Postgres>) -> BoxFuture<'c, Result<T>>
            + Send,
    {
        self.run_in_scope(&mut self.scope(), f).await
    }

    /// Run `f` atomically within `scope`.
    ///
    /// With an ambient transaction `f` runs inside it and nothing is committed
    /// here; its error is returned untouched. Otherwise a transaction is begun,
    /// committed when `f` succeeds and rolled back when it fails. A panic in
    /// `f` drops the transaction, which rolls it back.
    pub async fn run_in_scope<T, F>(&self, scope: &mut DbScope<'_>, f: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut Transaction<'static, Postgres>) -> BoxFuture<'c, Result<T>>
            + Send,
    {
        match scope {
            DbScope::Tx(transaction) => f(&mut **transaction).await,
            DbScope::Pool(pool) => {
                let mut transaction = pool.begin().await.op(OP_RUN_IN_TX)?;

                match f(&mut transaction).await {
                    Ok(value) => {
                        transaction.commit().await.op(OP_RUN_IN_TX)?;
                        Ok(value)
                    }
                    Err(err) => match transaction.rollback().await {
                        Ok(()) => Err(err),
                        Err(rollback) => {
                            tracing::error!(
                                error = %err,
                                rollback_error = %rollback,
                                "Failed to roll back transaction"
                            );
                            Err(Error::RollbackFailed {
                                op: OP_RUN_IN_TX,
                                source: Box::new(err),
                                rollback,
                            })
                        }
                    },
                }
            }
        }
    }
}
