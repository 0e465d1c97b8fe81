//! Postgres database clients.

use std::{mem, sync::Arc};

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

/// Non-transactional Postgres database client.
///
/// Lazily takes a [`connection::NonTx`] from the [`connection::Pool`] and
/// keeps it for subsequent operations.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to take a [`connection::NonTx`] from.
    pub(crate) pool: connection::Pool,

    /// Taken [`connection::NonTx`], if any.
    connection: Arc<RwLock<Option<connection::NonTx>>>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client over the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            connection: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the [`connection::NonTx`] of this client, taking one from the
    /// [`connection::Pool`] if there is none yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::NonTx>, Traced<database::Error>>
    {
        let guard = self.connection.read().await;
        let guard = match RwLockReadGuard::try_map(guard, Option::as_ref) {
            Ok(conn) => return Ok(conn),
            Err(guard) => guard,
        };
        drop(guard);

        let mut guard = self.connection.write().await;
        if guard.is_none() {
            *guard = Some(
                self.pool
                    .get()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)?,
            );
        }
        Ok(RwLockReadGuard::map(guard.downgrade(), |conn| {
            conn.as_ref()
                .expect("connection cannot be dropped while guard is alive")
        }))
    }

    /// Takes the [`connection::NonTx`] out of this client, if any.
    async fn take_connection(&self) -> Option<connection::NonTx> {
        self.connection.write().await.take()
    }
}

/// Transactional Postgres database client.
///
/// The transaction starts on the first operation, reusing the connection of
/// the [`NonTx`] client it was created from, if there is one.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to take a new connection from.
    pool: connection::Pool,

    /// Current [`State`] of this client.
    state: Arc<RwLock<State>>,
}

/// State of a [`Tx`] client.
#[derive(Debug)]
enum State {
    /// Transaction is not started yet.
    Pending(NonTx),

    /// Transaction is in progress.
    Started(connection::Tx),
}

impl State {
    /// Returns the [`connection::Tx`] if the transaction is started.
    const fn started(&self) -> Option<&connection::Tx> {
        match self {
            Self::Started(tx) => Some(tx),
            Self::Pending(_) => None,
        }
    }
}

impl Tx {
    /// Creates a new [`Tx`] client from the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            pool: client.pool.clone(),
            state: Arc::new(RwLock::new(State::Pending(client))),
        }
    }

    /// Returns the [`connection::Tx`] of this client, starting a transaction
    /// if there is none yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        let guard = self.state.read().await;
        let guard = match RwLockReadGuard::try_map(guard, State::started) {
            Ok(tx) => return Ok(tx),
            Err(guard) => guard,
        };
        drop(guard);

        let mut guard = self.state.write().await;
        if let State::Pending(non_tx) = &*guard {
            let conn = if let Some(conn) = non_tx.take_connection().await {
                conn
            } else {
                self.pool
                    .get()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)?
            };
            *guard = State::Started(
                connection::Tx::from_non_tx(conn)
                    .await
                    .map_err(tracerr::wrap!())?,
            );
        }
        Ok(RwLockReadGuard::map(guard.downgrade(), |state| {
            state
                .started()
                .expect("transaction cannot be dropped while guard is alive")
        }))
    }

    /// Commits this [`Tx`] client.
    ///
    /// Subsequent operations run in a new transaction.
    ///
    /// # Errors
    ///
    /// If failed to commit the transaction.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let mut guard = self.state.write().await;
        let fresh = State::Pending(NonTx::from_pool(self.pool.clone()));
        match mem::replace(&mut *guard, fresh) {
            State::Started(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            State::Pending(_) => Ok(()),
        }
    }
}

/// Implements [`Connection`] for a client, delegating to the connection
/// returned by its `connection()` method.
macro_rules! impl_connection {
    ($ty:ty) => {
        impl Connection for $ty {
            async fn query<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn query_opt<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Option<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query_opt(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .exec(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }
        }
    };
}

impl_connection!(NonTx);
impl_connection!(Tx);
