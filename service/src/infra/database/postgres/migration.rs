//! [`refinery`] integration of [`Postgres`].
//!
//! Migrations run outside of any transaction of the [`Postgres`] client,
//! each batch on a separate pooled connection.

use async_trait::async_trait;
use refinery_core::{
    traits::r#async::{AsyncQuery, AsyncTransaction},
    AsyncMigrate, Migration,
};
use tracerr::Traced;

use crate::infra::database;

use super::{Error, Postgres};

impl Postgres {
    /// Checks out a standalone connection from the pool.
    async fn checkout(
        &self,
    ) -> Result<deadpool_postgres::Object, Traced<database::Error>> {
        self.0
            .pool
            .get()
            .await
            .map_err(|e| tracerr::new!(Error::from(e)))
            .map_err(tracerr::map_from)
    }
}

#[async_trait]
impl AsyncTransaction for Postgres {
    type Error = Traced<database::Error>;

    async fn execute(
        &mut self,
        queries: &[&str],
    ) -> Result<usize, Self::Error> {
        let mut conn = self.checkout().await?;
        AsyncTransaction::execute(&mut **conn, queries)
            .await
            .map_err(|e| tracerr::new!(Error::from(e)))
            .map_err(tracerr::map_from)
    }
}

#[async_trait]
impl AsyncQuery<Vec<Migration>> for Postgres {
    async fn query(
        &mut self,
        query: &str,
    ) -> Result<Vec<Migration>, <Self as AsyncTransaction>::Error> {
        let mut conn = self.checkout().await?;
        AsyncQuery::query(&mut **conn, query)
            .await
            .map_err(|e| tracerr::new!(Error::from(e)))
            .map_err(tracerr::map_from)
    }
}

impl AsyncMigrate for Postgres {}
