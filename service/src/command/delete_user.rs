//! [`Command`] for deleting a [`User`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`User`] permanently.
///
/// [`user::Session`]s issued before stop authorizing, as they no longer
/// resolve to any [`User`].
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteUser {
    /// ID of the [`User`] to be deleted.
    pub user_id: user::Id,
}

impl<Db, Clk> Command<DeleteUser> for Service<Db, Clk>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteUser { user_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `User`.
        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        tx.execute(Delete(By::<User, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`DeleteUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{domain::user, query, testing, Command as _};

    use super::{DeleteUser, ExecutionError as E};

    #[tokio::test]
    async fn removes_user() {
        let (svc, _) = testing::service();
        let domain = testing::domain(&svc, "Finance").await;
        let user = testing::register(
            &svc,
            "a@x.com",
            "pw1",
            user::Role::Individual,
            domain.id,
        )
        .await;

        let deleted = svc.execute(DeleteUser::from(user.id)).await.unwrap();

        assert_eq!(deleted.id, user.id);
        assert!(svc
            .execute(query::user::ById::by(user.id))
            .await
            .unwrap()
            .is_none());

        let err = svc.execute(DeleteUser::from(user.id)).await.unwrap_err();
        assert!(matches!(err.as_ref(), E::UserNotExists(_)), "{err}");
    }
}
