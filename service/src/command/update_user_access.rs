//! [`Command`] for changing access rights of a [`User`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Permissions, Role};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for changing the [`Role`] and [`Permissions`] of a [`User`].
///
/// Already issued [`user::Session`]s keep their [`Role`] snapshot, but their
/// authorization sees the change right away.
#[derive(Clone, Debug)]
pub struct UpdateUserAccess {
    /// ID of the [`User`] to be updated.
    pub user_id: user::Id,

    /// New [`Role`] of the [`User`].
    pub role: Option<user::Role>,

    /// New [`Permissions`] of the [`User`], replacing the current ones.
    pub permissions: Option<user::Permissions>,
}

impl<Db, Clk> Command<UpdateUserAccess> for Service<Db, Clk>
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
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateUserAccess,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserAccess {
            user_id,
            role,
            permissions,
        } = cmd;

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

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        if role.is_none() && permissions.is_none() {
            return Ok(user);
        }
        if let Some(role) = role {
            user.role = role;
        }
        if let Some(permissions) = permissions {
            user.permissions = permissions;
        }

        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`UpdateUserAccess`] [`Command`] execution.
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

    use super::{ExecutionError as E, UpdateUserAccess};

    #[tokio::test]
    async fn replaces_role_and_permissions() {
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
        let permissions: user::Permissions = ["users:write"]
            .into_iter()
            .filter_map(user::Permission::new)
            .collect();

        drop(
            svc.execute(UpdateUserAccess {
                user_id: user.id,
                role: Some(user::Role::Admin),
                permissions: Some(permissions.clone()),
            })
            .await
            .unwrap(),
        );

        let stored = svc
            .execute(query::user::ById::by(user.id))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_admin());
        assert_eq!(stored.permissions, permissions);
    }

    #[tokio::test]
    async fn fails_for_unknown_user() {
        let (svc, _) = testing::service();

        let err = svc
            .execute(UpdateUserAccess {
                user_id: user::Id::new(),
                role: Some(user::Role::Admin),
                permissions: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::UserNotExists(_)), "{err}");
    }
}
