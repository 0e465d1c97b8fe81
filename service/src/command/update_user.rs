//! [`Command`] for updating a [`User`] profile.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use secrecy::SecretBox;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Avatar, Email, Name, Password};
use crate::{
    domain::{business_domain, user, BusinessDomain, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`User`] profile.
///
/// Only the provided fields are changed.
#[derive(Clone, Debug)]
pub struct UpdateUser {
    /// ID of the [`User`] to be updated.
    pub user_id: user::Id,

    /// New [`Name`] of the [`User`].
    pub name: Option<user::Name>,

    /// New [`Email`] of the [`User`].
    pub email: Option<user::Email>,

    /// New [`Password`] of the [`User`].
    pub password: Option<SecretBox<user::Password>>,

    /// New [`Avatar`] of the [`User`] (`Some(None)` removes it).
    pub avatar: Option<Option<user::Avatar>>,

    /// ID of the new [`BusinessDomain`] of the [`User`].
    pub domain_id: Option<business_domain::Id>,
}

impl UpdateUser {
    /// Creates a new [`UpdateUser`] changing nothing in the [`User`] with the
    /// provided ID.
    #[must_use]
    pub fn new(user_id: user::Id) -> Self {
        Self {
            user_id,
            name: None,
            email: None,
            password: None,
            avatar: None,
            domain_id: None,
        }
    }
}

impl<Db, Clk> Command<UpdateUser> for Service<Db, Clk>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<BusinessDomain>, business_domain::Id>>,
            Ok = Option<BusinessDomain>,
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

    async fn execute(&self, cmd: UpdateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUser {
            user_id,
            name,
            email,
            password,
            avatar,
            domain_id,
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

        if let Some(email) = email.filter(|e| *e != user.email) {
            let occupied = tx
                .execute(Select(By::new(&email)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .is_some();
            if occupied {
                return Err(tracerr::new!(E::EmailOccupied(email)));
            }
            user.email = email;
        }

        if let Some(domain_id) = domain_id.filter(|d| *d != user.domain_id) {
            let exists = tx
                .execute(Select(By::<Option<BusinessDomain>, _>::new(
                    domain_id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .is_some();
            if !exists {
                return Err(tracerr::new!(E::DomainNotExists(domain_id)));
            }
            user.domain_id = domain_id;
        }

        if let Some(password) = password {
            if !user.password_hash.check(password.clone()).await {
                user.password_hash = user::PasswordHash::compute(
                    password,
                    self.config().password_cost,
                )
                .await
                .map_err(tracerr::from_and_wrap!(=> E))?;
            }
        }

        if let Some(name) = name {
            user.name = name;
        }
        if let Some(avatar) = avatar {
            user.avatar = avatar;
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

/// Error of [`UpdateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`Email`] is already occupied by another [`User`].
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),

    /// [`BusinessDomain`] with the provided ID does not exist.
    #[display("`BusinessDomain(id: {_0})` does not exist")]
    DomainNotExists(#[error(not(source))] business_domain::Id),

    /// [`Password`] hashing failed.
    #[display("Failed to hash the password: {_0}")]
    #[from]
    PasswordHash(user::password::HashError),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{create_user_session::Authentication, CreateUserSession},
        domain::user,
        testing, Command as _,
    };

    use super::{ExecutionError as E, UpdateUser};

    #[tokio::test]
    async fn changes_only_provided_fields() {
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

        let updated = svc
            .execute(UpdateUser {
                name: Some(user::Name::new("Grace").unwrap()),
                ..UpdateUser::new(user.id)
            })
            .await
            .unwrap();

        assert_eq!(updated.name.to_string(), "Grace");
        assert_eq!(updated.email, user.email);
        assert_eq!(updated.password_hash, user.password_hash);
        assert_eq!(updated.role, user.role);
    }

    #[tokio::test]
    async fn rehashes_changed_password() {
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

        let same = svc
            .execute(UpdateUser {
                password: Some(testing::password("pw1")),
                ..UpdateUser::new(user.id)
            })
            .await
            .unwrap();
        assert_eq!(same.password_hash, user.password_hash);

        drop(
            svc.execute(UpdateUser {
                password: Some(testing::password("pw2")),
                ..UpdateUser::new(user.id)
            })
            .await
            .unwrap(),
        );
        let login = |pw: &'static str| {
            svc.execute(CreateUserSession::from(
                Authentication::ByCredentials {
                    email: user.email.clone(),
                    password: testing::password(pw),
                },
            ))
        };

        assert!(login("pw1").await.is_err());
        assert!(login("pw2").await.is_ok());
    }

    #[tokio::test]
    async fn rejects_email_of_another_user() {
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
        drop(
            testing::register(
                &svc,
                "b@x.com",
                "pw1",
                user::Role::Individual,
                domain.id,
            )
            .await,
        );

        let err = svc
            .execute(UpdateUser {
                email: user::Email::new("b@x.com"),
                ..UpdateUser::new(user.id)
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::EmailOccupied(_)), "{err}");
    }

    #[tokio::test]
    async fn fails_for_unknown_user() {
        let (svc, _) = testing::service();

        let err = svc
            .execute(UpdateUser::new(user::Id::new()))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::UserNotExists(_)), "{err}");
    }
}
