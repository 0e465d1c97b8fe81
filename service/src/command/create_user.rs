//! [`Command`] for creating a new [`User`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    Clock,
};
use derive_more::{Display, Error, From};
use secrecy::SecretBox;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Avatar, Email, Name, Password, Permissions, Role};
use crate::{
    domain::{business_domain, user, BusinessDomain, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`User`].
#[derive(Clone, Debug)]
pub struct CreateUser {
    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`Role`] of a new [`User`].
    pub role: user::Role,

    /// [`Avatar`] of a new [`User`].
    pub avatar: Option<user::Avatar>,

    /// ID of the [`BusinessDomain`] a new [`User`] is affiliated with.
    pub domain_id: business_domain::Id,

    /// [`Permissions`] of a new [`User`].
    pub permissions: user::Permissions,
}

impl<Db, Clk> Command<CreateUser> for Service<Db, Clk>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<BusinessDomain>, business_domain::Id>>,
            Ok = Option<BusinessDomain>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Clk: Clock,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            name,
            email,
            password,
            role,
            avatar,
            domain_id,
            permissions,
        } = cmd;

        let u = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let domain = self
            .database()
            .execute(Select(By::<Option<BusinessDomain>, _>::new(domain_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if domain.is_none() {
            return Err(tracerr::new!(E::DomainNotExists(domain_id)));
        }

        let password_hash =
            user::PasswordHash::compute(password, self.config().password_cost)
                .await
                .map_err(tracerr::from_and_wrap!(=> E))?;

        let user = User {
            id: user::Id::new(),
            name,
            email,
            role,
            password_hash,
            avatar,
            domain_id,
            permissions,
            created_at: self.clock().now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Err(e) = tx.execute(Insert(user.clone())).await {
            // Lost a race with a concurrent registration.
            if e.as_ref().is_unique_violation(Some("users_email_key")) {
                return Err(tracerr::new!(E::EmailOccupied(user.email)));
            }
            return Err(e).map_err(tracerr::map_from_and_wrap!(=> E));
        }
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`user::Email`] is already occupied.
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
        domain::{business_domain, user},
        query, testing, Command as _,
    };

    use super::{CreateUser, ExecutionError as E};

    fn create_user(
        email: &str,
        domain_id: business_domain::Id,
    ) -> CreateUser {
        CreateUser {
            name: user::Name::new("Ada").unwrap(),
            email: user::Email::new(email).unwrap(),
            password: testing::password("pw1"),
            role: user::Role::Individual,
            avatar: user::Avatar::new("https://cdn.example.com/ada.png"),
            domain_id,
            permissions: ["news:read", "news:read", "users:write"]
                .into_iter()
                .filter_map(user::Permission::new)
                .collect(),
        }
    }

    #[tokio::test]
    async fn stores_hashed_password() {
        let (svc, _) = testing::service();
        let domain = testing::domain(&svc, "Finance").await;

        let user = svc.execute(create_user("a@x.com", domain.id)).await.unwrap();

        assert_ne!(user.password_hash.to_string(), "pw1");
        assert!(user
            .password_hash
            .verify(&user::Password::new("pw1").unwrap()));
        assert_eq!(user.permissions.len(), 2);
        assert_eq!(user.created_at.unix_timestamp(), testing::START);

        let stored = svc
            .execute(query::user::ById::by(user.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.email, user.email);
        assert_eq!(stored.password_hash, user.password_hash);
    }

    #[tokio::test]
    async fn rejects_occupied_email() {
        let (svc, _) = testing::service();
        let domain = testing::domain(&svc, "Finance").await;
        drop(svc.execute(create_user("a@x.com", domain.id)).await.unwrap());

        let err = svc
            .execute(create_user("a@x.com", domain.id))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::EmailOccupied(_)), "{err}");
    }

    #[tokio::test]
    async fn rejects_unknown_domain() {
        let (svc, _) = testing::service();

        let err = svc
            .execute(create_user("a@x.com", business_domain::Id::new()))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::DomainNotExists(_)), "{err}");
    }
}
