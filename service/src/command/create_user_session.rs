//! [`Command`] for creating a [`Session`].

use std::time::Duration;

use common::{
    operations::{By, Select},
    Clock,
};
use derive_more::{Display, Error, From};
use secrecy::SecretBox;
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::user::{session::Token, Email, Password};
use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a [`Session`].
#[derive(Clone, Debug)]
pub struct CreateUserSession {
    /// [`Authentication`] of the [`User`] to create a [`Session`] for.
    pub auth: Authentication,

    /// Lifetime of the [`Session`] overriding the configured one.
    pub ttl: Option<Duration>,
}

impl From<Authentication> for CreateUserSession {
    fn from(auth: Authentication) -> Self {
        Self { auth, ttl: None }
    }
}

/// Way to authenticate a [`User`] for a new [`Session`].
#[derive(Clone, Debug, From)]
pub enum Authentication {
    /// Authenticate by [`User`] credentials.
    #[from(ignore)]
    ByCredentials {
        /// [`Email`] of a [`User`].
        email: user::Email,

        /// [`Password`] of a [`User`].
        password: SecretBox<user::Password>,
    },

    /// Authenticate by [`User`] ID, trusting the caller.
    ByUserId(user::Id),
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`Token`] of the created [`Session`].
    pub token: session::Token,

    /// [`User`] whose [`Session`] has been created.
    pub user: User,

    /// [`DateTime`] when the [`Session`] expires.
    ///
    /// [`DateTime`]: common::DateTime
    pub expires_at: session::ExpirationDateTime,
}

impl<Db, Clk> Command<CreateUserSession> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Clk: Clock,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use Authentication as Auth;
        use ExecutionError as E;

        let CreateUserSession { auth, ttl } = cmd;

        let user = match auth {
            Auth::ByCredentials { email, password } => {
                let user = self
                    .database()
                    .execute(Select(By::new(&email)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;

                let Some(user) = user else {
                    // Spend the same effort as for an existing `User`.
                    drop(
                        user::PasswordHash::compute(
                            password,
                            self.config().password_cost,
                        )
                        .await,
                    );
                    log::debug!("login attempt for unknown `{email}`");
                    return Err(tracerr::new!(E::WrongCredentials));
                };

                if !user.password_hash.check(password).await {
                    log::debug!("wrong password for `User(id: {})`", user.id);
                    return Err(tracerr::new!(E::WrongCredentials));
                }

                user
            }
            Auth::ByUserId(user_id) => self
                .database()
                .execute(Select(By::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or_else(|| E::UserNotExists(user_id))
                .map_err(tracerr::wrap!())?,
        };

        let session = Session::new(
            user.id,
            user.role,
            self.clock().now(),
            ttl.unwrap_or(self.config().session_ttl),
        );
        let token = session
            .encode(&self.config().jwt_encoding_key)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        Ok(Output {
            token,
            user,
            expires_at: session.expires_at,
        })
    }
}

/// Error of [`CreateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] encoding error.
    #[display("Failed to encode a JSON Web Token: {_0}")]
    JsonWebTokenEncodeError(jsonwebtoken::errors::Error),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`Authentication::ByCredentials`] contains wrong credentials.
    ///
    /// Doesn't tell whether the [`Email`] is unknown or the [`Password`]
    /// doesn't match.
    #[display("Wrong `User` credentials")]
    WrongCredentials,
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use crate::{
        command::AuthorizeUserSession,
        domain::{user, User},
        testing::{self, TestService},
        Command as _,
    };

    use super::{
        Authentication, CreateUserSession, ExecutionError as E, Output,
    };

    async fn setup() -> (TestService, User) {
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
        (svc, user)
    }

    async fn login(
        svc: &TestService,
        email: &str,
        password: &str,
    ) -> Result<Output, tracerr::Traced<E>> {
        svc.execute(CreateUserSession::from(Authentication::ByCredentials {
            email: user::Email::new(email).unwrap(),
            password: testing::password(password),
        }))
        .await
    }

    #[tokio::test]
    async fn logs_in_with_valid_credentials() {
        let (svc, user) = setup().await;

        let out = login(&svc, "a@x.com", "pw1").await.unwrap();

        assert_eq!(out.user.id, user.id);
        assert_eq!(
            out.expires_at.unix_timestamp(),
            testing::START + 60 * 60,
        );

        let auth = svc
            .execute(AuthorizeUserSession { token: out.token })
            .await
            .unwrap();
        assert_eq!(auth.user.id, user.id);
        assert_eq!(auth.session.role, user::Role::Individual);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let (svc, _) = setup().await;

        let wrong_password =
            login(&svc, "a@x.com", "pw2").await.unwrap_err();
        let unknown_email =
            login(&svc, "b@x.com", "pw1").await.unwrap_err();

        assert!(matches!(wrong_password.as_ref(), E::WrongCredentials));
        assert!(matches!(unknown_email.as_ref(), E::WrongCredentials));
        assert_eq!(
            wrong_password.as_ref().to_string(),
            unknown_email.as_ref().to_string(),
        );
    }

    #[tokio::test]
    async fn email_is_case_sensitive() {
        let (svc, _) = setup().await;

        let err = login(&svc, "A@x.com", "pw1").await.unwrap_err();

        assert!(matches!(err.as_ref(), E::WrongCredentials));
    }

    #[tokio::test]
    async fn honors_custom_ttl() {
        let (svc, user) = setup().await;

        let out = svc
            .execute(CreateUserSession {
                auth: Authentication::ByUserId(user.id),
                ttl: Some(Duration::from_secs(5 * 60)),
            })
            .await
            .unwrap();

        assert_eq!(out.expires_at.unix_timestamp(), testing::START + 5 * 60);
    }

    #[tokio::test]
    async fn fails_for_unknown_user_id() {
        let (svc, _) = setup().await;
        let id = user::Id::new();

        let err = svc
            .execute(CreateUserSession::from(Authentication::ByUserId(id)))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::UserNotExists(i) if *i == id));
    }

    #[tokio::test]
    async fn reports_storage_failure() {
        let (svc, _) = setup().await;
        svc.database().set_unavailable(true).await;

        let err = login(&svc, "a@x.com", "pw1").await.unwrap_err();

        assert!(matches!(err.as_ref(), E::Db(_)), "{err}");
    }
}
