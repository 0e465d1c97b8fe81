//! [`Command`] for authorizing a [`User`] by a [`Session`] token.

use common::{
    operations::{By, Select},
    Clock,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by a [`Session`] token.
///
/// Always resolves the current [`User`] record, so changes made after the
/// [`Session`] was issued (like a [`user::Role`] change) take effect
/// immediately.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

/// Output of [`AuthorizeUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Verified [`Session`].
    pub session: Session,

    /// Live [`User`] the [`Session`] belongs to.
    pub user: User,
}

impl<Db, Clk> Command<AuthorizeUserSession> for Service<Db, Clk>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
    Clk: Clock,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = Session::decode(
            &token,
            &self.config().jwt_decoding_key,
            self.clock().now(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;

        let user = self
            .database()
            .execute(Select(By::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::UserNotExists(session.user_id))
            .map_err(tracerr::wrap!())?;

        Ok(Output { session, user })
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`session::Token`] is not a structurally valid signed token.
    #[display("Malformed `Session` token: {_0}")]
    MalformedToken(jsonwebtoken::errors::Error),

    /// [`session::Token`] signature doesn't match its contents.
    #[display("`Session` token signature mismatch")]
    InvalidSignature,

    /// [`Session`] has expired.
    #[display("`Session` expired at {}", _0.to_rfc3339())]
    TokenExpired(#[error(not(source))] session::ExpirationDateTime),

    /// [`User`] the [`Session`] belongs to does not exist anymore.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

impl From<session::DecodeError> for ExecutionError {
    fn from(e: session::DecodeError) -> Self {
        use session::DecodeError as D;

        match e {
            D::Malformed(e) => Self::MalformedToken(e),
            D::InvalidSignature => Self::InvalidSignature,
            D::Expired(at) => Self::TokenExpired(at),
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::operations::{By, Delete};

    use crate::{
        command::{
            create_user_session::Authentication, CreateUserSession,
            UpdateUserAccess,
        },
        domain::{user, User},
        testing::{self, ManualClock, TestService},
        Command as _,
    };

    use super::{AuthorizeUserSession, ExecutionError as E};

    async fn login(svc: &TestService, user: &User) -> user::session::Token {
        svc.execute(CreateUserSession::from(Authentication::ByUserId(user.id)))
            .await
            .unwrap()
            .token
    }

    async fn setup() -> (TestService, ManualClock, User) {
        let (svc, clock) = testing::service();
        let domain = testing::domain(&svc, "Finance").await;
        let user = testing::register(
            &svc,
            "a@x.com",
            "pw1",
            user::Role::Individual,
            domain.id,
        )
        .await;
        (svc, clock, user)
    }

    fn authorize(token: &user::session::Token) -> AuthorizeUserSession {
        AuthorizeUserSession {
            token: token.clone(),
        }
    }

    #[tokio::test]
    async fn resolves_live_user() {
        let (svc, clock, user) = setup().await;
        let token = login(&svc, &user).await;

        clock.advance(Duration::from_secs(59 * 60));
        let out = svc.execute(authorize(&token)).await.unwrap();

        assert_eq!(out.user.id, user.id);
        assert_eq!(out.session.user_id, user.id);
        assert_eq!(out.user.email, user.email);
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let (svc, clock, user) = setup().await;
        let token = login(&svc, &user).await;

        clock.advance(Duration::from_secs(60 * 60 + 1));
        let err = svc.execute(authorize(&token)).await.unwrap_err();

        assert!(matches!(err.as_ref(), E::TokenExpired(_)), "{err}");
    }

    #[tokio::test]
    async fn rejects_tampered_token() {
        let (svc, _, user) = setup().await;
        let token = login(&svc, &user).await;

        let (head, sig) = token.as_ref().rsplit_once('.').unwrap();
        let flipped = if sig.starts_with('A') { 'B' } else { 'A' };
        let forged = format!("{head}.{flipped}{}", &sig[1..]).parse().unwrap();

        let err = svc.execute(authorize(&forged)).await.unwrap_err();

        assert!(matches!(err.as_ref(), E::InvalidSignature), "{err}");
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let (svc, _, _) = setup().await;

        let err = svc
            .execute(authorize(&"garbage".parse().unwrap()))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::MalformedToken(_)), "{err}");
    }

    #[tokio::test]
    async fn rejects_orphaned_token() {
        let (svc, _, user) = setup().await;
        let token = login(&svc, &user).await;

        svc.database()
            .execute(Delete(By::<User, _>::new(user.id)))
            .await
            .unwrap();
        let err = svc.execute(authorize(&token)).await.unwrap_err();

        assert!(
            matches!(err.as_ref(), E::UserNotExists(id) if *id == user.id),
            "{err}",
        );
    }

    #[tokio::test]
    async fn reports_storage_failure_separately() {
        let (svc, _, user) = setup().await;
        let token = login(&svc, &user).await;

        svc.database().set_unavailable(true).await;
        let err = svc.execute(authorize(&token)).await.unwrap_err();

        assert!(matches!(err.as_ref(), E::Db(_)), "{err}");
    }

    #[tokio::test]
    async fn sees_role_change_after_issuance() {
        let (svc, _, user) = setup().await;
        let token = login(&svc, &user).await;

        drop(
            svc.execute(UpdateUserAccess {
                user_id: user.id,
                role: Some(user::Role::Admin),
                permissions: None,
            })
            .await
            .unwrap(),
        );
        let out = svc.execute(authorize(&token)).await.unwrap();

        assert_eq!(out.user.role, user::Role::Admin);
        assert_eq!(out.session.role, user::Role::Individual);
    }
}
