//! GraphQL [`Mutation`]s definitions.

use juniper::{graphql_object, Nullable};
use secrecy::SecretBox;
use service::{
    command::{self, create_user_session::Authentication},
    domain::user,
    Command as _,
};

use crate::{api, define_error, AsError, Context, Error, Session};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Registers a new individual `User` and logs it in.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `EMAIL_OCCUPIED` - provided `UserEmail` is occupied by another
    ///                      `User`;
    /// - `DOMAIN_NOT_EXISTS` - `BusinessDomain` with the provided ID does not
    ///                         exist.
    #[tracing::instrument(
        skip_all,
        fields(
            domain = %domain,
            email = %email,
            gql.name = "createUser",
            name = %name,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_user(
        name: api::user::Name,
        email: api::user::Email,
        password: api::user::Password,
        domain: api::business_domain::Id,
        avatar: Option<api::user::Avatar>,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let user = ctx
            .service()
            .execute(command::CreateUser {
                name: name.into(),
                email: email.into(),
                password: SecretBox::init_with(move || password.into()),
                role: user::Role::Individual,
                avatar: avatar.map(Into::into),
                domain_id: domain.into(),
                permissions: user::Permissions::default(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        let output = ctx
            .service()
            .execute(command::CreateUserSession {
                auth: Authentication::ByUserId(user.id),
                ttl: None,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        ctx.set_current_session(Session {
            user_id: output.user.id.into(),
            role: output.user.role,
            token: output.token.clone(),
            expires_at: output.expires_at.coerce(),
        })
        .await;

        Ok(output.into())
    }

    /// Logs in the `User` with the provided credentials.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `WRONG_CREDENTIALS` - provided credentials do not match any `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "createUserSession",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_user_session(
        email: api::user::Email,
        password: api::user::Password,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let output = ctx
            .service()
            .execute(command::CreateUserSession {
                auth: Authentication::ByCredentials {
                    email: email.into(),
                    password: SecretBox::init_with(move || password.into()),
                },
                ttl: None,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        ctx.set_current_session(Session {
            user_id: output.user.id.into(),
            role: output.user.role,
            token: output.token.clone(),
            expires_at: output.expires_at.coerce(),
        })
        .await;

        Ok(output.into())
    }

    /// Updates the profile of the `User` with the provided ID.
    ///
    /// Omitted arguments are left untouched, while an explicit `null`
    /// `avatar` removes the current one.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN_OR_SELF` - the current `User` is neither an admin nor the
    ///                         updated `User`;
    /// - `USER_NOT_EXISTS` - `User` with the provided ID does not exist;
    /// - `EMAIL_OCCUPIED` - provided `UserEmail` is occupied by another
    ///                      `User`;
    /// - `DOMAIN_NOT_EXISTS` - `BusinessDomain` with the provided ID does not
    ///                         exist.
    #[tracing::instrument(
        skip_all,
        fields(
            domain = ?domain.map(|d| d.to_string()),
            email = ?email.as_ref().map(ToString::to_string),
            gql.name = "updateUser",
            id = %id,
            name = ?name.as_ref().map(ToString::to_string),
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_user(
        id: api::user::Id,
        name: Option<api::user::Name>,
        email: Option<api::user::Email>,
        password: Option<api::user::Password>,
        avatar: Nullable<api::user::Avatar>,
        domain: Option<api::business_domain::Id>,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.current_session()
            .await?
            .ensure_admin_or(id)
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::UpdateUser {
                name: name.map(Into::into),
                email: email.map(Into::into),
                password: password
                    .map(|p| SecretBox::init_with(move || p.into())),
                avatar: avatar.explicit().map(|a| a.map(Into::into)),
                domain_id: domain.map(Into::into),
                ..command::UpdateUser::new(id.into())
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Changes the role and permissions of the `User` with the provided ID.
    ///
    /// Takes effect on the very next request of that `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN` - the current `User` is not an admin;
    /// - `USER_NOT_EXISTS` - `User` with the provided ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateUserAccess",
            id = %id,
            otel.name = Self::SPAN_NAME,
            role = ?role.map(|r| r.to_string()),
        ),
    )]
    pub async fn update_user_access(
        id: api::user::Id,
        role: Option<api::user::Role>,
        permissions: Option<Vec<api::user::Permission>>,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.current_session()
            .await?
            .ensure_admin()
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::UpdateUserAccess {
                user_id: id.into(),
                role: role.map(Into::into),
                permissions: permissions
                    .map(|ps| ps.into_iter().map(Into::into).collect()),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deletes the `User` with the provided ID.
    ///
    /// Sessions issued to the deleted `User` stop working immediately.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN_OR_SELF` - the current `User` is neither an admin nor the
    ///                         deleted `User`;
    /// - `USER_NOT_EXISTS` - `User` with the provided ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteUser",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_user(
        id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.current_session()
            .await?
            .ensure_admin_or(id)
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::DeleteUser { user_id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new `BusinessDomain`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN` - the current `User` is not an admin;
    /// - `DOMAIN_NAME_OCCUPIED` - provided `BusinessDomainName` is occupied
    ///                            by another `BusinessDomain`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createDomain",
            name = %name,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_domain(
        name: api::business_domain::Name,
        icon: Option<api::business_domain::Icon>,
        locked: Option<bool>,
        admin_contact: Option<api::business_domain::AdminContact>,
        ctx: &Context,
    ) -> Result<api::BusinessDomain, Error> {
        ctx.current_session()
            .await?
            .ensure_admin()
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateBusinessDomain {
                name: name.into(),
                icon: icon.map(Into::into),
                locked: locked.unwrap_or_default(),
                admin_contact: admin_contact.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Replaces the `BusinessDomain` with the provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN` - the current `User` is not an admin;
    /// - `DOMAIN_NOT_EXISTS` - `BusinessDomain` with the provided ID does not
    ///                         exist;
    /// - `DOMAIN_NAME_OCCUPIED` - provided `BusinessDomainName` is occupied
    ///                            by another `BusinessDomain`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateDomain",
            id = %id,
            name = %name,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_domain(
        id: api::business_domain::Id,
        name: api::business_domain::Name,
        icon: Option<api::business_domain::Icon>,
        locked: bool,
        admin_contact: Option<api::business_domain::AdminContact>,
        ctx: &Context,
    ) -> Result<api::BusinessDomain, Error> {
        ctx.current_session()
            .await?
            .ensure_admin()
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::UpdateBusinessDomain {
                id: id.into(),
                name: name.into(),
                icon: icon.map(Into::into),
                locked,
                admin_contact: admin_contact.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deletes the `BusinessDomain` with the provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN` - the current `User` is not an admin;
    /// - `DOMAIN_NOT_EXISTS` - `BusinessDomain` with the provided ID does not
    ///                         exist;
    /// - `DOMAIN_IN_USE` - some `User`s are still affiliated with the
    ///                     `BusinessDomain`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteDomain",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_domain(
        id: api::business_domain::Id,
        ctx: &Context,
    ) -> Result<api::BusinessDomain, Error> {
        ctx.current_session()
            .await?
            .ensure_admin()
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::DeleteBusinessDomain { id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum UserError {
        #[code = "EMAIL_OCCUPIED"]
        #[status = CONFLICT]
        #[message = "`UserEmail` is occupied by another `User`"]
        EmailOccupied,

        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the provided ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum DomainError {
        #[code = "DOMAIN_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`BusinessDomain` with the provided ID does not exist"]
        NotExists,

        #[code = "DOMAIN_NAME_OCCUPIED"]
        #[status = CONFLICT]
        #[message = "`BusinessDomainName` is occupied by another \
                     `BusinessDomain`"]
        NameOccupied,

        #[code = "DOMAIN_IN_USE"]
        #[status = CONFLICT]
        #[message = "`BusinessDomain` has affiliated `User`s"]
        InUse,
    }
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::PasswordHash(_) => return None,
            Self::EmailOccupied(_) => UserError::EmailOccupied.into(),
            Self::DomainNotExists(_) => DomainError::NotExists.into(),
        })
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "WRONG_CREDENTIALS"]
                #[status = UNAUTHORIZED]
                #[message = "Invalid email or password"]
                WrongCredentials,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::UserNotExists(_) | Self::WrongCredentials => {
                Some(Error::WrongCredentials.into())
            }
        }
    }
}

impl AsError for command::update_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::PasswordHash(_) => return None,
            Self::UserNotExists(_) => UserError::NotExists.into(),
            Self::EmailOccupied(_) => UserError::EmailOccupied.into(),
            Self::DomainNotExists(_) => DomainError::NotExists.into(),
        })
    }
}

impl AsError for command::update_user_access::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(UserError::NotExists.into()),
        }
    }
}

impl AsError for command::delete_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(UserError::NotExists.into()),
        }
    }
}

impl AsError for command::create_business_domain::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NameOccupied(_) => Some(DomainError::NameOccupied.into()),
        }
    }
}

impl AsError for command::update_business_domain::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::DomainNotExists(_) => DomainError::NotExists.into(),
            Self::NameOccupied(_) => DomainError::NameOccupied.into(),
        })
    }
}

impl AsError for command::delete_business_domain::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::DomainNotExists(_) => DomainError::NotExists.into(),
            Self::DomainInUse(_) => DomainError::InUse.into(),
        })
    }
}

#[cfg(test)]
mod spec {
    use service::{command, domain::user};

    use crate::AsError as _;

    #[test]
    fn wrong_credentials_hide_unknown_email() {
        use command::create_user_session::ExecutionError as E;

        let unknown = E::UserNotExists(user::Id::new()).try_as_error().unwrap();
        let mismatch = E::WrongCredentials.try_as_error().unwrap();

        assert_eq!(unknown.code, "WRONG_CREDENTIALS");
        assert_eq!(unknown.status_code, http::StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.message, "Invalid email or password");
        assert_eq!(unknown.code, mismatch.code);
        assert_eq!(unknown.message, mismatch.message);
    }

    #[test]
    fn maps_occupied_email_to_conflict() {
        use command::create_user::ExecutionError as E;

        let err = E::EmailOccupied(user::Email::new("a@x.com").unwrap())
            .try_as_error()
            .unwrap();

        assert_eq!(err.code, "EMAIL_OCCUPIED");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        assert!(!err.message.contains("a@x.com"), "{err}");
    }
}
