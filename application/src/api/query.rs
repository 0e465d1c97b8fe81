//! GraphQL [`Query`]s definitions.

use itertools::Itertools as _;
use juniper::graphql_object;
use service::{query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the currently authenticated `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request carries no session token;
    /// - `INVALID_SESSION` - the session token is invalid or expired, or its
    ///                       `User` does not exist anymore.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myUser",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_user(ctx: &Context) -> Result<api::User, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::user::ById::by(my_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `User` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request carries no session token;
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "user",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn user(
        id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::user::list::Edge, Error> {
        Self::users(
            None,
            Some(id.into()),
            None,
            Some(id.into()),
            None,
            None,
            ctx,
        )
        .await?
        .edges()
        .into_iter()
        .exactly_one()
        .map_err(|_| UserError::NotExists.into())
        .map_err(ctx.error())
    }

    /// Fetches the page of `User`s, optionally filtered by their role and
    /// `BusinessDomain`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request carries no session token;
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            domain = ?domain.map(|d| d.to_string()),
            first = ?first,
            gql.name = "users",
            last = ?last,
            otel.name = Self::SPAN_NAME,
            role = ?role.map(|r| r.to_string()),
        ),
    )]
    pub async fn users(
        first: Option<i32>,
        after: Option<api::user::list::Cursor>,
        last: Option<i32>,
        before: Option<api::user::list::Cursor>,
        role: Option<api::user::Role>,
        domain: Option<api::business_domain::Id>,
        ctx: &Context,
    ) -> Result<api::user::list::Connection, Error> {
        const DEFAULT_PAGE_SIZE: i32 = 10;

        _ = ctx.current_session().await?;

        let arguments = read::user::list::Arguments::new(
            first,
            after.map(Into::into),
            last,
            before.map(Into::into),
            DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;
        let filter = read::user::list::Filter {
            role: role.map(Into::into),
            domain_id: domain.map(Into::into),
        };

        ctx.service()
            .execute(query::users::List::by(read::user::list::Selector {
                arguments,
                filter,
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|page| api::user::list::Connection::new(page, filter))
    }

    /// Returns the `BusinessDomain` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request carries no session token;
    /// - `DOMAIN_NOT_EXISTS` - the `BusinessDomain` with the specified ID
    ///                         does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "domain",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn domain(
        id: api::business_domain::Id,
        ctx: &Context,
    ) -> Result<api::BusinessDomain, Error> {
        _ = ctx.current_session().await?;

        ctx.service()
            .execute(query::business_domain::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| DomainError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns all the `BusinessDomain`s ordered by their names.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request carries no session token.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "domains",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn domains(
        ctx: &Context,
    ) -> Result<Vec<api::BusinessDomain>, Error> {
        _ = ctx.current_session().await?;

        ctx.service()
            .execute(query::business_domains::All::by(()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|all| all.into_iter().map(Into::into).collect())
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum DomainError {
        #[code = "DOMAIN_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`BusinessDomain` with the specified ID does not exist"]
        NotExists,
    }
}

#[cfg(test)]
mod spec {
    use axum::extract::FromRequestParts as _;
    use juniper::{DefaultScalarValue, ExecutionError, Variables};
    use service::infra::{postgres, Postgres};

    use crate::{api, Context, Service};

    /// Builds a [`Context`] of a request without any `Authorization` header.
    ///
    /// The [`Postgres`] pool connects lazily, so nothing is reached unless a
    /// resolver touches the database.
    async fn anonymous() -> Context {
        let conf = postgres::Config {
            host: Some("localhost".to_owned()),
            dbname: Some("identity".to_owned()),
            ..postgres::Config::default()
        };
        let service = Service::new(
            service::Config::new(b"secret"),
            Postgres::new(&conf).unwrap(),
        );
        let (mut parts, ()) = http::Request::builder()
            .extension(service)
            .body(())
            .unwrap()
            .into_parts();
        Context::from_request_parts(&mut parts, &()).await.unwrap()
    }

    async fn errors_of(
        query: &str,
    ) -> Vec<ExecutionError<DefaultScalarValue>> {
        let schema =
            api::Schema::new(api::Query, api::Mutation, api::Subscription);
        let ctx = anonymous().await;

        let (_, errors) =
            juniper::execute(query, None, &schema, &Variables::new(), &ctx)
                .await
                .unwrap();
        assert_eq!(ctx.error_status_code(), http::StatusCode::UNAUTHORIZED);
        errors
    }

    fn code_of(err: &ExecutionError<DefaultScalarValue>) -> Option<String> {
        err.error()
            .extensions()
            .as_object_value()?
            .get_field_value("code")?
            .as_string_value()
            .map(ToOwned::to_owned)
    }

    #[tokio::test]
    async fn domains_require_session() {
        let errors = errors_of("{ domains { id name } }").await;

        assert_eq!(errors.len(), 1);
        assert_eq!(
            code_of(&errors[0]).as_deref(),
            Some("AUTHORIZATION_REQUIRED"),
        );
    }

    #[tokio::test]
    async fn domain_requires_session() {
        let errors = errors_of(
            r#"{ domain(id: "8c6a2a1e-7d36-4c5c-9c1e-2a3c9b5e4f10") { id } }"#,
        )
        .await;

        assert_eq!(errors.len(), 1);
        assert_eq!(
            code_of(&errors[0]).as_deref(),
            Some("AUTHORIZATION_REQUIRED"),
        );
    }
}
