//! [`BusinessDomain`]-related definitions.

use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// A [`BusinessDomain`] users are affiliated with.
#[derive(Clone, Debug, From, Into)]
pub struct BusinessDomain(domain::BusinessDomain);

/// Business domain (organization unit) `User`s are affiliated with.
#[graphql_object(context = Context)]
impl BusinessDomain {
    /// Unique identifier of this `BusinessDomain`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "BusinessDomain.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Unique name of this `BusinessDomain`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "BusinessDomain.name",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn name(&self) -> Name {
        self.0.name.clone().into()
    }

    /// Icon of this `BusinessDomain`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "BusinessDomain.icon",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn icon(&self) -> Option<Icon> {
        self.0.icon.clone().map(Into::into)
    }

    /// Indicator whether this `BusinessDomain` is locked.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "BusinessDomain.locked",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn locked(&self) -> bool {
        self.0.locked
    }

    /// Contact of this `BusinessDomain` administrator.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "BusinessDomain.adminContact",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn admin_contact(&self) -> Option<AdminContact> {
        self.0.admin_contact.clone().map(Into::into)
    }
}

/// Unique identifier of a `BusinessDomain`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::business_domain::Id)]
#[into(domain::business_domain::Id)]
#[graphql(name = "BusinessDomainId", transparent)]
pub struct Id(Uuid);

/// Name of a `BusinessDomain`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "BusinessDomainName",
    with = scalar::Via::<domain::business_domain::Name>,
)]
pub struct Name(domain::business_domain::Name);

/// Icon of a `BusinessDomain`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "BusinessDomainIcon",
    with = scalar::Via::<domain::business_domain::Icon>,
)]
pub struct Icon(domain::business_domain::Icon);

/// Contact of a `BusinessDomain` administrator.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "BusinessDomainAdminContact",
    with = scalar::Via::<domain::business_domain::AdminContact>,
)]
pub struct AdminContact(domain::business_domain::AdminContact);
