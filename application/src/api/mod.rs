//! GraphQL API definitions.

pub mod business_domain;
mod mutation;
mod query;
pub mod scalar;
mod subscription;
pub mod user;

use crate::define_error;

pub use self::{
    business_domain::BusinessDomain, mutation::Mutation, query::Query,
    subscription::Subscription, user::User,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<'static, Query, Mutation, Subscription>;

define_error! {
    enum PrivilegeError {
        #[code = "NOT_ADMIN"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be an admin"]
        Admin,

        #[code = "NOT_ADMIN_OR_SELF"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be an admin or the target \
                     `User` itself"]
        AdminOrSelf,
    }
}

define_error! {
    enum PaginationError {
        #[code = "AMBIGUOUS_PAGINATION_ARGUMENTS"]
        #[status = BAD_REQUEST]
        #[message = "Ambiguous pagination arguments"]
        Ambiguous,
    }
}
