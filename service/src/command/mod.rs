//! [`Command`] definition.

pub mod authorize_user_session;
pub mod create_business_domain;
pub mod create_user;
pub mod create_user_session;
pub mod delete_business_domain;
pub mod delete_user;
pub mod update_business_domain;
pub mod update_user;
pub mod update_user_access;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession,
    create_business_domain::CreateBusinessDomain, create_user::CreateUser,
    create_user_session::CreateUserSession,
    delete_business_domain::DeleteBusinessDomain, delete_user::DeleteUser,
    update_business_domain::UpdateBusinessDomain, update_user::UpdateUser,
    update_user_access::UpdateUserAccess,
};
