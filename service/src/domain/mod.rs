//! Domain definitions.

pub mod business_domain;
pub mod user;

pub use self::{business_domain::BusinessDomain, user::User};
