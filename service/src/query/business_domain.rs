//! [`Query`] collection related to a single [`BusinessDomain`].

use common::operations::By;

use crate::domain::{business_domain, BusinessDomain};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`BusinessDomain`] by its [`business_domain::Id`].
pub type ById = DatabaseQuery<By<Option<BusinessDomain>, business_domain::Id>>;
