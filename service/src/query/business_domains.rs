//! [`Query`] collection related to the multiple [`BusinessDomain`]s.

use common::operations::By;

use crate::domain::BusinessDomain;
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries all [`BusinessDomain`]s ordered by their names.
pub type All = DatabaseQuery<By<Vec<BusinessDomain>, ()>>;
