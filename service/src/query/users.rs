//! [`Query`] collection related to the multiple [`User`]s.

use std::collections::HashMap;

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::{
    domain::{user, User},
    read,
};

use super::DatabaseQuery;

/// Queries multiple [`User`]s by their [`user::Id`]s.
pub type ByIds = DatabaseQuery<By<HashMap<user::Id, User>, Vec<user::Id>>>;

/// Queries a page of [`User`]s matching a [`read::user::list::Filter`].
pub type List =
    DatabaseQuery<By<read::user::list::Page, read::user::list::Selector>>;

/// Queries total count of [`User`]s matching a [`read::user::list::Filter`].
pub type TotalCount = DatabaseQuery<
    By<read::user::list::TotalCount, read::user::list::Filter>,
>;
