//! In-memory [`Database`] implementation.
//!
//! Mirrors the constraints of the [`Postgres`] schema, but provides no
//! transaction isolation: [`Transact`] shares the same state and [`Commit`]
//! is a no-op.
//!
//! [`Postgres`]: crate::infra::Postgres

use std::{
    collections::{BTreeMap, HashMap},
    ops::Bound,
    sync::Arc,
};

use common::{
    operations::{By, Commit, Delete, Insert, Lock, Select, Transact, Update},
    pagination,
};
use derive_more::{Display, Error as StdError};
use tokio::sync::RwLock;
use tracerr::Traced;

use crate::{
    domain::{business_domain, user, BusinessDomain, User},
    infra::{database, Database},
    read,
};

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Shared [`State`] of this [`Memory`] client.
    state: Arc<RwLock<State>>,
}

/// Stored records of a [`Memory`] client.
#[derive(Debug, Default)]
struct State {
    /// Stored [`User`]s ordered by their IDs.
    users: BTreeMap<user::Id, User>,

    /// Stored [`BusinessDomain`]s.
    domains: HashMap<business_domain::Id, BusinessDomain>,

    /// Indicator whether every operation should fail.
    unavailable: bool,
}

impl State {
    /// Fails if this [`State`] is marked as unavailable.
    fn ensure_available(&self) -> Result<(), Traced<database::Error>> {
        if self.unavailable {
            return Err(tracerr::map_from(tracerr::new!(Error::Unavailable)));
        }
        Ok(())
    }
}

impl Memory {
    /// Creates a new empty [`Memory`] client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with [`Error::Unavailable`]
    /// (or succeed again when `unavailable` is `false`).
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }
}

/// [`Memory`] database [`Error`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// [`Memory`] storage is unavailable.
    #[display("storage is unavailable")]
    Unavailable,

    /// Unique constraint is violated.
    #[display("unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),

    /// Foreign key constraint is violated.
    #[display("foreign key constraint `{_0}` is violated")]
    ForeignKeyViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |x| x == *c),
            Self::Unavailable | Self::ForeignKeyViolation(_) => false,
        }
    }
}

/// Returns the provided [`Error`] as a traced [`database::Error`].
macro_rules! fail {
    ($err:expr) => {
        return Err(tracerr::map_from(tracerr::new!($err)))
    };
}

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        self.state.read().await.ensure_available()?;
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.state.read().await.ensure_available()
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state.users.get(&by.into_inner()).cloned())
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Email>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state.users.values().find(|u| &u.email == email).cloned())
    }
}

impl<IDs> Database<Select<By<HashMap<user::Id, User>, IDs>>> for Memory
where
    IDs: AsRef<[user::Id]>,
{
    type Ok = HashMap<user::Id, User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<user::Id, User>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(ids
            .as_ref()
            .iter()
            .filter_map(|id| state.users.get(id).map(|u| (*id, u.clone())))
            .collect())
    }
}

impl Database<Insert<User>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        if self.state.read().await.users.contains_key(&user.id) {
            fail!(Error::UniqueViolation("users_pkey"));
        }
        self.execute(Update(user)).await.map_err(tracerr::wrap!())
    }
}

impl Database<Update<User>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        if state
            .users
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            fail!(Error::UniqueViolation("users_email_key"));
        }
        if !state.domains.contains_key(&user.domain_id) {
            fail!(Error::ForeignKeyViolation("users_domain_id_fkey"));
        }

        drop(state.users.insert(user.id, user));
        Ok(())
    }
}

impl Database<Delete<By<User, user::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state.write().await;
        state.ensure_available()?;
        drop(state.users.remove(&by.into_inner()));
        Ok(())
    }
}

impl Database<Lock<By<User, user::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.state.read().await.ensure_available()
    }
}

/// Checks whether the provided [`User`] satisfies the provided `filter`.
fn satisfies(filter: &read::user::list::Filter, user: &User) -> bool {
    let read::user::list::Filter { role, domain_id } = filter;
    role.map_or(true, |r| user.role == r)
        && domain_id.map_or(true, |d| user.domain_id == d)
}

impl Database<Select<By<read::user::list::Page, read::user::list::Selector>>>
    for Memory
{
    type Ok = read::user::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::user::list::Page, read::user::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::user::list::Selector { arguments, filter } = by.into_inner();

        let state = self.state.read().await;
        state.ensure_available()?;

        let kind = arguments.kind();
        let bound = |c| {
            if matches!(
                kind,
                pagination::Kind::ForwardIncluding
                    | pagination::Kind::BackwardIncluding
            ) {
                Bound::Included(c)
            } else {
                Bound::Excluded(c)
            }
        };
        let range = match arguments.cursor().copied() {
            None => (Bound::Unbounded, Bound::Unbounded),
            Some(c) if kind.is_forward() => (bound(c), Bound::Unbounded),
            Some(c) => (Bound::Unbounded, bound(c)),
        };
        let users = state.users.range(range).map(|(_, u)| u);
        let users: Box<dyn Iterator<Item = &User>> = if kind.is_forward() {
            Box::new(users)
        } else {
            Box::new(users.rev())
        };

        let mut edges = users
            .filter(|u| satisfies(&filter, u))
            .take(arguments.limit() + 1)
            .map(|u| (u.id, u.id))
            .collect::<Vec<_>>();
        let has_more = edges.len() > arguments.limit();
        edges.truncate(arguments.limit());

        Ok(read::user::list::Page::new(&arguments, edges, has_more))
    }
}

impl Database<Select<By<read::user::list::TotalCount, read::user::list::Filter>>>
    for Memory
{
    type Ok = read::user::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::user::list::TotalCount, read::user::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        let state = self.state.read().await;
        state.ensure_available()?;

        let count = state.users.values().filter(|u| satisfies(&filter, u)).count();
        Ok(i32::try_from(count).unwrap_or(i32::MAX).into())
    }
}

impl Database<Select<By<Option<BusinessDomain>, business_domain::Id>>>
    for Memory
{
    type Ok = Option<BusinessDomain>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<BusinessDomain>, business_domain::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state.domains.get(&by.into_inner()).cloned())
    }
}

impl<'l> Database<Select<By<Option<BusinessDomain>, &'l business_domain::Name>>>
    for Memory
{
    type Ok = Option<BusinessDomain>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<BusinessDomain>, &'l business_domain::Name>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let name = by.into_inner();
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state.domains.values().find(|d| &d.name == name).cloned())
    }
}

impl Database<Select<By<Vec<BusinessDomain>, ()>>> for Memory {
    type Ok = Vec<BusinessDomain>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<BusinessDomain>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let state = self.state.read().await;
        state.ensure_available()?;

        let mut domains = state.domains.values().cloned().collect::<Vec<_>>();
        domains.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(domains)
    }
}

impl Database<Insert<BusinessDomain>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(domain): Insert<BusinessDomain>,
    ) -> Result<Self::Ok, Self::Err> {
        if self.state.read().await.domains.contains_key(&domain.id) {
            fail!(Error::UniqueViolation("business_domains_pkey"));
        }
        self.execute(Update(domain)).await.map_err(tracerr::wrap!())
    }
}

impl Database<Update<BusinessDomain>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(domain): Update<BusinessDomain>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        if state
            .domains
            .values()
            .any(|d| d.name == domain.name && d.id != domain.id)
        {
            fail!(Error::UniqueViolation("business_domains_name_key"));
        }

        drop(state.domains.insert(domain.id, domain));
        Ok(())
    }
}

impl Database<Delete<By<BusinessDomain, business_domain::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<BusinessDomain, business_domain::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        let mut state = self.state.write().await;
        state.ensure_available()?;

        if state.users.values().any(|u| u.domain_id == id) {
            fail!(Error::ForeignKeyViolation("users_domain_id_fkey"));
        }
        drop(state.domains.remove(&id));
        Ok(())
    }
}

impl Database<Lock<By<BusinessDomain, business_domain::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<BusinessDomain, business_domain::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.state.read().await.ensure_available()
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::user,
        query, read,
        testing::{self, TestService},
        Query as _,
    };

    async fn page(
        svc: &TestService,
        first: i32,
        after: Option<user::Id>,
        filter: read::user::list::Filter,
    ) -> read::user::list::Page {
        svc.execute(query::users::List::by(read::user::list::Selector {
            arguments: read::user::list::Arguments::new(
                Some(first),
                after,
                None,
                None,
                10,
            )
            .unwrap(),
            filter,
        }))
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn pages_through_filtered_users() {
        let (svc, _) = testing::service();
        let finance = testing::domain(&svc, "Finance").await;
        let markets = testing::domain(&svc, "Markets").await;
        let mut expected = Vec::new();
        for i in 0..3 {
            let u = testing::register(
                &svc,
                &format!("f{i}@x.com"),
                "pw",
                user::Role::Individual,
                finance.id,
            )
            .await;
            expected.push(u.id);
        }
        drop(
            testing::register(
                &svc,
                "m@x.com",
                "pw",
                user::Role::Individual,
                markets.id,
            )
            .await,
        );
        expected.sort();
        let filter = read::user::list::Filter {
            role: None,
            domain_id: Some(finance.id),
        };

        let first = page(&svc, 2, None, filter).await;
        assert!(first.page_info().has_next_page);
        let last = page(&svc, 2, first.page_info().end_cursor, filter).await;
        assert!(!last.page_info().has_next_page);

        let seen = first
            .edges
            .iter()
            .chain(&last.edges)
            .map(|e| e.node)
            .collect::<Vec<_>>();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn counts_users_matching_filter() {
        let (svc, _) = testing::service();
        let finance = testing::domain(&svc, "Finance").await;
        for (email, role) in [
            ("a@x.com", user::Role::Admin),
            ("b@x.com", user::Role::Individual),
            ("c@x.com", user::Role::Individual),
        ] {
            drop(testing::register(&svc, email, "pw", role, finance.id).await);
        }

        let svc = &svc;
        let count = |filter| async move {
            i32::from(
                svc.execute(query::users::TotalCount::by(filter))
                    .await
                    .unwrap(),
            )
        };

        assert_eq!(count(read::user::list::Filter::default()).await, 3);
        assert_eq!(
            count(read::user::list::Filter {
                role: Some(user::Role::Admin),
                domain_id: None,
            })
            .await,
            1,
        );
    }

    #[tokio::test]
    async fn fails_while_unavailable() {
        let (svc, _) = testing::service();
        svc.database().set_unavailable(true).await;

        let res = svc.execute(query::user::ById::by(user::Id::new())).await;

        assert!(res.is_err());
    }
}
