//! [`Command`] for creating a new [`BusinessDomain`].

use common::operations::{By, Commit, Insert, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{business_domain, BusinessDomain},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`BusinessDomain`].
#[derive(Clone, Debug)]
pub struct CreateBusinessDomain {
    /// [`business_domain::Name`] of a new [`BusinessDomain`].
    pub name: business_domain::Name,

    /// [`business_domain::Icon`] of a new [`BusinessDomain`].
    pub icon: Option<business_domain::Icon>,

    /// Indicator whether a new [`BusinessDomain`] is locked.
    pub locked: bool,

    /// [`business_domain::AdminContact`] of a new [`BusinessDomain`].
    pub admin_contact: Option<business_domain::AdminContact>,
}

impl<Db, Clk> Command<CreateBusinessDomain> for Service<Db, Clk>
where
    Db: for<'l> Database<
            Select<By<Option<BusinessDomain>, &'l business_domain::Name>>,
            Ok = Option<BusinessDomain>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<BusinessDomain>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = BusinessDomain;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateBusinessDomain,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateBusinessDomain {
            name,
            icon,
            locked,
            admin_contact,
        } = cmd;

        let d = self
            .database()
            .execute(Select(By::new(&name)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if d.is_some() {
            return Err(tracerr::new!(E::NameOccupied(name)));
        }

        let domain = BusinessDomain {
            id: business_domain::Id::new(),
            name,
            icon,
            locked,
            admin_contact,
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Err(e) = tx.execute(Insert(domain.clone())).await {
            if e.as_ref().is_unique_violation(Some("business_domains_name_key"))
            {
                return Err(tracerr::new!(E::NameOccupied(domain.name)));
            }
            return Err(e).map_err(tracerr::map_from_and_wrap!(=> E));
        }
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(domain)
    }
}

/// Error of [`CreateBusinessDomain`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`business_domain::Name`] is already occupied.
    #[display("`{_0}` domain name is occupied")]
    #[from(ignore)]
    NameOccupied(#[error(not(source))] business_domain::Name),
}

#[cfg(test)]
mod spec {
    use crate::{domain::business_domain, query, testing, Command as _};

    use super::{CreateBusinessDomain, ExecutionError as E};

    fn create(name: &str) -> CreateBusinessDomain {
        CreateBusinessDomain {
            name: business_domain::Name::new(name).unwrap(),
            icon: business_domain::Icon::new("📈"),
            locked: false,
            admin_contact: business_domain::AdminContact::new("ops@x.com"),
        }
    }

    #[tokio::test]
    async fn creates_domain() {
        let (svc, _) = testing::service();

        let domain = svc.execute(create("Finance")).await.unwrap();

        let stored = svc
            .execute(query::business_domain::ById::by(domain.id))
            .await
            .unwrap();
        assert_eq!(stored, Some(domain));
    }

    #[tokio::test]
    async fn rejects_occupied_name() {
        let (svc, _) = testing::service();
        drop(svc.execute(create("Finance")).await.unwrap());

        let err = svc.execute(create("Finance")).await.unwrap_err();

        assert!(matches!(err.as_ref(), E::NameOccupied(_)), "{err}");
    }

    #[tokio::test]
    async fn lists_domains_by_name() {
        let (svc, _) = testing::service();
        for name in ["Markets", "Finance", "Regulation"] {
            drop(svc.execute(create(name)).await.unwrap());
        }

        let all = svc
            .execute(query::business_domains::All::by(()))
            .await
            .unwrap();

        assert_eq!(
            all.iter().map(|d| d.name.to_string()).collect::<Vec<_>>(),
            ["Finance", "Markets", "Regulation"],
        );
    }
}
