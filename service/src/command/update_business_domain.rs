//! [`Command`] for updating a [`BusinessDomain`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{business_domain, BusinessDomain},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for replacing all the attributes of a [`BusinessDomain`].
#[derive(Clone, Debug)]
pub struct UpdateBusinessDomain {
    /// ID of the [`BusinessDomain`] to be updated.
    pub id: business_domain::Id,

    /// New [`business_domain::Name`].
    pub name: business_domain::Name,

    /// New [`business_domain::Icon`].
    pub icon: Option<business_domain::Icon>,

    /// New lock indicator.
    pub locked: bool,

    /// New [`business_domain::AdminContact`].
    pub admin_contact: Option<business_domain::AdminContact>,
}

impl<Db, Clk> Command<UpdateBusinessDomain> for Service<Db, Clk>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<BusinessDomain>, business_domain::Id>>,
            Ok = Option<BusinessDomain>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<BusinessDomain>, &'l business_domain::Name>>,
            Ok = Option<BusinessDomain>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<BusinessDomain, business_domain::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Update<BusinessDomain>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = BusinessDomain;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateBusinessDomain,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateBusinessDomain {
            id,
            name,
            icon,
            locked,
            admin_contact,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut domain = tx
            .execute(Select(By::<Option<BusinessDomain>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::DomainNotExists(id))
            .map_err(tracerr::wrap!())?;

        if name != domain.name {
            let occupied = tx
                .execute(Select(By::new(&name)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .is_some();
            if occupied {
                return Err(tracerr::new!(E::NameOccupied(name)));
            }
        }

        domain.name = name;
        domain.icon = icon;
        domain.locked = locked;
        domain.admin_contact = admin_contact;

        tx.execute(Update(domain.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(domain)
    }
}

/// Error of [`UpdateBusinessDomain`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`BusinessDomain`] doesn't exist.
    #[display("`BusinessDomain(id: {_0})` does not exist")]
    #[from(ignore)]
    DomainNotExists(#[error(not(source))] business_domain::Id),

    /// [`business_domain::Name`] is occupied by another [`BusinessDomain`].
    #[display("`{_0}` domain name is occupied")]
    #[from(ignore)]
    NameOccupied(#[error(not(source))] business_domain::Name),
}

#[cfg(test)]
mod spec {
    use crate::{domain::business_domain, testing, Command as _};

    use super::{ExecutionError as E, UpdateBusinessDomain};

    #[tokio::test]
    async fn replaces_attributes() {
        let (svc, _) = testing::service();
        let domain = testing::domain(&svc, "Finance").await;

        let updated = svc
            .execute(UpdateBusinessDomain {
                id: domain.id,
                name: business_domain::Name::new("Global Markets").unwrap(),
                icon: None,
                locked: true,
                admin_contact: business_domain::AdminContact::new("ops@x.com"),
            })
            .await
            .unwrap();

        assert_eq!(updated.id, domain.id);
        assert_eq!(updated.name.to_string(), "Global Markets");
        assert!(updated.locked);
    }

    #[tokio::test]
    async fn keeps_own_name() {
        let (svc, _) = testing::service();
        let domain = testing::domain(&svc, "Finance").await;

        let updated = svc
            .execute(UpdateBusinessDomain {
                id: domain.id,
                name: domain.name.clone(),
                icon: None,
                locked: true,
                admin_contact: None,
            })
            .await
            .unwrap();

        assert_eq!(updated.name, domain.name);
    }

    #[tokio::test]
    async fn rejects_name_of_another_domain() {
        let (svc, _) = testing::service();
        let domain = testing::domain(&svc, "Finance").await;
        drop(testing::domain(&svc, "Markets").await);

        let err = svc
            .execute(UpdateBusinessDomain {
                id: domain.id,
                name: business_domain::Name::new("Markets").unwrap(),
                icon: None,
                locked: false,
                admin_contact: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::NameOccupied(_)), "{err}");
    }
}
