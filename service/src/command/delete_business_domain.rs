//! [`Command`] for deleting a [`BusinessDomain`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{business_domain, BusinessDomain},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for deleting a [`BusinessDomain`] no [`User`] is affiliated
/// with.
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteBusinessDomain {
    /// ID of the [`BusinessDomain`] to be deleted.
    pub id: business_domain::Id,
}

impl<Db, Clk> Command<DeleteBusinessDomain> for Service<Db, Clk>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<BusinessDomain>, business_domain::Id>>,
            Ok = Option<BusinessDomain>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::user::list::TotalCount, read::user::list::Filter>>,
            Ok = read::user::list::TotalCount,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<BusinessDomain, business_domain::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<BusinessDomain, business_domain::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = BusinessDomain;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteBusinessDomain,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteBusinessDomain { id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let domain = tx
            .execute(Select(By::<Option<BusinessDomain>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::DomainNotExists(id))
            .map_err(tracerr::wrap!())?;

        let affiliated = tx
            .execute(Select(By::<read::user::list::TotalCount, _>::new(
                read::user::list::Filter {
                    role: None,
                    domain_id: Some(id),
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if i32::from(affiliated) > 0 {
            return Err(tracerr::new!(E::DomainInUse(id)));
        }

        tx.execute(Delete(By::<BusinessDomain, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(domain)
    }
}

/// Error of [`DeleteBusinessDomain`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`BusinessDomain`] doesn't exist.
    #[display("`BusinessDomain(id: {_0})` does not exist")]
    #[from(ignore)]
    DomainNotExists(#[error(not(source))] business_domain::Id),

    /// [`BusinessDomain`] still has affiliated [`User`]s.
    #[display("`BusinessDomain(id: {_0})` has affiliated users")]
    #[from(ignore)]
    DomainInUse(#[error(not(source))] business_domain::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::DeleteUser,
        domain::{business_domain, user},
        query, testing, Command as _,
    };

    use super::{DeleteBusinessDomain, ExecutionError as E};

    #[tokio::test]
    async fn refuses_domain_with_users() {
        let (svc, _) = testing::service();
        let domain = testing::domain(&svc, "Finance").await;
        let user = testing::register(
            &svc,
            "a@x.com",
            "pw1",
            user::Role::Individual,
            domain.id,
        )
        .await;

        let err = svc
            .execute(DeleteBusinessDomain::from(domain.id))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::DomainInUse(_)), "{err}");

        drop(svc.execute(DeleteUser::from(user.id)).await.unwrap());
        drop(
            svc.execute(DeleteBusinessDomain::from(domain.id))
                .await
                .unwrap(),
        );

        assert!(svc
            .execute(query::business_domain::ById::by(domain.id))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn fails_for_unknown_domain() {
        let (svc, _) = testing::service();

        let err = svc
            .execute(DeleteBusinessDomain::from(business_domain::Id::new()))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::DomainNotExists(_)), "{err}");
    }
}
