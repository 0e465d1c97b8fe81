//! [`BusinessDomain`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{business_domain, BusinessDomain},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Builds a [`BusinessDomain`] out of the provided [`Row`].
fn from_row(row: &Row) -> BusinessDomain {
    BusinessDomain {
        id: row.get("id"),
        name: row.get("name"),
        icon: row.get("icon"),
        locked: row.get("locked"),
        admin_contact: row.get("admin_contact"),
    }
}

impl<C> Database<Select<By<Option<BusinessDomain>, business_domain::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<BusinessDomain>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<BusinessDomain>, business_domain::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, name, icon, locked, admin_contact \
            FROM business_domains \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<'l, C>
    Database<Select<By<Option<BusinessDomain>, &'l business_domain::Name>>>
    for Postgres<C>
where
    C: Connection,
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

        const SQL: &str = "\
            SELECT id, name, icon, locked, admin_contact \
            FROM business_domains \
            WHERE name = $1::VARCHAR \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&name])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<BusinessDomain>, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<BusinessDomain>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<BusinessDomain>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT id, name, icon, locked, admin_contact \
            FROM business_domains \
            ORDER BY name ASC, id ASC";
        Ok(self
            .query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<BusinessDomain>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Update<BusinessDomain>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(domain): Insert<BusinessDomain>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(domain)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<BusinessDomain>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(domain): Update<BusinessDomain>,
    ) -> Result<Self::Ok, Self::Err> {
        let BusinessDomain {
            id,
            name,
            icon,
            locked,
            admin_contact,
        } = domain;

        const SQL: &str = "\
            INSERT INTO business_domains (\
                id, name, icon, locked, admin_contact\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::BOOL, $5::VARCHAR\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                icon = EXCLUDED.icon, \
                locked = EXCLUDED.locked, \
                admin_contact = EXCLUDED.admin_contact";
        self.exec(SQL, &[&id, &name, &icon, &locked, &admin_contact])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<BusinessDomain, business_domain::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<BusinessDomain, business_domain::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: business_domain::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM business_domains \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<BusinessDomain, business_domain::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<BusinessDomain, business_domain::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: business_domain::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO business_domains_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO NOTHING";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
