//! [`User`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `users` table forming a [`User`].
const COLUMNS: &str = "\
    id, name, email, role, \
    password_hash, avatar, \
    domain_id, permissions, \
    created_at";

/// Builds a [`User`] out of the provided [`Row`] selected with [`COLUMNS`].
fn from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: row.get("role"),
        password_hash: row.get("password_hash"),
        avatar: row.get("avatar"),
        domain_id: row.get("domain_id"),
        permissions: row.get("permissions"),
        created_at: row.get("created_at"),
    }
}

/// Renders `WHERE` conditions of the provided [`read::user::list::Filter`],
/// pushing its parameters into `ps`.
fn filter_sql<'p>(
    filter: &'p read::user::list::Filter,
    ps: &mut Vec<&'p (dyn ToSql + Sync)>,
) -> String {
    let read::user::list::Filter { role, domain_id } = filter;

    let role_idx = role.as_ref().map(|r| {
        ps.push(r);
        ps.len()
    });
    let domain_idx = domain_id.as_ref().map(|d| {
        ps.push(d);
        ps.len()
    });

    format!(
        "{role} {domain}",
        role = role_idx.into_iter().format_with("", |idx, f| {
            f(&format_args!("AND role = ${idx}::INT2"))
        }),
        domain = domain_idx.into_iter().format_with("", |idx, f| {
            f(&format_args!("AND domain_id = ${idx}::UUID"))
        }),
    )
}

impl<C, IDs> Database<Select<By<HashMap<user::Id, User>, IDs>>> for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[user::Id]>,
{
    type Ok = HashMap<user::Id, User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<user::Id, User>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[user::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap_or(i32::MAX);

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT4) \
             LIMIT $2::INT4",
        );
        Ok(self
            .query(&sql, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let user = from_row(row);
                (user.id, user)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<User>, user::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<user::Id, User>, [user::Id; 1]>>,
        Ok = HashMap<user::Id, User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<'l, C> Database<Select<By<Option<User>, &'l user::Email>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             WHERE email = $1::VARCHAR \
             LIMIT 1",
        );
        Ok(self
            .query_opt(&sql, &[&email])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Insert<User>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let User {
            id,
            name,
            email,
            role,
            password_hash,
            avatar,
            domain_id,
            permissions,
            created_at,
        } = user;

        let sql = format!(
            "INSERT INTO users ({COLUMNS}) \
             VALUES (\
                 $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::INT2, \
                 $5::VARCHAR, $6::VARCHAR, \
                 $7::UUID, $8::VARCHAR[], \
                 $9::TIMESTAMPTZ\
             )",
        );
        self.exec(
            &sql,
            &[
                &id,
                &name,
                &email,
                &role,
                &password_hash,
                &avatar,
                &domain_id,
                &permissions,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<User>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let User {
            id,
            name,
            email,
            role,
            password_hash,
            avatar,
            domain_id,
            permissions,
            created_at: _,
        } = user;

        const SQL: &str = "\
            UPDATE users \
            SET name = $2::VARCHAR, \
                email = $3::VARCHAR, \
                role = $4::INT2, \
                password_hash = $5::VARCHAR, \
                avatar = $6::VARCHAR, \
                domain_id = $7::UUID, \
                permissions = $8::VARCHAR[] \
            WHERE id = $1::UUID";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &email,
                &role,
                &password_hash,
                &avatar,
                &domain_id,
                &permissions,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<User, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: user::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM users \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<User, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: user::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO users_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO NOTHING";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<read::user::list::Page, read::user::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
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

        let limit =
            i32::try_from(arguments.limit()).unwrap_or(i32::MAX - 1) + 1;

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let filtering = filter_sql(&filter, &mut ps);

        let sql = format!(
            "SELECT id \
             FROM users \
             WHERE TRUE \
                   {cursor} \
                   {filtering} \
             ORDER BY id {order} \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::UUID"))
            }),
            order = arguments.kind().order().sql(),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        let has_more = rows.len() > arguments.limit();
        let edges = rows
            .into_iter()
            .take(arguments.limit())
            .map(|row| {
                let id = row.get("id");
                (id, id)
            })
            .collect::<Vec<_>>();

        Ok(read::user::list::Page::new(&arguments, edges, has_more))
    }
}

impl<C> Database<Select<By<read::user::list::TotalCount, read::user::list::Filter>>>
    for Postgres<C>
where
    C: Connection,
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

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];
        let sql = format!(
            "SELECT COUNT(*)::INT4 \
             FROM users \
             WHERE TRUE {}",
            filter_sql(&filter, &mut ps),
        );
        self.query_opt(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.map_or(0, |r| r.get::<_, i32>(0)).into())
    }
}
