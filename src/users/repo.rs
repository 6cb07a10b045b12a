use async_trait::async_trait;

use crate::store::{Gateway, QueryResult, SqlParam};
use crate::users::repo_types::{ListFilter, NewUser, PublicUser, UserColumn, UserRow};

const USER_COLUMNS: &str = r#"id, name, surname, email, password, age, country, district, role, "createdAt", "updatedAt""#;
const SEARCHABLE: [&str; 5] = ["name", "surname", "email", "country", "district"];

/// Access to the `users` table. Every read returns redacted users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn count(&self, filter: &ListFilter) -> QueryResult<i64>;
    async fn page(
        &self,
        filter: &ListFilter,
        offset: i64,
        limit: i64,
    ) -> QueryResult<Vec<PublicUser>>;
    async fn find(&self, id: i32) -> QueryResult<Option<PublicUser>>;
    async fn password_hash(&self, id: i32) -> QueryResult<Option<String>>;
    async fn insert(&self, user: &NewUser) -> QueryResult<PublicUser>;
    /// `None` when no row has `id`.
    async fn update(
        &self,
        id: i32,
        changes: &[(UserColumn, SqlParam)],
    ) -> QueryResult<Option<PublicUser>>;
}

/// `%term%` with LIKE metacharacters escaped.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut out = String::with_capacity(search.len() + 2);
    out.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// `name ILIKE $1 OR surname ILIKE $1 ...`
pub(crate) fn search_predicate() -> String {
    SEARCHABLE
        .iter()
        .map(|col| format!("{} ILIKE $1", col))
        .collect::<Vec<_>>()
        .join(" OR ")
}

pub(crate) fn order_clause(filter: &ListFilter) -> String {
    format!(
        "ORDER BY {} {}, id ASC",
        filter.sort.as_sql(),
        filter.order.as_sql()
    )
}

/// `UPDATE` statement for `columns`; values bind as `$1..$n`, the id as `$n+1`.
pub(crate) fn update_statement(columns: &[UserColumn]) -> String {
    let mut sets: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} = ${}", col.as_sql(), i + 1))
        .collect();
    sets.push(r#""updatedAt" = NOW()"#.to_string());
    format!(
        "UPDATE users SET {} WHERE id = ${} RETURNING {}",
        sets.join(", "),
        columns.len() + 1,
        USER_COLUMNS
    )
}

fn redact(rows: Vec<UserRow>) -> Vec<PublicUser> {
    rows.into_iter().map(PublicUser::from).collect()
}

#[derive(Clone)]
pub struct PgUserStore {
    gw: Gateway,
}

impl PgUserStore {
    pub fn new(gw: Gateway) -> Self {
        Self { gw }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn count(&self, filter: &ListFilter) -> QueryResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM users WHERE {}", search_predicate());
        let rows = self
            .gw
            .query::<(i64,)>(&sql, vec![SqlParam::Text(like_pattern(&filter.search))])
            .await?;
        Ok(rows.first().map(|r| r.0).unwrap_or(0))
    }

    async fn page(
        &self,
        filter: &ListFilter,
        offset: i64,
        limit: i64,
    ) -> QueryResult<Vec<PublicUser>> {
        let sql = format!(
            "SELECT {} FROM users WHERE {} {} OFFSET $2 LIMIT $3",
            USER_COLUMNS,
            search_predicate(),
            order_clause(filter)
        );
        self.gw
            .query_with::<UserRow, _, _>(
                &sql,
                vec![
                    SqlParam::Text(like_pattern(&filter.search)),
                    SqlParam::BigInt(offset),
                    SqlParam::BigInt(limit),
                ],
                redact,
            )
            .await
    }

    async fn find(&self, id: i32) -> QueryResult<Option<PublicUser>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        self.gw
            .query_with::<UserRow, _, _>(&sql, vec![SqlParam::Int(id)], |rows| {
                redact(rows).into_iter().next()
            })
            .await
    }

    async fn password_hash(&self, id: i32) -> QueryResult<Option<String>> {
        let rows = self
            .gw
            .query::<(String,)>(
                "SELECT password FROM users WHERE id = $1",
                vec![SqlParam::Int(id)],
            )
            .await?;
        Ok(rows.into_iter().next().map(|r| r.0))
    }

    async fn insert(&self, user: &NewUser) -> QueryResult<PublicUser> {
        let sql = format!(
            r#"
            INSERT INTO users (name, surname, email, password, age, country, district, role, "createdAt", "updatedAt")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let params = vec![
            SqlParam::Text(user.name.clone()),
            SqlParam::Text(user.surname.clone()),
            SqlParam::Text(user.email.clone()),
            SqlParam::Text(user.password.clone()),
            SqlParam::Int(user.age),
            SqlParam::Text(user.country.clone()),
            SqlParam::Text(user.district.clone()),
            SqlParam::Text(user.role.as_str().to_string()),
        ];
        let created = self
            .gw
            .query_with::<UserRow, _, _>(&sql, params, |rows| redact(rows).into_iter().next())
            .await?;
        created.ok_or_else(|| crate::store::StoreError::other("insert returned no row"))
    }

    async fn update(
        &self,
        id: i32,
        changes: &[(UserColumn, SqlParam)],
    ) -> QueryResult<Option<PublicUser>> {
        let columns: Vec<UserColumn> = changes.iter().map(|(c, _)| *c).collect();
        let sql = update_statement(&columns);
        let mut params: Vec<SqlParam> = changes.iter().map(|(_, v)| v.clone()).collect();
        params.push(SqlParam::Int(id));
        self.gw
            .query_with::<UserRow, _, _>(&sql, params, |rows| redact(rows).into_iter().next())
            .await
    }
}
