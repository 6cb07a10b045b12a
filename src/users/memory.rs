use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::store::{QueryResult, SqlParam, StoreError};
use crate::users::repo::UserStore;
use crate::users::repo_types::{
    ListFilter, NewUser, PublicUser, Role, SortKey, SortOrder, UserColumn, UserRow,
};

/// In-process `users` table with the same observable behavior as `PgUserStore`.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<UserRow>>,
    writes: Mutex<usize>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of insert/update calls that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }

    pub fn stored_hash(&self, id: i32) -> Option<String> {
        let rows = self.rows.lock().ok()?;
        rows.iter().find(|r| r.id == id).map(|r| r.password.clone())
    }

    fn bump_writes(&self) {
        if let Ok(mut w) = self.writes.lock() {
            *w += 1;
        }
    }

    fn lock(&self) -> QueryResult<std::sync::MutexGuard<'_, Vec<UserRow>>> {
        self.rows
            .lock()
            .map_err(|_| StoreError::other("memory store poisoned"))
    }

    fn matching(rows: &[UserRow], search: &str) -> Vec<UserRow> {
        let needle = search.to_lowercase();
        rows.iter()
            .filter(|r| {
                [&r.name, &r.surname, &r.email, &r.country, &r.district]
                    .iter()
                    .any(|f| f.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }
}

fn text(v: &SqlParam) -> QueryResult<String> {
    match v {
        SqlParam::Text(s) => Ok(s.clone()),
        other => Err(StoreError::other(format!("expected text, got {:?}", other))),
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn count(&self, filter: &ListFilter) -> QueryResult<i64> {
        let rows = self.lock()?;
        Ok(Self::matching(&rows, &filter.search).len() as i64)
    }

    async fn page(
        &self,
        filter: &ListFilter,
        offset: i64,
        limit: i64,
    ) -> QueryResult<Vec<PublicUser>> {
        let mut found = Self::matching(&self.lock()?, &filter.search);
        found.sort_by(|a, b| {
            let ord = match filter.sort {
                SortKey::Id => a.id.cmp(&b.id),
                SortKey::Name => a.name.cmp(&b.name),
                SortKey::Surname => a.surname.cmp(&b.surname),
                SortKey::Email => a.email.cmp(&b.email),
                SortKey::Age => a.age.cmp(&b.age),
                SortKey::Country => a.country.cmp(&b.country),
                SortKey::District => a.district.cmp(&b.district),
                SortKey::Role => a.role.as_str().cmp(b.role.as_str()),
                SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            };
            let ord = match filter.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            ord.then(a.id.cmp(&b.id))
        });
        Ok(found
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(PublicUser::from)
            .collect())
    }

    async fn find(&self, id: i32) -> QueryResult<Option<PublicUser>> {
        let rows = self.lock()?;
        Ok(rows
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .map(PublicUser::from))
    }

    async fn password_hash(&self, id: i32) -> QueryResult<Option<String>> {
        let rows = self.lock()?;
        Ok(rows.iter().find(|r| r.id == id).map(|r| r.password.clone()))
    }

    async fn insert(&self, user: &NewUser) -> QueryResult<PublicUser> {
        self.bump_writes();
        let mut rows = self.lock()?;
        if rows.iter().any(|r| r.email == user.email) {
            return Err(StoreError::unique(
                "duplicate key value violates unique constraint \"users_email_key\"",
            ));
        }
        let now = OffsetDateTime::now_utc();
        let row = UserRow {
            id: rows.iter().map(|r| r.id).max().unwrap_or(0) + 1,
            name: user.name.clone(),
            surname: user.surname.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            age: user.age,
            country: user.country.clone(),
            district: user.district.clone(),
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(PublicUser::from(row))
    }

    async fn update(
        &self,
        id: i32,
        changes: &[(UserColumn, SqlParam)],
    ) -> QueryResult<Option<PublicUser>> {
        self.bump_writes();
        let mut rows = self.lock()?;
        if let Some((_, SqlParam::Text(email))) =
            changes.iter().find(|(c, _)| *c == UserColumn::Email)
        {
            if rows.iter().any(|r| r.id != id && &r.email == email) {
                return Err(StoreError::unique(
                    "duplicate key value violates unique constraint \"users_email_key\"",
                ));
            }
        }
        let Some(row) = rows.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        for (col, v) in changes {
            match col {
                UserColumn::Name => row.name = text(v)?,
                UserColumn::Surname => row.surname = text(v)?,
                UserColumn::Email => row.email = text(v)?,
                UserColumn::Password => row.password = text(v)?,
                UserColumn::Country => row.country = text(v)?,
                UserColumn::District => row.district = text(v)?,
                UserColumn::Role => {
                    row.role = text(v)?
                        .parse::<Role>()
                        .map_err(|e| StoreError::other(e.to_string()))?
                }
                UserColumn::Age => match v {
                    SqlParam::Int(a) => row.age = *a,
                    other => {
                        return Err(StoreError::other(format!("expected int, got {:?}", other)))
                    }
                },
            }
        }
        row.updated_at = OffsetDateTime::now_utc();
        Ok(Some(PublicUser::from(row.clone())))
    }
}
