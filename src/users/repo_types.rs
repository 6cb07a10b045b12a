use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Row of the `users` table, password hash included. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String, // argon2 PHC string
    pub age: i32,
    pub country: String,
    pub district: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(rename = "createdAt")]
    pub created_at: OffsetDateTime,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: OffsetDateTime,
}

/// Redacted user: the only shape that leaves the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i32,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub age: i32,
    pub country: String,
    pub district: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<UserRow> for PublicUser {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            surname: r.surname,
            email: r.email,
            age: r.age,
            country: r.country,
            district: r.district,
            role: r.role,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Columns an update may write. SQL fragments are built from this set only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UserColumn {
    Name,
    Surname,
    Email,
    Password,
    Age,
    Country,
    District,
    Role,
}

impl UserColumn {
    pub fn as_sql(self) -> &'static str {
        match self {
            UserColumn::Name => "name",
            UserColumn::Surname => "surname",
            UserColumn::Email => "email",
            UserColumn::Password => "password",
            UserColumn::Age => "age",
            UserColumn::Country => "country",
            UserColumn::District => "district",
            UserColumn::Role => "role",
        }
    }
}

/// Columns a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Id,
    Name,
    Surname,
    Email,
    Age,
    Country,
    District,
    Role,
    CreatedAt,
    UpdatedAt,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<Self> {
        let key = match s {
            "id" => SortKey::Id,
            "name" => SortKey::Name,
            "surname" => SortKey::Surname,
            "email" => SortKey::Email,
            "age" => SortKey::Age,
            "country" => SortKey::Country,
            "district" => SortKey::District,
            "role" => SortKey::Role,
            "createdAt" => SortKey::CreatedAt,
            "updatedAt" => SortKey::UpdatedAt,
            _ => return None,
        };
        Some(key)
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::Surname => "surname",
            SortKey::Email => "email",
            SortKey::Age => "age",
            SortKey::Country => "country",
            SortKey::District => "district",
            SortKey::Role => "role",
            SortKey::CreatedAt => "\"createdAt\"",
            SortKey::UpdatedAt => "\"updatedAt\"",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(SortOrder::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(SortOrder::Desc)
        } else {
            None
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Search and ordering for a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub search: String,
    pub sort: SortKey,
    pub order: SortOrder,
}

/// Insert payload; `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub age: i32,
    pub country: String,
    pub district: String,
    pub role: Role,
}
