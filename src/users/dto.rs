use serde::{Deserialize, Serialize};

use crate::store::SqlParam;
use crate::users::repo_types::{PublicUser, Role, UserColumn};

/// Raw `GET /users` query. Numbers stay strings so bad input can fall back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<PublicUser>,
    pub count: i64,
    pub page_count: i64,
}

/// Request body for `POST /users/save`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub age: i32,
    pub country: String,
    pub district: String,
    pub role: Role,
}

/// Request body for `POST /users/update`. Unknown keys are rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub id: Option<i32>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i32>,
    pub country: Option<String>,
    pub district: Option<String>,
    pub role: Option<Role>,
    // accepted so a full record can be posted back; never written
    pub created_at: Option<serde_json::Value>,
    pub updated_at: Option<serde_json::Value>,
    pub old_password: Option<String>,
}

/// Fields an update may change.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i32>,
    pub country: Option<String>,
    pub district: Option<String>,
    pub role: Option<Role>,
}

impl UpdateUserRequest {
    /// Splits the request into target id, patch and old password, dropping
    /// `createdAt`/`updatedAt`. Empty password strings count as absent.
    pub fn into_parts(self) -> (Option<i32>, UserPatch, Option<String>) {
        let patch = UserPatch {
            name: self.name,
            surname: self.surname,
            email: self.email,
            password: self.password.filter(|p| !p.is_empty()),
            age: self.age,
            country: self.country,
            district: self.district,
            role: self.role,
        };
        let old_password = self.old_password.filter(|p| !p.is_empty());
        (self.id, patch, old_password)
    }
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.changes().is_empty()
    }

    /// Column/value pairs in a fixed column order.
    pub fn changes(&self) -> Vec<(UserColumn, SqlParam)> {
        let text = |col: UserColumn, v: &Option<String>| {
            v.as_ref().map(|s| (col, SqlParam::Text(s.clone())))
        };
        [
            text(UserColumn::Name, &self.name),
            text(UserColumn::Surname, &self.surname),
            text(UserColumn::Email, &self.email),
            text(UserColumn::Password, &self.password),
            self.age.map(|a| (UserColumn::Age, SqlParam::Int(a))),
            text(UserColumn::Country, &self.country),
            text(UserColumn::District, &self.district),
            self.role
                .map(|r| (UserColumn::Role, SqlParam::Text(r.as_str().to_string()))),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// `{success, data}` / `{success, error}` response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl Envelope<()> {
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
