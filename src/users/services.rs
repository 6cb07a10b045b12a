use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::users::{
    dto::{CreateUserRequest, ListQuery, UpdateUserRequest, UserPage, UserPatch},
    errors::UserError,
    password::{hash_password, verify_password, Verification},
    repo::UserStore,
    repo_types::{ListFilter, NewUser, PublicUser, SortKey, SortOrder, UserColumn},
};

pub const DEFAULT_PAGE: i64 = 0;
pub const DEFAULT_PAGE_SIZE: i64 = 20;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Zero-based page and page size. Unparseable or out-of-range input falls back to both defaults.
pub(crate) fn parse_paging(page: Option<&str>, page_size: Option<&str>) -> (i64, i64) {
    let page_num = page.map(|p| p.trim().parse::<i64>()).unwrap_or(Ok(DEFAULT_PAGE));
    let size_num = page_size
        .map(|p| p.trim().parse::<i64>())
        .unwrap_or(Ok(DEFAULT_PAGE_SIZE));
    match (page_num, size_num) {
        (Ok(p), Ok(s)) if p >= 0 && s >= 1 => (p, s),
        _ => {
            warn!(?page, ?page_size, "invalid page or pageSize; using defaults");
            (DEFAULT_PAGE, DEFAULT_PAGE_SIZE)
        }
    }
}

/// `ceil(count / page_size)` without overflowing for huge page sizes.
pub(crate) fn page_count(count: i64, page_size: i64) -> i64 {
    count / page_size + i64::from(count % page_size != 0)
}

fn required(field: &str, value: &str) -> Result<String, UserError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(UserError::Invalid(format!("{} is required", field)));
    }
    Ok(v.to_string())
}

fn normalize_email(email: &str) -> Result<String, UserError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(UserError::Invalid("Email is required".into()));
    }
    if !is_valid_email(&email) {
        return Err(UserError::Invalid("Email is invalid".into()));
    }
    Ok(email)
}

fn valid_age(age: i32) -> Result<i32, UserError> {
    if age <= 0 {
        return Err(UserError::Invalid("Age must be a positive number".into()));
    }
    Ok(age)
}

/// Trims and checks the fields present in a patch; absent fields are left alone.
fn validate_patch(mut patch: UserPatch) -> Result<UserPatch, UserError> {
    patch.name = patch.name.as_deref().map(|v| required("Name", v)).transpose()?;
    patch.surname = patch
        .surname
        .as_deref()
        .map(|v| required("Surname", v))
        .transpose()?;
    patch.email = patch.email.as_deref().map(normalize_email).transpose()?;
    patch.country = patch
        .country
        .as_deref()
        .map(|v| required("Country", v))
        .transpose()?;
    patch.district = patch
        .district
        .as_deref()
        .map(|v| required("District", v))
        .transpose()?;
    patch.age = patch.age.map(valid_age).transpose()?;
    Ok(patch)
}

fn hash(plain: &str) -> Result<String, UserError> {
    hash_password(plain).map_err(|e| UserError::Hash(e.to_string()))
}

/// User directory operations over an injected store.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, q: ListQuery) -> Result<UserPage, UserError> {
        let (page, page_size) = parse_paging(q.page.as_deref(), q.page_size.as_deref());

        let sort = match q.sort.as_deref().filter(|s| !s.is_empty()) {
            None => SortKey::default(),
            Some(s) => SortKey::parse(s).unwrap_or_else(|| {
                warn!(sort = %s, "unknown sort key; sorting by id");
                SortKey::default()
            }),
        };
        let order = match q.order.as_deref().filter(|s| !s.is_empty()) {
            None => SortOrder::default(),
            Some(o) => SortOrder::parse(o).unwrap_or_else(|| {
                warn!(order = %o, "unknown sort order; using asc");
                SortOrder::default()
            }),
        };
        let filter = ListFilter {
            search: q.search.unwrap_or_default(),
            sort,
            order,
        };

        let count = self.store.count(&filter).await?;
        let users = self
            .store
            .page(&filter, page.saturating_mul(page_size), page_size)
            .await?;

        debug!(count, page, page_size, returned = users.len(), "users listed");
        Ok(UserPage {
            users,
            count,
            page_count: page_count(count, page_size),
        })
    }

    /// `Ok(None)` when no user has `id`.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<Option<PublicUser>, UserError> {
        Ok(self.store.find(id).await?)
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn create(&self, req: CreateUserRequest) -> Result<PublicUser, UserError> {
        if req.password.is_empty() {
            return Err(UserError::Invalid("Password is required".into()));
        }
        let user = NewUser {
            name: required("Name", &req.name)?,
            surname: required("Surname", &req.surname)?,
            email: normalize_email(&req.email)?,
            password: hash(&req.password)?,
            age: valid_age(req.age)?,
            country: required("Country", &req.country)?,
            district: required("District", &req.district)?,
            role: req.role,
        };

        let created = self.store.insert(&user).await?;
        info!(user_id = created.id, "user created");
        Ok(created)
    }

    #[instrument(skip(self, req), fields(user_id = ?req.id))]
    pub async fn update(&self, req: UpdateUserRequest) -> Result<PublicUser, UserError> {
        let (id, patch, old_password) = req.into_parts();

        if patch.is_empty() {
            return Err(UserError::NoFields);
        }
        let id = id.ok_or(UserError::NoId)?;
        if patch.password.is_some() && old_password.is_none() {
            return Err(UserError::OldPasswordRequired);
        }
        let mut patch = validate_patch(patch)?;

        if let (Some(new_password), Some(old_password)) =
            (patch.password.take(), old_password.as_deref())
        {
            let current = self
                .store
                .password_hash(id)
                .await?
                .ok_or(UserError::NotFound)?;
            let verdict = verify_password(old_password, &current)
                .map_err(|e| UserError::Hash(e.to_string()))?;
            if verdict == Verification::Mismatch {
                warn!(user_id = id, "old password mismatch");
                return Err(UserError::OldPasswordWrong);
            }
            patch.password = Some(hash(&new_password)?);
        }

        let changes = patch.changes();
        let columns: Vec<UserColumn> = changes.iter().map(|(c, _)| *c).collect();
        let updated = self
            .store
            .update(id, &changes)
            .await?
            .ok_or(UserError::NotFound)?;

        info!(user_id = id, ?columns, "user updated");
        Ok(updated)
    }
}
