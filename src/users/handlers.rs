use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, FromRef, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    state::AppState,
    users::{
        dto::{CreateUserRequest, Envelope, ListQuery, UpdateUserRequest, UserPage},
        errors::UserError,
        repo_types::PublicUser,
        services::UserService,
    },
};

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/save", post(create_user))
        .route("/users/update", post(update_user))
}

fn bad_json(rejection: JsonRejection) -> UserError {
    UserError::Invalid(rejection.body_text())
}

#[instrument(skip(users))]
pub async fn list_users(
    State(users): State<UserService>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Envelope<UserPage>>, UserError> {
    let page = users.list(q).await?;
    Ok(Json(Envelope::ok(page)))
}

#[instrument(skip(users))]
pub async fn get_user(
    State(users): State<UserService>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Envelope<PublicUser>>, UserError> {
    let Path(id) = id.map_err(|e| UserError::Invalid(e.body_text()))?;
    match users.get(id).await? {
        Some(user) => Ok(Json(Envelope::ok(user))),
        None => Err(UserError::NotFound),
    }
}

#[instrument(skip(users, payload))]
pub async fn create_user(
    State(users): State<UserService>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<PublicUser>>), UserError> {
    let Json(payload) = payload.map_err(bad_json)?;
    let user = users.create(payload).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(user))))
}

#[instrument(skip(users, payload))]
pub async fn update_user(
    State(users): State<UserService>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<Envelope<PublicUser>>, UserError> {
    let Json(payload) = payload.map_err(bad_json)?;
    let user = users.update(payload).await?;
    Ok(Json(Envelope::ok(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn ada() -> Value {
        json!({
            "name": "Ada",
            "surname": "Lovelace",
            "email": "ada@example.com",
            "password": "analytical",
            "age": 36,
            "country": "United Kingdom",
            "district": "Marylebone",
            "role": "admin"
        })
    }

    #[tokio::test]
    async fn create_then_fetch_without_password() {
        let app = build_app(AppState::fake());

        let (status, body) = call(&app, post_json("/api/v1/users/save", ada())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert!(body["data"].get("password").is_none());
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = call(&app, get(&format!("/api/v1/users/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "ada@example.com");
        assert!(body["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn list_returns_page_envelope() {
        let app = build_app(AppState::fake());
        call(&app, post_json("/api/v1/users/save", ada())).await;

        let (status, body) = call(&app, get("/api/v1/users?page=0&pageSize=10&search=LOVE")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["count"], 1);
        assert_eq!(body["data"]["pageCount"], 1);
        assert_eq!(body["data"]["users"][0]["name"], "Ada");
        assert!(body["data"]["users"][0].get("password").is_none());
    }

    #[tokio::test]
    async fn missing_user_is_404_envelope() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, get("/api/v1/users/12345")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "error": "User not found" }));
    }

    #[tokio::test]
    async fn non_numeric_id_is_400_envelope() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, get("/api/v1/users/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn update_reports_named_errors() {
        let app = build_app(AppState::fake());
        call(&app, post_json("/api/v1/users/save", ada())).await;

        let (status, body) =
            call(&app, post_json("/api/v1/users/update", json!({ "id": 1 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No fields to update");

        let (_, body) = call(
            &app,
            post_json("/api/v1/users/update", json!({ "id": 1, "password": "next" })),
        )
        .await;
        assert_eq!(body["error"], "Old password is required to change password");

        let (_, body) = call(
            &app,
            post_json(
                "/api/v1/users/update",
                json!({ "id": 1, "password": "next", "oldPassword": "wrong" }),
            ),
        )
        .await;
        assert_eq!(body["error"], "Old password is wrong");

        let (status, body) = call(
            &app,
            post_json("/api/v1/users/update", json!({ "id": 77, "name": "Grace" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
    }

    #[tokio::test]
    async fn update_applies_partial_patch() {
        let app = build_app(AppState::fake());
        call(&app, post_json("/api/v1/users/save", ada())).await;

        let (status, body) = call(
            &app,
            post_json(
                "/api/v1/users/update",
                json!({ "id": 1, "district": "Soho", "createdAt": "2000-01-01T00:00:00Z" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["district"], "Soho");
        assert_eq!(body["data"]["name"], "Ada");
    }

    #[tokio::test]
    async fn malformed_and_unknown_fields_are_400_envelope() {
        let app = build_app(AppState::fake());
        let (status, body) = call(
            &app,
            post_json("/api/v1/users/update", json!({ "id": 1, "isRoot": true })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = call(
            &app,
            post_json("/api/v1/users/save", json!({ "name": "only a name" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let app = build_app(AppState::fake());
        call(&app, post_json("/api/v1/users/save", ada())).await;
        let (status, body) = call(&app, post_json("/api/v1/users/save", ada())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }
}
