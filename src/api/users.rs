//! User administration endpoints. Listing is open to leadership
//! roles; role and status changes are admin-only.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::{Role, User, UserResponse};
use crate::AppState;

use super::error::ApiError;
use super::middleware::CurrentUser;

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    pub is_active: bool,
}

/// GET /api/users (admin, pastor)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = User::list(&state.db).await?;
    Ok(Json(UserListResponse {
        success: true,
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// GET /api/users/:id (any authenticated user)
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let user = User::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserEnvelope {
        success: true,
        message: None,
        user: user.into(),
    }))
}

/// PUT /api/users/:id/role (admin)
pub async fn set_user_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<SetRoleRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    if User::find_by_id(&state.db, &id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    User::set_role(&state.db, &id, request.role).await?;

    let user = User::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserEnvelope {
        success: true,
        message: Some("User role updated successfully".to_string()),
        user: user.into(),
    }))
}

/// PUT /api/users/:id/status (admin)
///
/// Admins cannot deactivate themselves; that would lock the console.
pub async fn set_user_status(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    if current.user.id == id && !request.is_active {
        return Err(ApiError::bad_request("Cannot deactivate your own account"));
    }
    if User::find_by_id(&state.db, &id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    User::set_active(&state.db, &id, request.is_active).await?;

    let user = User::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserEnvelope {
        success: true,
        message: Some("User status updated successfully".to_string()),
        user: user.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::NewUser;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn setup() -> (Arc<AppState>, axum::Router, String, String) {
        let pool = crate::db::test_pool().await;
        let state = Arc::new(AppState::new(Config::default(), pool, None));
        let router = crate::api::create_router(state.clone());

        let admin = seed(&state, "admin@example.com", Role::Admin).await;
        let member = seed(&state, "member@example.com", Role::Member).await;
        let admin_token = state.tokens.issue_access(&admin).unwrap();
        let member_token = state.tokens.issue_access(&member).unwrap();
        (state, router, admin_token, member_token)
    }

    async fn seed(state: &AppState, email: &str, role: Role) -> String {
        User::insert(
            &state.db,
            NewUser {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                name: email.split('@').next().unwrap().to_string(),
                phone_number: None,
                role,
                google_id: None,
                profile_picture: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn request(
        router: &axum::Router,
        method: &str,
        path: &str,
        token: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("Authorization", format!("Bearer {token}"));
        let request = match body {
            Some(body) => {
                builder = builder.header("Content-Type", "application/json");
                builder.body(Body::from(body.to_string())).unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn listing_is_gated_to_leadership() {
        let (_state, router, admin_token, member_token) = setup().await;

        let (status, _) = request(&router, "GET", "/api/users", &member_token, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = request(&router, "GET", "/api/users", &admin_token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn role_change_is_admin_only() {
        let (state, router, admin_token, member_token) = setup().await;
        let target = seed(&state, "promote@example.com", Role::Member).await;

        let (status, _) = request(
            &router,
            "PUT",
            &format!("/api/users/{target}/role"),
            &member_token,
            Some(serde_json::json!({ "role": "leader" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = request(
            &router,
            "PUT",
            &format!("/api/users/{target}/role"),
            &admin_token,
            Some(serde_json::json!({ "role": "leader" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "leader");
    }

    #[tokio::test]
    async fn admin_cannot_deactivate_self() {
        let (state, router, admin_token, _member_token) = setup().await;
        let admin = User::find_by_email(&state.db, "admin@example.com")
            .await
            .unwrap()
            .unwrap();

        let (status, _) = request(
            &router,
            "PUT",
            &format!("/api/users/{}/status", admin.id),
            &admin_token,
            Some(serde_json::json!({ "isActive": false })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
