//! Account endpoints: registration, login, Google sign-in, token
//! refresh, profile, and the admin console's own login surface.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::google::sign_in_with_google;
use crate::auth::{hash_password, verify_password, AuthError, TokenKind};
use crate::db::{NewUser, Role, User, UserResponse};
use crate::AppState;

use super::error::ApiError;
use super::middleware::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    /// Absent means "leave unchanged"; an explicit null clears the
    /// number.
    #[serde(default)]
    pub phone_number: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthResponse {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
    pub is_new_account: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 6 {
        return Err(ApiError::bad_request(
            "Password must be at least 6 characters long",
        ));
    }
    Ok(())
}

fn issue_pair(state: &AppState, user_id: &str) -> Result<(String, String), ApiError> {
    let token = state.tokens.issue_access(user_id)?;
    let refresh_token = state.tokens.issue_refresh(user_id)?;
    Ok((token, refresh_token))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if request.name.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        return Err(ApiError::bad_request(
            "Name, email, and password are required",
        ));
    }
    if !request.email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    validate_password(&request.password)?;

    if User::find_by_email(&state.db, &request.email).await?.is_some() {
        return Err(ApiError::conflict("User with this email already exists"));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    let user = User::insert(
        &state.db,
        NewUser {
            email: request.email,
            password_hash,
            name: request.name,
            phone_number: request.phone.map(|p| p.trim().to_string()),
            role: Role::Member,
            google_id: None,
            profile_picture: None,
        },
    )
    .await?;

    let (token, refresh_token) = issue_pair(&state, &user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "User registered successfully".to_string(),
            user: user.into(),
            token,
            refresh_token,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let user = User::find_by_email(&state.db, &request.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    if !user.is_active {
        return Err(ApiError::unauthorized("Account is deactivated"));
    }
    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    User::touch_last_seen(&state.db, &user.id).await?;
    let (token, refresh_token) = issue_pair(&state, &user.id)?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".to_string(),
        user: user.into(),
        token,
        refresh_token,
    }))
}

/// POST /api/auth/google
pub async fn google_login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GoogleLoginRequest>,
) -> Result<Json<GoogleAuthResponse>, ApiError> {
    if request.id_token.is_empty() {
        return Err(ApiError::bad_request("Google ID token is required"));
    }
    let verifier = state
        .google
        .as_ref()
        .ok_or_else(|| ApiError::internal("Google sign-in is not configured"))?;

    let signin =
        sign_in_with_google(&state.db, verifier.as_ref(), &state.tokens, &request.id_token)
            .await?;

    let message = if signin.is_new_account {
        "Account created and login successful"
    } else {
        "Login successful"
    };

    Ok(Json(GoogleAuthResponse {
        success: true,
        message: message.to_string(),
        user: signin.user,
        token: signin.token,
        refresh_token: signin.refresh_token,
        is_new_account: signin.is_new_account,
    }))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    if request.refresh_token.is_empty() {
        return Err(ApiError::bad_request("Refresh token required"));
    }

    let claims = state
        .tokens
        .verify(&request.refresh_token, TokenKind::Refresh)
        .map_err(|e| match e {
            AuthError::Upstream(_) => ApiError::from(e),
            _ => ApiError::unauthorized("Invalid or expired refresh token"),
        })?;

    let user = User::find_by_id(&state.db, &claims.user_id).await?;
    let user = match user {
        Some(user) if user.is_active => user,
        _ => {
            return Err(ApiError::unauthorized(
                "User not found or account deactivated",
            ))
        }
    };

    let (token, refresh_token) = issue_pair(&state, &user.id)?;

    Ok(Json(RefreshResponse {
        success: true,
        message: "Token refreshed successfully".to_string(),
        token,
        refresh_token,
    }))
}

/// GET /api/auth/me
pub async fn me(current: CurrentUser) -> Json<UserEnvelope> {
    Json(UserEnvelope {
        success: true,
        message: None,
        user: current.user,
    })
}

/// PUT /api/auth/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    User::update_profile(
        &state.db,
        &current.user.id,
        request.name.as_deref(),
        request
            .phone_number
            .as_ref()
            .map(|phone| phone.as_deref()),
    )
    .await?;

    let user = User::find_by_id(&state.db, &current.user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserEnvelope {
        success: true,
        message: Some("Profile updated successfully".to_string()),
        user: user.into(),
    }))
}

/// PUT /api/auth/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if request.current_password.is_empty() || request.new_password.is_empty() {
        return Err(ApiError::bad_request(
            "Current password and new password are required",
        ));
    }
    validate_password(&request.new_password)?;

    // Reload with the hash; the attached identity is sanitized.
    let user = User::find_by_id(&state.db, &current.user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !verify_password(&request.current_password, &user.password_hash) {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let password_hash = hash_password(&request.new_password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;
    User::set_password(&state.db, &user.id, &password_hash).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Password changed successfully".to_string(),
    }))
}

/// POST /api/auth/logout
///
/// Tokens are stateless, so logout is client-side; previously issued
/// refresh tokens stay valid until natural expiry.
pub async fn logout(_current: CurrentUser) -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    })
}

/// GET /api/auth/verify
pub async fn verify(current: CurrentUser) -> Json<UserEnvelope> {
    Json(UserEnvelope {
        success: true,
        message: Some("Token is valid".to_string()),
        user: current.user,
    })
}

// -------------------------------------------------------------------------
// Admin console authentication
// -------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminRegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminAuthData {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct AdminAuthResponse {
    pub success: bool,
    pub message: String,
    pub data: AdminAuthData,
}

/// POST /api/admin/auth/login
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<Json<AdminAuthResponse>, ApiError> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let user = User::find_by_name_or_email(&state.db, &request.username)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid admin credentials"))?;

    if user.role != Role::Admin {
        return Err(ApiError::forbidden(
            "Access denied. Admin privileges required.",
        ));
    }
    // Deactivation applies to admins like everyone else.
    if !user.is_active {
        return Err(ApiError::unauthorized("Account is deactivated"));
    }
    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid admin credentials"));
    }

    let token = state.tokens.issue_admin(&user)?;
    User::touch_last_seen(&state.db, &user.id).await?;

    Ok(Json(AdminAuthResponse {
        success: true,
        message: "Login successful".to_string(),
        data: AdminAuthData {
            token,
            user: user.into(),
        },
    }))
}

/// POST /api/admin/auth/register
pub async fn admin_register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdminRegisterRequest>,
) -> Result<(StatusCode, Json<AdminAuthResponse>), ApiError> {
    if request.username.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        return Err(ApiError::bad_request(
            "Username, email, and password are required",
        ));
    }
    validate_password(&request.password)?;

    let taken = User::find_by_email(&state.db, &request.email).await?.is_some()
        || User::find_by_name_or_email(&state.db, &request.username)
            .await?
            .is_some();
    if taken {
        return Err(ApiError::conflict(
            "Admin with this email or username already exists",
        ));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    let user = User::insert(
        &state.db,
        NewUser {
            email: request.email,
            password_hash,
            name: request.username,
            phone_number: None,
            role: Role::Admin,
            google_id: None,
            profile_picture: None,
        },
    )
    .await?;

    let token = state.tokens.issue_admin(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(AdminAuthResponse {
            success: true,
            message: "Admin account created successfully".to_string(),
            data: AdminAuthData {
                token,
                user: user.into(),
            },
        }),
    ))
}

/// GET /api/admin/auth/verify (behind the admin middleware)
pub async fn admin_verify(current: CurrentUser) -> Json<UserEnvelope> {
    Json(UserEnvelope {
        success: true,
        message: Some("Token is valid".to_string()),
        user: current.user,
    })
}

/// POST /api/admin/auth/logout
pub async fn admin_logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn app() -> (Arc<AppState>, axum::Router) {
        let pool = crate::db::test_pool().await;
        let state = Arc::new(AppState::new(Config::default(), pool, None));
        let router = crate::api::create_router(state.clone());
        (state, router)
    }

    async fn post_json(
        router: &axum::Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        send(router, "POST", path, Some(body), None).await
    }

    async fn send(
        router: &axum::Router,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
        token: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn register_login_me_flow() {
        let (_state, router) = app().await;

        let (status, body) = post_json(
            &router,
            "/api/auth/register",
            serde_json::json!({
                "name": "Ama",
                "email": "Ama@Example.com",
                "password": "trustandobey"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["email"], "ama@example.com");
        assert!(body["user"].get("passwordHash").is_none());
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&router, "GET", "/api/auth/me", None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["name"], "Ama");

        let (status, body) = post_json(
            &router,
            "/api/auth/login",
            serde_json::json!({ "email": "ama@example.com", "password": "trustandobey" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Login successful");
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_weak_passwords() {
        let (_state, router) = app().await;

        let (status, _) = post_json(
            &router,
            "/api/auth/register",
            serde_json::json!({ "name": "A", "email": "a@example.com", "password": "short" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let body = serde_json::json!({
            "name": "A", "email": "a@example.com", "password": "longenough"
        });
        let (status, _) = post_json(&router, "/api/auth/register", body.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = post_json(&router, "/api/auth/register", body).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "User with this email already exists");
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (_state, router) = app().await;
        post_json(
            &router,
            "/api/auth/register",
            serde_json::json!({ "name": "B", "email": "b@example.com", "password": "password1" }),
        )
        .await;

        let (status, body) = post_json(
            &router,
            "/api/auth/login",
            serde_json::json!({ "email": "nobody@example.com", "password": "password1" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");

        let (status, body) = post_json(
            &router,
            "/api/auth/login",
            serde_json::json!({ "email": "b@example.com", "password": "wrong" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn refresh_rotates_the_pair() {
        let (state, router) = app().await;
        let (_, body) = post_json(
            &router,
            "/api/auth/register",
            serde_json::json!({ "name": "C", "email": "c@example.com", "password": "password1" }),
        )
        .await;
        let refresh_token = body["refreshToken"].as_str().unwrap().to_string();
        let user_id = body["user"]["id"].as_str().unwrap().to_string();

        let (status, body) = post_json(
            &router,
            "/api/auth/refresh",
            serde_json::json!({ "refreshToken": refresh_token }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let new_access = body["token"].as_str().unwrap();
        let claims = state
            .tokens
            .verify(new_access, TokenKind::Access)
            .unwrap();
        assert_eq!(claims.user_id, user_id);

        // An access token is not accepted as a refresh token.
        let access = body["token"].as_str().unwrap().to_string();
        let (status, body) = post_json(
            &router,
            "/api/auth/refresh",
            serde_json::json!({ "refreshToken": access }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or expired refresh token");
    }

    #[tokio::test]
    async fn change_password_requires_current() {
        let (_state, router) = app().await;
        let (_, body) = post_json(
            &router,
            "/api/auth/register",
            serde_json::json!({ "name": "D", "email": "d@example.com", "password": "firstpass" }),
        )
        .await;
        let token = body["token"].as_str().unwrap().to_string();

        let (status, _) = send(
            &router,
            "PUT",
            "/api/auth/change-password",
            Some(serde_json::json!({
                "currentPassword": "wrong",
                "newPassword": "secondpass"
            })),
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &router,
            "PUT",
            "/api/auth/change-password",
            Some(serde_json::json!({
                "currentPassword": "firstpass",
                "newPassword": "secondpass"
            })),
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = post_json(
            &router,
            "/api/auth/login",
            serde_json::json!({ "email": "d@example.com", "password": "secondpass" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_login_requires_admin_role() {
        let (state, router) = app().await;
        post_json(
            &router,
            "/api/auth/register",
            serde_json::json!({ "name": "E", "email": "e@example.com", "password": "password1" }),
        )
        .await;

        let (status, body) = post_json(
            &router,
            "/api/admin/auth/login",
            serde_json::json!({ "username": "e@example.com", "password": "password1" }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access denied. Admin privileges required.");

        let (status, body) = post_json(
            &router,
            "/api/admin/auth/register",
            serde_json::json!({
                "username": "warden",
                "email": "warden@example.com",
                "password": "password1"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let admin_token = body["data"]["token"].as_str().unwrap().to_string();

        // The admin token opens the admin verify endpoint.
        let (status, body) = send(
            &router,
            "GET",
            "/api/admin/auth/verify",
            None,
            Some(&admin_token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "admin");

        // But not the ordinary protected surface: different secret.
        let (status, _) = send(&router, "GET", "/api/auth/me", None, Some(&admin_token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let claims = state
            .tokens
            .verify(&admin_token, TokenKind::Admin)
            .unwrap();
        assert_eq!(claims.email.as_deref(), Some("warden@example.com"));
    }
}
