pub mod auth;
mod chat;
mod error;
pub mod middleware;
mod users;
mod ws;

pub use error::ApiError;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::Role;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let public_auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/google", post(auth::google_login))
        .route("/refresh", post(auth::refresh));

    // Auth routes that operate on the caller's own account
    let session_routes = Router::new()
        .route("/me", get(auth::me).put(auth::update_me))
        .route("/change-password", put(auth::change_password))
        .route("/logout", post(auth::logout))
        .route("/verify", get(auth::verify))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::authenticate_token,
        ));

    // User administration. Role gates are route layers so the shared
    // authenticate_token layer runs first and attaches the identity.
    let user_routes = Router::new()
        .route(
            "/",
            get(users::list_users).route_layer(from_fn(middleware::require_role([
                Role::Admin,
                Role::Pastor,
            ]))),
        )
        .route("/:id", get(users::get_user))
        .route(
            "/:id/role",
            put(users::set_user_role)
                .route_layer(from_fn(middleware::require_role([Role::Admin]))),
        )
        .route(
            "/:id/status",
            put(users::set_user_status)
                .route_layer(from_fn(middleware::require_role([Role::Admin]))),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::authenticate_token,
        ));

    // Chat history (live delivery is on the websocket)
    let chat_routes = Router::new()
        .route(
            "/:room_id",
            get(chat::get_room_messages).post(chat::post_room_message),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::authenticate_token,
        ));

    // Admin console auth, verified against the admin secret
    let admin_auth_routes = Router::new()
        .route("/login", post(auth::admin_login))
        .route("/register", post(auth::admin_register))
        .route("/logout", post(auth::admin_logout))
        .merge(
            Router::new()
                .route("/verify", get(auth::admin_verify))
                .layer(from_fn_with_state(
                    state.clone(),
                    middleware::authenticate_admin,
                )),
        );

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/ws/chat", get(ws::chat_ws))
        .nest("/api/auth", public_auth_routes.merge(session_routes))
        .nest("/api/users", user_routes)
        .nest("/api/chat", chat_routes)
        .nest("/api/admin/auth", admin_auth_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn service_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health_check() -> &'static str {
    "OK"
}
