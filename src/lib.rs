pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;

pub use db::DbPool;

use std::sync::Arc;

use auth::google::IdentityVerifier;
use auth::TokenService;
use chat::ChatHub;
use config::Config;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tokens: TokenService,
    pub chat: ChatHub,
    /// Set when Google sign-in is configured; `None` disables the
    /// `/api/auth/google` route's upstream verification.
    pub google: Option<Arc<dyn IdentityVerifier>>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, google: Option<Arc<dyn IdentityVerifier>>) -> Self {
        let tokens = TokenService::new(&config.auth);
        Self {
            config,
            db,
            tokens,
            chat: ChatHub::new(),
            google,
        }
    }
}
