//! Database models split into domain-specific modules.

pub mod chat_message;
pub mod user;

pub use chat_message::*;
pub use user::*;
