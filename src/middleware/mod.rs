pub mod auth;

pub use auth::{AuthState, AuthenticatedUser, SESSION_COOKIE};
