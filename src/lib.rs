pub mod config;
pub mod db;
pub mod error;
pub mod google_auth;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
pub mod validation;

pub use config::Config;
pub use error::{AppError, AppResult};
