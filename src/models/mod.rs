pub mod app_user;
pub mod application;
pub mod conversation;
pub mod item;
pub mod timestamp;

pub use app_user::*;
pub use application::*;
pub use conversation::*;
pub use item::*;
