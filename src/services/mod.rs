pub mod ai_service;
pub mod applications_service;
pub mod auth_service;
pub mod items_service;
pub mod messages_service;
pub mod notifier;
pub mod profile_service;

pub use ai_service::{AiService, GenerateDescriptionInput};
pub use applications_service::ApplicationWorkflow;
pub use auth_service::AuthService;
pub use items_service::ItemStore;
pub use messages_service::{CreateConversationInput, MessageService, ReportInput};
pub use notifier::Notifier;
pub use profile_service::{ProfileService, UpdateProfileInput};
