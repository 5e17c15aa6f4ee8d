pub mod api;
pub mod config;
mod controller;
pub mod error;
pub mod events;
pub mod prompt;
pub mod session;
pub mod transcript;

pub use api::{HttpWidgetApi, WidgetApi};
pub use config::{load_settings, WidgetSettings};
pub use controller::WidgetController;
pub use error::{ApiError, SettingsError, StorageError};
pub use events::{DispatchOutcome, ImageUpload, UiAction, WidgetEvent};
pub use session::{FileSessionStorage, MemorySessionStorage, SessionManager, SessionStorage};
