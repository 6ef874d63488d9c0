pub mod assistant;
pub mod conversion;
pub mod database;
pub mod export;
pub mod polling;
pub mod session_store;
pub mod settings;

pub use assistant::{AssistantError, AssistantOptions, AssistantService};
pub use conversion::{CommandConverter, ConversionError, Converter};
pub use database::Database;
pub use session_store::SessionStore;
pub use settings::{AppSettings, SettingsService};
