mod loader;
mod raw;
pub mod error;

pub use error::ConfigError;
pub use loader::{load, load_from_env, AppConfig, StoreBackend};
