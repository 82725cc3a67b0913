use serde::{Deserialize, Serialize};

use landlord_controller::ControllerConfig;

/// Raw TOML representation of the whole Landlord config file. Every section
/// is optional — an empty file loads all-defaults via `ControllerConfig`'s
/// own `#[serde(default)]` plus the defaults below.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawConfig {
    /// `ControllerConfig` already carries `#[serde(default)]` on every field
    /// (duration fields via `humantime_serde`), so it is reused directly as
    /// the `[controller]` table shape rather than duplicated here.
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub api: RawApiConfig,
    #[serde(default)]
    pub store: RawStoreConfig,
    pub workflow_provider: Option<String>,
    pub compute_provider: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawApiConfig {
    pub bind_addr: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawStoreConfig {
    /// "memory" (default) or "postgres".
    pub backend: Option<String>,
    /// Required when `backend = "postgres"`.
    pub dsn: Option<String>,
}
