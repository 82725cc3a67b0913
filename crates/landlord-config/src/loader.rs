use std::path::Path;

use landlord_controller::ControllerConfig;
use tracing::debug;

use crate::error::ConfigError;
use crate::raw::RawConfig;

/// Which `TenantStore` implementation to construct.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Memory,
    Postgres { dsn: String },
}

/// Fully validated application configuration. `ControllerConfig` is reused
/// verbatim from `landlord-controller` — this crate's job is everything
/// around it: which store backend, which API address, which providers.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub controller: ControllerConfig,
    pub api_bind_addr: String,
    pub store: StoreBackend,
    pub workflow_provider: String,
    pub compute_provider: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            controller: ControllerConfig::default(),
            api_bind_addr: "0.0.0.0:8080".to_string(),
            store: StoreBackend::Memory,
            workflow_provider: "inmemory".to_string(),
            compute_provider: "mock".to_string(),
        }
    }
}

/// Loads `path` as TOML, overlays `LANDLORD_*` environment variables, and
/// validates into an [`AppConfig`].
pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let raw: RawConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;
    debug!(path = %path.display(), "loaded config file");
    convert(raw)
}

/// Builds an [`AppConfig`] from defaults plus `LANDLORD_*` environment
/// overrides only, with no config file. Used by callers that allow running
/// with zero configuration (e.g. `landlord-cli run --no-config`).
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    convert(RawConfig::default())
}

fn convert(mut raw: RawConfig) -> Result<AppConfig, ConfigError> {
    apply_env_overrides(&mut raw);

    let api_bind_addr = raw.api.bind_addr.unwrap_or_else(|| "0.0.0.0:8080".to_string());
    api_bind_addr
        .parse::<std::net::SocketAddr>()
        .map_err(|e| ConfigError::Conversion {
            message: format!("invalid api.bind_addr {api_bind_addr:?}: {e}"),
        })?;

    let backend = raw.store.backend.unwrap_or_else(|| "memory".to_string());
    let store = match backend.as_str() {
        "memory" => StoreBackend::Memory,
        "postgres" => {
            let dsn = raw.store.dsn.ok_or_else(|| ConfigError::Conversion {
                message: "store.backend = \"postgres\" requires store.dsn".to_string(),
            })?;
            StoreBackend::Postgres { dsn }
        }
        other => {
            return Err(ConfigError::Conversion {
                message: format!("unknown store.backend {other:?}, expected \"memory\" or \"postgres\""),
            })
        }
    };

    if raw.controller.worker_count == 0 {
        return Err(ConfigError::Conversion {
            message: "controller.worker_count must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        controller: raw.controller,
        api_bind_addr,
        store,
        workflow_provider: raw.workflow_provider.unwrap_or_else(|| "inmemory".to_string()),
        compute_provider: raw.compute_provider.unwrap_or_else(|| "mock".to_string()),
    })
}

fn apply_env_overrides(raw: &mut RawConfig) {
    if let Ok(v) = std::env::var("LANDLORD_API_BIND_ADDR") {
        raw.api.bind_addr = Some(v);
    }
    if let Ok(v) = std::env::var("LANDLORD_STORE_BACKEND") {
        raw.store.backend = Some(v);
    }
    if let Ok(v) = std::env::var("LANDLORD_STORE_DSN") {
        raw.store.dsn = Some(v);
    }
    if let Ok(v) = std::env::var("LANDLORD_WORKFLOW_PROVIDER") {
        raw.workflow_provider = Some(v);
    }
    if let Ok(v) = std::env::var("LANDLORD_COMPUTE_PROVIDER") {
        raw.compute_provider = Some(v);
    }
    if let Ok(v) = std::env::var("LANDLORD_WORKER_COUNT") {
        if let Ok(n) = v.parse() {
            raw.controller.worker_count = n;
        }
    }
    if let Ok(v) = std::env::var("LANDLORD_MAX_RETRIES") {
        if let Ok(n) = v.parse() {
            raw.controller.max_retries = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn empty_file_loads_all_defaults() {
        let f = write_temp("");
        let cfg = load(f.path()).unwrap();
        assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
        assert!(matches!(cfg.store, StoreBackend::Memory));
        assert_eq!(cfg.controller.worker_count, 3);
    }

    #[test]
    fn parses_controller_section() {
        let f = write_temp(
            "[controller]\nworker_count = 8\nmax_retries = 10\nreconciliation_interval = \"30s\"\n",
        );
        let cfg = load(f.path()).unwrap();
        assert_eq!(cfg.controller.worker_count, 8);
        assert_eq!(cfg.controller.max_retries, 10);
        assert_eq!(cfg.controller.reconciliation_interval, std::time::Duration::from_secs(30));
    }

    #[test]
    fn postgres_backend_requires_dsn() {
        let f = write_temp("[store]\nbackend = \"postgres\"\n");
        let err = load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Conversion { .. }));
    }

    #[test]
    fn postgres_backend_with_dsn_succeeds() {
        let f = write_temp("[store]\nbackend = \"postgres\"\ndsn = \"postgres://localhost/landlord\"\n");
        let cfg = load(f.path()).unwrap();
        match cfg.store {
            StoreBackend::Postgres { dsn } => assert_eq!(dsn, "postgres://localhost/landlord"),
            StoreBackend::Memory => panic!("expected postgres backend"),
        }
    }

    #[test]
    fn rejects_unknown_backend() {
        let f = write_temp("[store]\nbackend = \"sqlite\"\n");
        assert!(load(f.path()).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load(Path::new("/nonexistent/landlord.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
