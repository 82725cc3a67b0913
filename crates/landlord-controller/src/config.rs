use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Controller configuration options. `landlord-config` loads
/// this from TOML + environment overlay; callers embedding the controller
/// directly can also build one by hand with `ControllerConfig::default()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Master switch. `Controller::run` returns immediately when `false`.
    pub enabled: bool,

    /// Lister poll period.
    #[serde(with = "humantime_serde")]
    pub reconciliation_interval: Duration,

    /// Size of the worker pool dequeuing and reconciling tenants.
    pub worker_count: usize,

    /// Per-item retry ceiling before a terminal-failure transition.
    pub max_retries: u32,

    /// Workqueue exponential-backoff base delay.
    #[serde(with = "humantime_serde")]
    pub rate_limit_base: Duration,

    /// Workqueue exponential-backoff cap.
    #[serde(with = "humantime_serde")]
    pub rate_limit_max: Duration,

    /// Per-call timeout for workflow trigger/poll/stop calls.
    #[serde(with = "humantime_serde")]
    pub workflow_trigger_timeout: Duration,

    /// Bound on how long shutdown waits for in-flight workers to drain.
    #[serde(with = "humantime_serde")]
    pub shutdown_grace_period: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            enabled: true,
            reconciliation_interval: Duration::from_secs(10),
            worker_count: 3,
            max_retries: 5,
            rate_limit_base: Duration::from_secs(1),
            rate_limit_max: Duration::from_secs(300),
            workflow_trigger_timeout: Duration::from_secs(30),
            shutdown_grace_period: Duration::from_secs(30),
        }
    }
}
