pub mod config;
pub mod controller;
pub mod error;
pub mod reconcile;
pub mod workqueue;

pub use config::ControllerConfig;
pub use controller::Controller;
pub use error::ControllerError;
pub use reconcile::{reconcile_tenant, ReconcileContext};
pub use workqueue::WorkQueue;
