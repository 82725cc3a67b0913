pub mod driver;
pub mod error;
pub mod mock;
pub mod registry;

pub use driver::{ComputeProvider, ComputeSpec, ComputeStatus, ProvisionResult};
pub use error::ComputeError;
pub use mock::MockComputeProvider;
pub use registry::ComputeRegistry;
