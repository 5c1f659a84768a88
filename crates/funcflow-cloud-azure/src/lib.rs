//! Azure Functions transports
//!
//! - [`AzCli`]: `az functionapp deployment source config-zip`
//! - [`ZipDeploy`]: authenticated POST to the Kudu `zipdeploy` endpoint
//! - [`HttpProbe`]: unauthenticated GET against the app root
//!
//! [`CliStrategy`] and [`ZipDeployStrategy`] adapt the first two to
//! [`funcflow_cloud::DeployStrategy`].

pub mod az;
pub mod error;
pub mod probe;
pub mod strategy;
pub mod zipdeploy;

pub use az::AzCli;
pub use error::{AzureError, Result};
pub use probe::HttpProbe;
pub use strategy::{CliStrategy, ZipDeployStrategy};
pub use zipdeploy::ZipDeploy;
