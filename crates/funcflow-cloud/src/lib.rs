//! funcflow deploy transports
//!
//! Provider-neutral contracts for shipping a packaged function app:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            funcflow (driver)             │
//! └──────────────────┬───────────────────────┘
//!                    │ UploadRequest
//! ┌──────────────────▼───────────────────────┐
//! │             funcflow-cloud               │
//! │  trait DeployStrategy { upload(..) }     │
//! │  trait LivenessProbe  { probe(..)  }     │
//! └───────┬──────────────────────┬───────────┘
//!         │                      │
//! ┌───────▼───────┐      ┌───────▼───────┐
//! │  CLI (az ...) │      │ HTTP zipdeploy│
//! └───────────────┘      └───────────────┘
//! ```

pub mod error;
pub mod probe;
pub mod strategy;

pub use error::{CloudError, FailureCode, Result};
pub use probe::{LivenessProbe, ProbeStatus};
pub use strategy::{Credentials, DeployStrategy, StrategyKind, UploadReceipt, UploadRequest};
