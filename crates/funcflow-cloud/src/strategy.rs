//! Deploy strategy trait definition

use crate::error::{CloudError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Transport used to ship the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// External command-line tool
    Cli,
    /// Authenticated HTTP upload
    Http,
}

impl StrategyKind {
    /// `Cli` when the CLI is preferred; HTTP is the universal fallback
    pub fn preferred(prefer_cli: bool) -> Self {
        if prefer_cli {
            StrategyKind::Cli
        } else {
            StrategyKind::Http
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Cli => f.write_str("CLI"),
            StrategyKind::Http => f.write_str("HTTP"),
        }
    }
}

/// Basic-auth credentials for the HTTP upload
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Everything a strategy may need for one upload
///
/// Each strategy checks the fields it needs when it runs, so a request built
/// for the CLI can still be handed to the HTTP fallback.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub archive_path: PathBuf,
    pub app_name: String,
    pub resource_group: Option<String>,
    pub credentials: Option<Credentials>,
}

impl UploadRequest {
    pub fn new(archive_path: impl Into<PathBuf>, app_name: impl Into<String>) -> Self {
        Self {
            archive_path: archive_path.into(),
            app_name: app_name.into(),
            resource_group: None,
            credentials: None,
        }
    }

    pub fn with_resource_group(mut self, resource_group: Option<String>) -> Self {
        self.resource_group = resource_group;
        self
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn require_resource_group(&self, strategy: StrategyKind) -> Result<&str> {
        self.resource_group
            .as_deref()
            .ok_or(CloudError::MissingInput {
                strategy,
                field: "a resource group",
            })
    }

    pub fn require_credentials(&self, strategy: StrategyKind) -> Result<&Credentials> {
        self.credentials.as_ref().ok_or(CloudError::MissingInput {
            strategy,
            field: "user credentials",
        })
    }
}

/// Successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub strategy: StrategyKind,
    pub detail: String,
}

/// Ships an archive to the hosting platform
///
/// Implementations report every failure as an error; retrying and falling
/// back to another strategy is the caller's decision.
#[async_trait]
pub trait DeployStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Human-readable name for logs (e.g. "az", "zipdeploy")
    fn name(&self) -> &str;

    async fn upload(&self, request: &UploadRequest) -> Result<UploadReceipt>;
}
