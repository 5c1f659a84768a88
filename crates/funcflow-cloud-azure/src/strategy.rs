//! `DeployStrategy` implementations

use crate::az::AzCli;
use crate::error::AzureError;
use crate::zipdeploy::ZipDeploy;
use async_trait::async_trait;
use funcflow_cloud::{CloudError, DeployStrategy, StrategyKind, UploadReceipt, UploadRequest};

fn upload_error(strategy: StrategyKind, error: AzureError) -> CloudError {
    CloudError::upload(strategy, error.to_string(), error.failure_code())
}

/// Deploys through the az CLI; needs a resource group
pub struct CliStrategy {
    az: AzCli,
}

impl CliStrategy {
    pub fn new(az: AzCli) -> Self {
        Self { az }
    }
}

#[async_trait]
impl DeployStrategy for CliStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Cli
    }

    fn name(&self) -> &str {
        self.az.program()
    }

    async fn upload(&self, request: &UploadRequest) -> funcflow_cloud::Result<UploadReceipt> {
        let resource_group = request.require_resource_group(self.kind())?;
        self.az
            .deploy_zip(resource_group, &request.app_name, &request.archive_path)
            .await
            .map_err(|e| upload_error(self.kind(), e))?;

        Ok(UploadReceipt {
            strategy: self.kind(),
            detail: format!("{} config-zip to {}/{}", self.az.program(), resource_group, request.app_name),
        })
    }
}

/// Deploys through the zipdeploy endpoint; needs credentials
pub struct ZipDeployStrategy {
    client: ZipDeploy,
}

impl ZipDeployStrategy {
    pub fn new(client: ZipDeploy) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeployStrategy for ZipDeployStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Http
    }

    fn name(&self) -> &str {
        "zipdeploy"
    }

    async fn upload(&self, request: &UploadRequest) -> funcflow_cloud::Result<UploadReceipt> {
        let credentials = request.require_credentials(self.kind())?;
        self.client
            .upload(&request.archive_path, &request.app_name, credentials)
            .await
            .map_err(|e| upload_error(self.kind(), e))?;

        Ok(UploadReceipt {
            strategy: self.kind(),
            detail: self.client.endpoint(&request.app_name),
        })
    }
}
