//! Kudu zipdeploy client
//!
//! Streams the archive as the body of an authenticated POST. Only HTTP 200
//! counts as success.

use crate::error::{AzureError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use funcflow_cloud::Credentials;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, StatusCode};
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// zipdeploy client
pub struct ZipDeploy {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl Default for ZipDeploy {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipDeploy {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
        }
    }

    /// Send every upload to `base_url` instead of the app's SCM host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn endpoint(&self, app_name: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{base}/api/zipdeploy"),
            None => format!("https://{app_name}.scm.azurewebsites.net/api/zipdeploy"),
        }
    }

    pub async fn upload(&self, archive: &Path, app_name: &str, credentials: &Credentials) -> Result<()> {
        let file = tokio::fs::File::open(archive).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AzureError::ArchiveNotFound(archive.to_path_buf()),
            _ => AzureError::IoError(e),
        })?;
        let length = file.metadata().await?.len();

        let url = self.endpoint(app_name);
        debug!(url = %url, bytes = length, "Uploading archive");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, basic_auth_header(credentials))
            .header(CONTENT_TYPE, "application/zip")
            .header(CONTENT_LENGTH, length)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;

        let status = response.status();
        // reading the body to the end releases the connection on both paths
        let message = response.text().await.unwrap_or_default();

        if status == StatusCode::OK {
            info!(app = %app_name, "zipdeploy accepted the archive");
            Ok(())
        } else {
            Err(AzureError::UploadRejected {
                status: status.as_u16(),
                message: if message.trim().is_empty() {
                    status.canonical_reason().unwrap_or("unknown").to_string()
                } else {
                    message.trim().to_string()
                },
            })
        }
    }
}

/// `Basic base64(user:password)`
pub fn basic_auth_header(credentials: &Credentials) -> String {
    let token = STANDARD.encode(format!("{}:{}", credentials.user(), credentials.password()));
    format!("Basic {token}")
}
