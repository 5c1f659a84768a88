use async_trait::async_trait;
use funcflow_cloud::{CloudError, LivenessProbe, ProbeStatus};
use std::time::Duration;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// GET against `https://{app}.azurewebsites.net/`
pub struct HttpProbe {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }
}

#[async_trait]
impl LivenessProbe for HttpProbe {
    fn endpoint(&self, app_name: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{base}/"),
            None => format!("https://{app_name}.azurewebsites.net/"),
        }
    }

    async fn probe(&self, app_name: &str) -> funcflow_cloud::Result<ProbeStatus> {
        let url = self.endpoint(app_name);
        debug!(url = %url, "Probing");

        let response = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| CloudError::ProbeFailed(e.to_string()))?;

        Ok(ProbeStatus {
            url,
            status: response.status().as_u16(),
        })
    }
}
