//! Post-deploy liveness probe

use crate::error::Result;
use async_trait::async_trait;

/// Response of one probe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeStatus {
    pub url: String,
    pub status: u16,
}

impl ProbeStatus {
    /// 2xx and 3xx count as alive
    pub fn is_healthy(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Single unauthenticated request against a deployed app
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// URL that will be probed for `app_name`
    fn endpoint(&self, app_name: &str) -> String;

    /// Issue the request; only transport failures are errors
    async fn probe(&self, app_name: &str) -> Result<ProbeStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ProbeStatus {
        ProbeStatus {
            url: "https://orders.example/".into(),
            status: code,
        }
    }

    #[test]
    fn test_is_healthy() {
        assert!(status(200).is_healthy());
        assert!(status(302).is_healthy());
        assert!(!status(404).is_healthy());
        assert!(!status(500).is_healthy());
        assert!(!status(199).is_healthy());
    }
}
