//! Deploy transport error types

use crate::strategy::StrategyKind;
use std::fmt;
use thiserror::Error;

/// Machine-readable part of an upload failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    /// Exit code of the external tool
    Exit(i32),
    /// HTTP status returned by the upload endpoint
    Status(u16),
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCode::Exit(code) => write!(f, "exit code {code}"),
            FailureCode::Status(status) => write!(f, "HTTP {status}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("{strategy} upload failed: {reason}")]
    UploadFailed {
        strategy: StrategyKind,
        reason: String,
        code: Option<FailureCode>,
    },

    #[error("{strategy} upload needs {field}")]
    MissingInput {
        strategy: StrategyKind,
        field: &'static str,
    },

    #[error("Liveness probe failed: {0}")]
    ProbeFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CloudError {
    pub fn upload(
        strategy: StrategyKind,
        reason: impl Into<String>,
        code: Option<FailureCode>,
    ) -> Self {
        CloudError::UploadFailed {
            strategy,
            reason: reason.into(),
            code,
        }
    }

    /// Strategy the failure belongs to, if any
    pub fn strategy(&self) -> Option<StrategyKind> {
        match self {
            CloudError::UploadFailed { strategy, .. } | CloudError::MissingInput { strategy, .. } => {
                Some(*strategy)
            }
            _ => None,
        }
    }

    pub fn code(&self) -> Option<FailureCode> {
        match self {
            CloudError::UploadFailed { code, .. } => *code,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
