//! Azure transport error types

use funcflow_cloud::FailureCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("{0} not found. Please install the Azure CLI: https://aka.ms/azure-cli")]
    ToolNotFound(String),

    #[error("{program} exited with {}", describe_exit(.code))]
    CommandFailed { program: String, code: Option<i32> },

    #[error("Archive not found: {0}")]
    ArchiveNotFound(PathBuf),

    #[error("zipdeploy rejected the upload (HTTP {status}): {message}")]
    UploadRejected { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AzureError {
    pub fn failure_code(&self) -> Option<FailureCode> {
        match self {
            AzureError::CommandFailed { code, .. } => code.map(FailureCode::Exit),
            AzureError::UploadRejected { status, .. } => Some(FailureCode::Status(*status)),
            AzureError::Http(e) => e.status().map(|s| FailureCode::Status(s.as_u16())),
            _ => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, AzureError>;
