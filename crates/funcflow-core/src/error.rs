use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Metadata source unreadable: {path}\nreason: {message}")]
    MetadataUnreadable { path: PathBuf, message: String },

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Function folder collision: '{folder}' is produced by both {first} and {second}")]
    FolderCollision {
        folder: String,
        first: String,
        second: String,
    },

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template error: {name}\nreason: {message}")]
    TemplateError { name: String, message: String },

    #[error("IO error: {path}\nreason: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

impl CoreError {
    /// ルートメタデータの読み込み・解釈中に発生したエラーなら true
    pub fn is_discovery(&self) -> bool {
        matches!(
            self,
            CoreError::MetadataUnreadable { .. }
                | CoreError::InvalidMetadata(_)
                | CoreError::FolderCollision { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        CoreError::IoError {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
