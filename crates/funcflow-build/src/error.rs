use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("I/O error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to write archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },

    #[error("Invalid pattern: {0}")]
    Pattern(String),
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            message: error.to_string(),
        }
    }

    pub(crate) fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        BuildError::Archive {
            path: path.into(),
            source,
        }
    }

    /// よくある原因のヒント付きメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::SourceNotFound(path) => format!(
                "Configuration directory not found: {}\n\
                 \n\
                 Run `funcflow generate` first, or pass --generate to deploy.",
                path.display()
            ),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
