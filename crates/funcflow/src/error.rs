//! デプロイエラーの分類
//!
//! パイプラインの失敗種別ごとに1つのバリアントを持ちます。各バリアントは
//! 失敗した操作名と、元の原因を source として保持します。
//! 動作確認の問題はエラーではなく、レポートの警告になります。

use funcflow_build::BuildError;
use funcflow_cloud::CloudError;
use funcflow_config::ConfigError;
use funcflow_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Configuration error ({operation}): {source}")]
    Configuration {
        operation: &'static str,
        #[source]
        source: ConfigError,
    },

    #[error("Route discovery failed ({operation}): {source}")]
    Discovery {
        operation: &'static str,
        #[source]
        source: CoreError,
    },

    #[error("Rendering failed ({operation}): {source}")]
    Render {
        operation: &'static str,
        #[source]
        source: CoreError,
    },

    #[error("Packaging failed ({operation}): {source}")]
    Packaging {
        operation: &'static str,
        #[source]
        source: BuildError,
    },

    #[error("Upload failed ({operation}): {source}")]
    Upload {
        operation: &'static str,
        #[source]
        source: CloudError,
    },

    #[error("Cleanup failed ({operation}) for {}: {source}", .path.display())]
    Cleanup {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    pub fn operation(&self) -> &'static str {
        match self {
            DeployError::Configuration { operation, .. }
            | DeployError::Discovery { operation, .. }
            | DeployError::Render { operation, .. }
            | DeployError::Packaging { operation, .. }
            | DeployError::Upload { operation, .. }
            | DeployError::Cleanup { operation, .. } => operation,
        }
    }

    /// コアのエラー種別に応じて探索エラーか生成エラーにする
    pub(crate) fn core(operation: &'static str, source: CoreError) -> Self {
        if source.is_discovery() {
            DeployError::Discovery { operation, source }
        } else {
            DeployError::Render { operation, source }
        }
    }

    pub(crate) fn config(operation: &'static str, source: ConfigError) -> Self {
        DeployError::Configuration { operation, source }
    }

    pub(crate) fn packaging(operation: &'static str, source: BuildError) -> Self {
        DeployError::Packaging { operation, source }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
