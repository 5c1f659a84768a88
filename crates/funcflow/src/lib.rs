//! funcflow
//!
//! コンパイル済みアプリケーションのアノテーション付きハンドラから
//! 関数アプリの設定を生成し、デプロイします:
//!
//! ```text
//! manifest ─▶ discovery ─▶ render ─▶ package ─▶ upload (CLI │ HTTP) ─▶ probe
//! ```

pub mod driver;
pub mod error;
pub mod generate;

pub use driver::{
    DEFAULT_PROBE_DELAY, DeployReport, DeployState, DeploymentContext, DeploymentDriver,
};
pub use error::{DeployError, Result};
pub use generate::{
    GenerateOptions, GenerateOutcome, find_manifest, generate, load_routes, resolve_runtime,
    resolve_runtime_version,
};

use funcflow_config::DeployConfig;
use std::path::Path;

/// 設定ファイルと環境変数を [`DeployConfig`] に読み込む
pub fn load_config(config_file: Option<&Path>, project_dir: &Path) -> Result<DeployConfig> {
    DeployConfig::load(config_file, project_dir)
        .map_err(|e| DeployError::config("load configuration", e))
}
