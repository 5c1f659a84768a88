pub mod deploy;
pub mod generate;
pub mod routes;

use colored::Colorize;
use funcflow_config::DeployConfig;
use std::path::{Path, PathBuf};

/// 全コマンド共通のディレクトリ
pub struct Workspace {
    pub project_dir: PathBuf,
    pub target_dir: PathBuf,
    pub config_file: Option<PathBuf>,
}

impl Workspace {
    pub fn new(project_dir: PathBuf, target_dir: Option<PathBuf>, config_file: Option<PathBuf>) -> Self {
        let target_dir = target_dir.unwrap_or_else(|| project_dir.join("target"));
        Self {
            project_dir,
            target_dir,
            config_file,
        }
    }

    pub fn load_config(&self) -> anyhow::Result<DeployConfig> {
        Ok(funcflow::load_config(
            self.config_file.as_deref(),
            &self.project_dir,
        )?)
    }

    /// `explicit`、なければ出力ディレクトリで最初のマニフェスト
    pub fn manifest(&self, explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        funcflow::find_manifest(&self.target_dir).ok_or_else(|| {
            anyhow::anyhow!(
                "No metadata manifest found in {}\nPass --manifest <file> or build the project first.",
                self.target_dir.display()
            )
        })
    }
}

pub fn print_header(title: &str) {
    println!("{}", title.blue().bold());
}
