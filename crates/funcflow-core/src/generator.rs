//! 設定ディレクトリの生成
//!
//! ルートごとの `function.json` と、共通の host・settings ファイルを
//! 書き出します。ルートは互いに独立しているため並列に生成・書き込みし、
//! 各ルートは専用のフォルダを持ちます。

use crate::error::{CoreError, Result};
use crate::model::{RouteModel, RuntimeContext};
use crate::template::{ConfigRenderer, TemplateKind};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 1回の生成で書き出したファイル
#[derive(Debug, Clone, Default)]
pub struct GeneratedConfig {
    pub config_dir: PathBuf,
    pub function_files: Vec<PathBuf>,
    pub host_file: PathBuf,
    pub local_settings_file: PathBuf,
    pub dockerfile: Option<PathBuf>,
}

pub struct ConfigGenerator<'a> {
    renderer: &'a ConfigRenderer,
    runtime: &'a RuntimeContext,
    dockerfile: bool,
}

impl<'a> ConfigGenerator<'a> {
    pub fn new(renderer: &'a ConfigRenderer, runtime: &'a RuntimeContext) -> Self {
        Self {
            renderer,
            runtime,
            dockerfile: false,
        }
    }

    pub fn with_dockerfile(mut self, enabled: bool) -> Self {
        self.dockerfile = enabled;
        self
    }

    /// 全ファイルを `config_dir` に生成（既存の内容は上書き）
    ///
    /// 最初の失敗で中断する。書き出し済みのファイルは残るので、
    /// そのディレクトリは使用不可として扱うこと
    #[tracing::instrument(skip_all, fields(config_dir = %config_dir.display(), routes = routes.len()))]
    pub fn generate(&self, routes: &[RouteModel], config_dir: &Path) -> Result<GeneratedConfig> {
        std::fs::create_dir_all(config_dir).map_err(|e| CoreError::io(config_dir, e))?;
        info!("Writing function configuration");

        let function_files = routes
            .par_iter()
            .map(|route| self.write_function(route, config_dir))
            .collect::<Result<Vec<_>>>()?;

        let host = self.renderer.render_host(self.runtime)?;
        let host_file = write_file(config_dir, TemplateKind::HostJar.output_name(), &host)?;

        let settings = self.renderer.render_local_settings(self.runtime)?;
        let local_settings_file =
            write_file(config_dir, TemplateKind::LocalSettings.output_name(), &settings)?;

        let dockerfile = if self.dockerfile {
            let content = self.renderer.render_dockerfile(self.runtime)?;
            Some(write_file(
                config_dir,
                TemplateKind::Dockerfile.output_name(),
                &content,
            )?)
        } else {
            None
        };

        info!(
            functions = function_files.len(),
            dockerfile = dockerfile.is_some(),
            "Configuration written"
        );

        Ok(GeneratedConfig {
            config_dir: config_dir.to_path_buf(),
            function_files,
            host_file,
            local_settings_file,
            dockerfile,
        })
    }

    fn write_function(&self, route: &RouteModel, config_dir: &Path) -> Result<PathBuf> {
        let folder = config_dir.join(route.folder_name());
        std::fs::create_dir_all(&folder).map_err(|e| CoreError::io(&folder, e))?;

        let rendered = self.renderer.render_route(route)?;
        let path = write_file(&folder, TemplateKind::Function.output_name(), &rendered)?;
        debug!(route = %route, file = %path.display(), "Function written");
        Ok(path)
    }
}

fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, content).map_err(|e| CoreError::io(&path, e))?;
    Ok(path)
}
