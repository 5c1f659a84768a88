//! ルート探索と設定生成
//!
//! `funcflow generate`・`funcflow routes`・`funcflow deploy --generate`
//! で共通して使います。

use crate::error::{DeployError, Result};
use funcflow_build::{ArtifactStager, StagedArtifacts};
use funcflow_config::DeployConfig;
use funcflow_core::{
    ConfigGenerator, ConfigRenderer, GeneratedConfig, ManifestSource, ProjectInfo, RouteModel,
    RuntimeContext, discover_routes,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// ビルド出力ディレクトリで探すマニフェストのファイル名
pub const MANIFEST_FILE_NAMES: [&str; 3] = [
    "funcflow-metadata.json",
    "funcflow-metadata.yaml",
    "funcflow-metadata.yml",
];

/// 設定にもマニフェストにも無い場合のランタイムバージョン
pub const DEFAULT_RUNTIME_VERSION: &str = "11";

/// `target_dir` で最初に見つかったマニフェスト
pub fn find_manifest(target_dir: &Path) -> Option<PathBuf> {
    MANIFEST_FILE_NAMES
        .iter()
        .map(|name| target_dir.join(name))
        .find(|path| path.is_file())
}

/// マニフェストを開いてルートを探索
pub fn load_routes(manifest: &Path) -> Result<(ManifestSource, Vec<RouteModel>)> {
    let source = ManifestSource::open(manifest).map_err(|e| DeployError::core("read manifest", e))?;
    let routes = discover_routes(&source, &source.project().package)
        .map_err(|e| DeployError::core("discover routes", e))?;
    Ok((source, routes))
}

/// テンプレート用のランタイム値。設定はマニフェストより優先
pub fn resolve_runtime(config: &DeployConfig, project: &ProjectInfo) -> RuntimeContext {
    let version = config
        .runtime_version
        .as_deref()
        .or(project.runtime_version.as_deref())
        .unwrap_or(DEFAULT_RUNTIME_VERSION);

    let runtime = RuntimeContext::new(config.target_os, version, project.packaging);
    match &project.main_class {
        Some(main_class) => runtime.with_main_class(main_class.clone()),
        None => runtime,
    }
}

/// 設定を再生成しないデプロイで固定するランタイムバージョン
///
/// [`generate`] と同じ順で解決する: 設定、マニフェスト、
/// [`DEFAULT_RUNTIME_VERSION`] の順。読めないマニフェストは探索エラー
pub fn resolve_runtime_version(config: &DeployConfig, manifest: Option<&Path>) -> Result<String> {
    if config.runtime_version.is_some() {
        return Ok(resolve_runtime(config, &ProjectInfo::default()).runtime_version);
    }
    let runtime = match manifest {
        Some(manifest) => {
            let source = ManifestSource::open(manifest)
                .map_err(|e| DeployError::core("read manifest", e))?;
            resolve_runtime(config, source.project())
        }
        None => resolve_runtime(config, &ProjectInfo::default()),
    };
    Ok(runtime.runtime_version)
}

/// 1回の生成のオプション
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub manifest: PathBuf,
    pub target_dir: PathBuf,
    pub templates: Option<PathBuf>,
    pub dockerfile: bool,
}

#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub routes: Vec<RouteModel>,
    pub runtime: RuntimeContext,
    pub generated: GeneratedConfig,
    pub staged: StagedArtifacts,
}

/// ルートを探索し、設定ツリーを生成してビルド成果物を配置
pub fn generate(config: &DeployConfig, options: &GenerateOptions) -> Result<GenerateOutcome> {
    let (source, routes) = load_routes(&options.manifest)?;
    let project = source.project();
    info!(routes = routes.len(), package = %project.package, "Routes discovered");

    let runtime = resolve_runtime(config, project);
    let renderer = match &options.templates {
        Some(dir) => ConfigRenderer::with_overrides(dir),
        None => ConfigRenderer::new(),
    }
    .map_err(|e| DeployError::core("load templates", e))?;

    let config_dir = config.config_dir(&options.target_dir);
    let generated = ConfigGenerator::new(&renderer, &runtime)
        .with_dockerfile(options.dockerfile)
        .generate(&routes, &config_dir)
        .map_err(|e| DeployError::core("render configuration", e))?;

    let staged = ArtifactStager::new(&options.target_dir, project.packaging)
        .with_final_name(project.final_name.clone())
        .stage(&config_dir)
        .map_err(|e| DeployError::packaging("stage artifacts", e))?;

    Ok(GenerateOutcome {
        routes,
        runtime,
        generated,
        staged,
    })
}
