//! コンパイル済みアプリケーションを生成した設定の隣にコピー

use crate::archive::broaden_permissions;
use crate::error::{BuildError, Result};
use funcflow_core::Packaging;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// jar 用 host 記述子が起動するファイル名
pub const HANDLER_JAR: &str = "handler.jar";
pub const CLASSES_DIR: &str = "classes";
pub const DEPENDENCY_DIR: &str = "dependency";
/// jar ランチャーが実行時にネストした jar を展開する作業ディレクトリ
pub const CLASS_LOADER_DIR: [&str; 2] = ["tmp", "EeClassLoader"];

/// 1回の配置処理の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedArtifacts {
    /// 設定ディレクトリ内に書き出したパス
    pub staged: Vec<PathBuf>,
    /// 存在しなかったビルド成果物
    pub missing: Vec<PathBuf>,
    /// 全ユーザー書き込み可の展開ディレクトリ（jar のみ）
    pub class_loader_dir: Option<PathBuf>,
}

impl StagedArtifacts {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

pub struct ArtifactStager {
    build_dir: PathBuf,
    final_name: Option<String>,
    packaging: Packaging,
}

impl ArtifactStager {
    pub fn new(build_dir: impl Into<PathBuf>, packaging: Packaging) -> Self {
        Self {
            build_dir: build_dir.into(),
            final_name: None,
            packaging,
        }
    }

    /// ビルドした jar のベース名（`<final_name>.jar`）
    pub fn with_final_name(mut self, final_name: Option<String>) -> Self {
        self.final_name = final_name;
        self
    }

    /// ビルド成果物を `config_dir` にコピー
    ///
    /// 存在しない成果物は記録してログに出すが、エラーにはしない
    pub fn stage(&self, config_dir: &Path) -> Result<StagedArtifacts> {
        let mut result = StagedArtifacts::default();
        match self.packaging {
            Packaging::Jar => {
                result.class_loader_dir = Some(prepare_class_loader_dir(config_dir)?);
                self.stage_jar(config_dir, &mut result)?;
            }
            Packaging::Exploded => {
                for dir in [CLASSES_DIR, DEPENDENCY_DIR] {
                    self.stage_dir(dir, config_dir, &mut result)?;
                }
            }
        }

        for path in &result.missing {
            warn!(artifact = %path.display(), "Build output not found, not staged");
        }
        info!(
            staged = result.staged.len(),
            missing = result.missing.len(),
            "Artifacts staged"
        );
        Ok(result)
    }

    fn stage_jar(&self, config_dir: &Path, result: &mut StagedArtifacts) -> Result<()> {
        let Some(final_name) = &self.final_name else {
            result.missing.push(self.build_dir.join("<final_name>.jar"));
            return Ok(());
        };
        let source = self.build_dir.join(format!("{final_name}.jar"));
        if !source.is_file() {
            result.missing.push(source);
            return Ok(());
        }

        let target = config_dir.join(HANDLER_JAR);
        std::fs::copy(&source, &target).map_err(|e| BuildError::io(&source, e))?;
        debug!(from = %source.display(), to = %target.display(), "Jar staged");
        result.staged.push(target);
        Ok(())
    }

    fn stage_dir(&self, name: &str, config_dir: &Path, result: &mut StagedArtifacts) -> Result<()> {
        let source = self.build_dir.join(name);
        if !source.is_dir() {
            result.missing.push(source);
            return Ok(());
        }

        let target = config_dir.join(name);
        copy_tree(&source, &target)?;
        debug!(from = %source.display(), to = %target.display(), "Directory staged");
        result.staged.push(target);
        Ok(())
    }
}

/// `tmp/EeClassLoader` を作成し、以前の実行で残った jar を削除
fn prepare_class_loader_dir(config_dir: &Path) -> Result<PathBuf> {
    let dir = CLASS_LOADER_DIR
        .iter()
        .fold(config_dir.to_path_buf(), |path, part| path.join(part));
    std::fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;

    let entries = std::fs::read_dir(&dir).map_err(|e| BuildError::io(&dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| BuildError::io(&dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "jar") {
            std::fs::remove_file(&path).map_err(|e| BuildError::io(&path, e))?;
            debug!(jar = %path.display(), "Stale jar removed");
        }
    }

    broaden_permissions(&dir)?;
    Ok(dir)
}

fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| BuildError::Walk {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let dest = target.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).map_err(|e| BuildError::io(&dest, e))?;
        } else {
            std::fs::copy(entry.path(), &dest).map_err(|e| BuildError::io(entry.path(), e))?;
        }
    }
    Ok(())
}
