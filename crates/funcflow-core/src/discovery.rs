//! ルート探索
//!
//! メタデータソースから型とメソッドの宣言を読み込み、HTTP メソッドの
//! アノテーションを持つメソッドを [`RouteModel`] に変換します。
//!
//! メタデータソースは抽象化されており、パッケージ内のコンパイル済み型を
//! アノテーション付きで列挙できれば何でもよい。同梱の
//! [`ManifestSource`] はビルドが出力する JSON/YAML マニフェストを読み込みます。

use crate::error::{CoreError, Result};
use crate::model::{DiscoveryContext, HttpVerb, Packaging, RouteModel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// パスセグメントを持つアノテーション（型またはメソッド単位）
pub const PATH_ANNOTATION: &str = "Path";

/// アーティファクト全体のアプリケーションルートを宣言するアノテーション
pub const APPLICATION_PATH_ANNOTATION: &str = "ApplicationPath";

/// コンパイル済み型メタデータの提供元
pub trait MetadataSource: Send + Sync {
    /// ログとエラーに使う人間向けの出所
    fn origin(&self) -> String;

    /// `package_prefix` 配下で宣言された全ての型（空なら全型）
    fn scan(&self, package_prefix: &str) -> Result<Vec<TypeDecl>>;
}

/// ビルドが書き出すマニフェスト: プロジェクト情報とコンパイル済み型
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataManifest {
    #[serde(default)]
    pub project: ProjectInfo,

    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

/// 共通設定の生成に必要なプロジェクト情報
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// ハンドラを探すパッケージプレフィックス
    #[serde(default)]
    pub package: String,

    /// ビルド成果物のベース名（`<final_name>.jar`）
    #[serde(default)]
    pub final_name: Option<String>,

    #[serde(default)]
    pub runtime_version: Option<String>,

    #[serde(default)]
    pub packaging: Packaging,

    #[serde(default)]
    pub main_class: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// 完全修飾名
    pub name: String,

    #[serde(default)]
    pub annotations: Vec<Annotation>,

    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,

    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// 単純名（`GET`）または完全修飾名（`javax.ws.rs.GET`）のアノテーション名
    pub name: String,

    #[serde(default)]
    pub value: Option<String>,
}

impl Annotation {
    pub fn new(name: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value: value.map(str::to_string),
        }
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

fn find_annotation<'a>(annotations: &'a [Annotation], simple_name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.simple_name() == simple_name)
}

fn has_annotation(annotations: &[Annotation], simple_name: &str) -> bool {
    find_annotation(annotations, simple_name).is_some()
}

fn annotation_value(annotations: &[Annotation], simple_name: &str) -> Option<String> {
    find_annotation(annotations, simple_name).map(|a| a.value.clone().unwrap_or_default())
}

impl TypeDecl {
    pub fn in_package(&self, package_prefix: &str) -> bool {
        if package_prefix.is_empty() {
            return true;
        }
        match self.name.strip_prefix(package_prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('.') || package_prefix.ends_with('.'),
            None => false,
        }
    }

    pub fn application_path(&self) -> Option<String> {
        annotation_value(&self.annotations, APPLICATION_PATH_ANNOTATION)
    }

    pub fn path(&self) -> Option<String> {
        annotation_value(&self.annotations, PATH_ANNOTATION)
    }
}

impl MethodDecl {
    /// このメソッドが持つ [`HttpVerb::ALL`] 順で最初のメソッド
    pub fn verb(&self) -> Option<HttpVerb> {
        HttpVerb::ALL
            .into_iter()
            .find(|verb| has_annotation(&self.annotations, verb.as_str()))
    }

    pub fn path(&self) -> Option<String> {
        annotation_value(&self.annotations, PATH_ANNOTATION)
    }
}

/// ディスク上のメタデータマニフェスト（`.json`・`.yaml`・`.yml`）
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
    manifest: MetadataManifest,
}

impl ManifestSource {
    /// マニフェストを読み込んでパースする。失敗はすべて探索エラー
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content =
            std::fs::read_to_string(&path).map_err(|e| CoreError::MetadataUnreadable {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let manifest: MetadataManifest = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| CoreError::MetadataUnreadable {
                path: path.clone(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&content).map_err(|e| CoreError::MetadataUnreadable {
                path: path.clone(),
                message: e.to_string(),
            })?
        };

        debug!(
            manifest = %path.display(),
            types = manifest.types.len(),
            "Loaded metadata manifest"
        );
        Ok(Self { path, manifest })
    }

    pub fn from_manifest(path: impl Into<PathBuf>, manifest: MetadataManifest) -> Self {
        Self {
            path: path.into(),
            manifest,
        }
    }

    pub fn project(&self) -> &ProjectInfo {
        &self.manifest.project
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetadataSource for ManifestSource {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn scan(&self, package_prefix: &str) -> Result<Vec<TypeDecl>> {
        Ok(self
            .manifest
            .types
            .iter()
            .filter(|t| t.in_package(package_prefix))
            .cloned()
            .collect())
    }
}

/// `package_prefix` 配下で宣言された全ルートを探索
///
/// 結果はルートの表示文字列でソートし、重複を除く。
/// 複数の型がアプリケーションルートを宣言している場合は、走査順で
/// 最初のものを採用する
#[tracing::instrument(skip(source), fields(origin = %source.origin()))]
pub fn discover_routes(source: &dyn MetadataSource, package_prefix: &str) -> Result<Vec<RouteModel>> {
    let types = source.scan(package_prefix)?;

    let roots: Vec<(&str, String)> = types
        .iter()
        .filter_map(|t| t.application_path().map(|p| (t.name.as_str(), p)))
        .collect();
    if roots.len() > 1 {
        warn!(
            chosen = %roots[0].0,
            ignored = roots.len() - 1,
            "Multiple application roots declared; using the first one"
        );
    }
    let base = roots.into_iter().next().map(|(_, p)| p).unwrap_or_default();
    let context = Arc::new(DiscoveryContext::new(base));

    let mut routes = Vec::new();
    for verb in HttpVerb::ALL {
        for ty in &types {
            let class_prefix = ty.path().unwrap_or_default();
            for method in ty.methods.iter().filter(|m| m.verb() == Some(verb)) {
                routes.push(RouteModel::new(
                    context.clone(),
                    ty.name.as_str(),
                    method.name.as_str(),
                    verb,
                    class_prefix.as_str(),
                    method.path().unwrap_or_default(),
                ));
            }
        }
    }

    routes.sort_by_cached_key(|r| r.to_string());
    routes.dedup();

    check_folder_collisions(&routes)?;

    info!(count = routes.len(), base = %context.base_app_prefix(), "Discovered routes");
    for route in &routes {
        debug!(route = %route, "Route");
    }
    Ok(routes)
}

fn check_folder_collisions(routes: &[RouteModel]) -> Result<()> {
    let mut seen: HashMap<String, &RouteModel> = HashMap::with_capacity(routes.len());
    for route in routes {
        if let Some(previous) = seen.insert(route.folder_name(), route) {
            return Err(CoreError::FolderCollision {
                folder: route.folder_name(),
                first: previous.to_string(),
                second: route.to_string(),
            });
        }
    }
    Ok(())
}
