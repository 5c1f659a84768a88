//! 設定テンプレート
//!
//! Tera を使用して `function.json`・`host.json`・`local.settings.json` と
//! 任意の `Dockerfile` を生成します。組み込みテンプレートはバイナリに埋め込まれ、
//! テンプレートディレクトリの同名ファイルで置き換えられます。

use crate::error::{CoreError, Result};
use crate::model::{RouteModel, RuntimeContext};
use std::error::Error as StdError;
use std::path::Path;
use tera::{Context, Tera};
use tracing::debug;

const FUNCTION_TEMPLATE: &str = include_str!("../templates/function.json");
const HOST_JAR_TEMPLATE: &str = include_str!("../templates/host_jar.json");
const HOST_EXPLODED_TEMPLATE: &str = include_str!("../templates/host_exploded.json");
const LOCAL_SETTINGS_TEMPLATE: &str = include_str!("../templates/local.settings.json");
const DOCKERFILE_TEMPLATE: &str = include_str!("../templates/Dockerfile");

/// 論理テンプレート名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Function,
    HostJar,
    HostExploded,
    LocalSettings,
    Dockerfile,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 5] = [
        TemplateKind::Function,
        TemplateKind::HostJar,
        TemplateKind::HostExploded,
        TemplateKind::LocalSettings,
        TemplateKind::Dockerfile,
    ];

    /// テンプレートファイル名（上書き用ファイル名も同じ）
    pub fn template_name(&self) -> &'static str {
        match self {
            TemplateKind::Function => "function.json",
            TemplateKind::HostJar => "host_jar.json",
            TemplateKind::HostExploded => "host_exploded.json",
            TemplateKind::LocalSettings => "local.settings.json",
            TemplateKind::Dockerfile => "Dockerfile",
        }
    }

    /// 設定ディレクトリに書き出すファイル名
    pub fn output_name(&self) -> &'static str {
        match self {
            TemplateKind::Function => "function.json",
            TemplateKind::HostJar | TemplateKind::HostExploded => "host.json",
            TemplateKind::LocalSettings => "local.settings.json",
            TemplateKind::Dockerfile => "Dockerfile",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            TemplateKind::Function => FUNCTION_TEMPLATE,
            TemplateKind::HostJar => HOST_JAR_TEMPLATE,
            TemplateKind::HostExploded => HOST_EXPLODED_TEMPLATE,
            TemplateKind::LocalSettings => LOCAL_SETTINGS_TEMPLATE,
            TemplateKind::Dockerfile => DOCKERFILE_TEMPLATE,
        }
    }
}

/// テンプレートレンダラー
///
/// レンダリングは `&self` で行うため、1つのレンダラーを複数スレッドで共有できる
pub struct ConfigRenderer {
    tera: Tera,
}

impl ConfigRenderer {
    /// 組み込みテンプレートを使うレンダラー
    pub fn new() -> Result<Self> {
        let mut renderer = Self::empty();
        for kind in TemplateKind::ALL {
            renderer.register(kind, kind.builtin())?;
        }
        Ok(renderer)
    }

    /// テンプレート未登録のレンダラー
    pub fn empty() -> Self {
        Self {
            tera: Tera::default(),
        }
    }

    /// 組み込みテンプレートを `dir` 内の同名ファイルで置き換える
    pub fn with_overrides(dir: &Path) -> Result<Self> {
        let mut renderer = Self::new()?;
        renderer.load_dir(dir)?;
        Ok(renderer)
    }

    /// `dir` にあるテンプレートのみ。無いものはレンダリング時にエラー
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut renderer = Self::empty();
        renderer.load_dir(dir)?;
        Ok(renderer)
    }

    fn load_dir(&mut self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Err(CoreError::TemplateNotFound(format!(
                "template directory {}",
                dir.display()
            )));
        }

        for kind in TemplateKind::ALL {
            let path = dir.join(kind.template_name());
            if path.is_file() {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| CoreError::io(&path, e))?;
                debug!(template = %path.display(), "Using template override");
                self.register(kind, &content)?;
            }
        }
        Ok(())
    }

    /// `kind` のテンプレートを登録（または置き換え）
    pub fn register(&mut self, kind: TemplateKind, content: &str) -> Result<()> {
        self.tera
            .add_raw_template(kind.template_name(), content)
            .map_err(|e| CoreError::TemplateError {
                name: kind.template_name().to_string(),
                message: tera_error_detail(&e),
            })
    }

    pub fn has_template(&self, kind: TemplateKind) -> bool {
        self.tera
            .get_template_names()
            .any(|name| name == kind.template_name())
    }

    /// 1ルート分の `function.json`
    pub fn render_route(&self, route: &RouteModel) -> Result<String> {
        let mut context = Context::new();
        context.insert("route", &route.complete_route());
        context.insert("method", route.http_verb().as_str());
        context.insert("handler", route.handler_name());
        self.render(TemplateKind::Function, &context)
    }

    /// `host.json`。パッケージング形式でテンプレートを切り替える
    pub fn render_host(&self, runtime: &RuntimeContext) -> Result<String> {
        let kind = if runtime.is_jar_packaging() {
            TemplateKind::HostJar
        } else {
            TemplateKind::HostExploded
        };
        self.render(kind, &runtime_context(runtime))
    }

    pub fn render_local_settings(&self, runtime: &RuntimeContext) -> Result<String> {
        self.render(TemplateKind::LocalSettings, &runtime_context(runtime))
    }

    pub fn render_dockerfile(&self, runtime: &RuntimeContext) -> Result<String> {
        self.render(TemplateKind::Dockerfile, &runtime_context(runtime))
    }

    fn render(&self, kind: TemplateKind, context: &Context) -> Result<String> {
        if !self.has_template(kind) {
            return Err(CoreError::TemplateNotFound(kind.template_name().to_string()));
        }
        self.tera
            .render(kind.template_name(), context)
            .map_err(|e| CoreError::TemplateError {
                name: kind.template_name().to_string(),
                message: tera_error_detail(&e),
            })
    }
}

fn runtime_context(runtime: &RuntimeContext) -> Context {
    let mut context = Context::new();
    context.insert("runtime_path", &runtime.runtime_path);
    context.insert("path_separator", &runtime.path_separator.to_string());
    context.insert(
        "class_path",
        &format!("classes{}dependency/*", runtime.path_separator),
    );
    context.insert("runtime_version", &runtime.runtime_version);
    context.insert("main_class", &runtime.main_class);
    context
}

/// Tera のエラーチェーンを1つのメッセージにまとめる
fn tera_error_detail(error: &tera::Error) -> String {
    let mut detail = error.to_string();
    let mut source = StdError::source(error);
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}
