use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 展開（クラスパスディレクトリ）形式デプロイの既定エントリポイント
pub const DEFAULT_MAIN_CLASS: &str = "com.kumuluz.ee.EeApplication";

/// 関数アプリが動作するOS
///
/// ビルドマシンとは独立。Linux でビルドして Windows の関数アプリを
/// 対象にすることも、その逆も可能。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    Linux,
    Windows,
}

impl TargetOs {
    /// funcflow を実行しているマシンのOS
    pub fn host() -> Self {
        if cfg!(windows) {
            TargetOs::Windows
        } else {
            TargetOs::Linux
        }
    }

    /// このOSのランタイムが解釈するクラスパス区切り文字
    pub fn path_separator(&self) -> char {
        match self {
            TargetOs::Linux => ':',
            TargetOs::Windows => ';',
        }
    }

    /// 起動時にプラットフォームが解決するランタイム実行ファイルのパス
    pub fn runtime_path(&self) -> &'static str {
        match self {
            TargetOs::Linux => "%JAVA_HOME%/bin/java",
            TargetOs::Windows => "%JAVA_HOME%\\bin\\java",
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetOs::Linux => f.write_str("linux"),
            TargetOs::Windows => f.write_str("windows"),
        }
    }
}

impl FromStr for TargetOs {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(TargetOs::Linux),
            "windows" => Ok(TargetOs::Windows),
            _ => Err(CoreError::InvalidValue {
                key: "target os (expected linux or windows)".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// 関数アプリ内でのアプリケーションコードの配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Packaging {
    /// 単一の実行可能アーカイブ（`handler.jar`）
    Jar,
    /// クラスパス上の `classes/` と `dependency/` ディレクトリ
    #[default]
    Exploded,
}

/// `1.8` → `8`。それ以外はトリムしてそのまま返す
pub fn normalize_runtime_version(version: &str) -> String {
    let version = version.trim();
    match version.strip_prefix("1.") {
        Some(rest) if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) => {
            rest.to_string()
        }
        _ => version.to_string(),
    }
}

/// Linux の関数ホストにインストールされている、バージョンごとのランタイム実行ファイル
pub fn pinned_runtime_path(version: &str) -> Option<&'static str> {
    match normalize_runtime_version(version).as_str() {
        "8" => Some("/usr/lib/jvm/adoptium-8-x64/bin/java"),
        "11" => Some("/usr/lib/jvm/zre-11-azure-amd64/bin/java"),
        _ => None,
    }
}

/// host・settings・Dockerfile テンプレートに埋め込む共通値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContext {
    pub target_os: TargetOs,
    pub runtime_path: String,
    pub path_separator: char,
    pub runtime_version: String,
    pub main_class: String,
    pub packaging: Packaging,
}

impl RuntimeContext {
    pub fn new(target_os: TargetOs, runtime_version: &str, packaging: Packaging) -> Self {
        Self {
            target_os,
            runtime_path: target_os.runtime_path().to_string(),
            path_separator: target_os.path_separator(),
            runtime_version: normalize_runtime_version(runtime_version),
            main_class: DEFAULT_MAIN_CLASS.to_string(),
            packaging,
        }
    }

    pub fn with_main_class(mut self, main_class: impl Into<String>) -> Self {
        self.main_class = main_class.into();
        self
    }

    pub fn is_jar_packaging(&self) -> bool {
        self.packaging == Packaging::Jar
    }
}
