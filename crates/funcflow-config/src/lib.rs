//! funcflow のデプロイ設定
//!
//! 設定は3層から取得します。環境変数は `.azf` ファイルより優先され、
//! `.azf` ファイルは組み込みのデフォルト値より優先されます。
//! コマンドラインフラグは読み込んだ [`DeployConfig`] に呼び出し側で上書きします。

pub mod error;

pub use error::*;

use funcflow_core::TargetOs;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// プロジェクトディレクトリで探すデフォルトの設定ファイル
pub const CONFIG_FILE_NAME: &str = ".azf";

pub const DEFAULT_ZIP_FILE_NAME: &str = "app.zip";
pub const DEFAULT_CONFIG_FOLDER: &str = "azf-config";
pub const DEFAULT_DEPLOY_TOOL: &str = "az";

/// 認識するキー。ファイルと環境変数で同じ名前を使う
pub mod keys {
    pub const FUNCTION_APP: &str = "FUNCTION_APP";
    pub const RESOURCE_GROUP: &str = "RESOURCE_GROUP";
    pub const USER: &str = "AZF_USER";
    pub const PASSWORD: &str = "AZF_USER_PSW";
    pub const ZIP_FILE_NAME: &str = "ZIP_FILE_NAME";
    pub const CONFIG_FOLDER: &str = "CONFIG_FOLDER";
    pub const REMOVE_ZIP: &str = "REMOVE_ZIP";
    pub const INITIAL_INVOKE: &str = "INITIAL_INVOKE";
    pub const DEPLOY_WITH_CLI: &str = "DEPLOY_WITH_CLI";
    pub const TARGET_OS: &str = "TARGET_OS";
    pub const RUNTIME_VERSION: &str = "RUNTIME_VERSION";
    pub const RUNTIME_PATH: &str = "RUNTIME_PATH";
    pub const DEPLOY_TOOL: &str = "DEPLOY_TOOL";

    pub const ALL: [&str; 13] = [
        FUNCTION_APP,
        RESOURCE_GROUP,
        USER,
        PASSWORD,
        ZIP_FILE_NAME,
        CONFIG_FOLDER,
        REMOVE_ZIP,
        INITIAL_INVOKE,
        DEPLOY_WITH_CLI,
        TARGET_OS,
        RUNTIME_VERSION,
        RUNTIME_PATH,
        DEPLOY_TOOL,
    ];
}

/// パース済みの `.azf` ファイル（dotenv 形式）
///
/// クォートなし・ダブルクォートの値では `$VAR` が展開されるため、
/// `$orders` のようなデプロイユーザーはシングルクォートで囲むこと
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    /// dotenv 形式の内容をパース。重複キーは後のものが優先
    pub fn parse(content: &str) -> Result<Self> {
        Self::collect(dotenvy::from_read_iter(content.as_bytes()), Path::new("<inline>"))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let entries = dotenvy::from_path_iter(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::collect(entries, path)
    }

    fn collect<I>(entries: I, path: &Path) -> Result<Self>
    where
        I: IntoIterator<Item = std::result::Result<(String, String), dotenvy::Error>>,
    {
        let entries = entries
            .into_iter()
            .collect::<std::result::Result<HashMap<_, _>, _>>()
            .map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        debug!(path = %path.display(), entries = entries.len(), "Config file parsed");
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `true/false/1/0/yes/no`（大文字小文字は区別しない）
pub fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// 1回のデプロイで使う解決済みの設定
#[derive(Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub app_name: Option<String>,
    pub resource_group: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub zip_file_name: String,
    pub config_folder: String,
    pub remove_archive: bool,
    pub run_probe: bool,
    pub prefer_cli: bool,
    pub target_os: TargetOs,
    pub runtime_version: Option<String>,
    pub runtime_path: Option<String>,
    pub deploy_tool: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            app_name: None,
            resource_group: None,
            user: None,
            password: None,
            zip_file_name: DEFAULT_ZIP_FILE_NAME.to_string(),
            config_folder: DEFAULT_CONFIG_FOLDER.to_string(),
            remove_archive: true,
            run_probe: true,
            prefer_cli: true,
            target_os: TargetOs::host(),
            runtime_version: None,
            runtime_path: None,
            deploy_tool: DEFAULT_DEPLOY_TOOL.to_string(),
        }
    }
}

// パスワードはログに出さない
impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("app_name", &self.app_name)
            .field("resource_group", &self.resource_group)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("zip_file_name", &self.zip_file_name)
            .field("config_folder", &self.config_folder)
            .field("remove_archive", &self.remove_archive)
            .field("run_probe", &self.run_probe)
            .field("prefer_cli", &self.prefer_cli)
            .field("target_os", &self.target_os)
            .field("runtime_version", &self.runtime_version)
            .field("runtime_path", &self.runtime_path)
            .field("deploy_tool", &self.deploy_tool)
            .finish()
    }
}

impl DeployConfig {
    /// 設定ファイルを読み込み、プロセスの環境変数で上書き
    ///
    /// 明示的に指定した `config_file` は存在しなければならない。指定がなければ
    /// `<project_dir>/.azf` があれば使う
    pub fn load(config_file: Option<&Path>, project_dir: &Path) -> Result<Self> {
        let properties = match config_file {
            Some(path) => {
                debug!(path = %path.display(), "Reading config file");
                Properties::read(path)?
            }
            None => {
                let path = project_dir.join(CONFIG_FILE_NAME);
                if path.is_file() {
                    debug!(path = %path.display(), "Reading config file");
                    Properties::read(&path)?
                } else {
                    debug!("No config file, using environment and defaults");
                    Properties::default()
                }
            }
        };

        Self::from_sources(&properties, |key| std::env::var(key).ok())
    }

    /// `properties` と `env` の値をマージ（`env` が優先）
    ///
    /// 空の環境変数は未設定として扱う
    pub fn from_sources<F>(properties: &Properties, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| -> Option<String> {
            env(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| properties.get(key).map(str::to_string))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        config.app_name = lookup(keys::FUNCTION_APP);
        config.resource_group = lookup(keys::RESOURCE_GROUP);
        config.user = lookup(keys::USER);
        config.password = lookup(keys::PASSWORD);
        config.runtime_version = lookup(keys::RUNTIME_VERSION);
        config.runtime_path = lookup(keys::RUNTIME_PATH);

        if let Some(value) = lookup(keys::ZIP_FILE_NAME) {
            config.zip_file_name = value;
        }
        if let Some(value) = lookup(keys::CONFIG_FOLDER) {
            config.config_folder = value;
        }
        if let Some(value) = lookup(keys::DEPLOY_TOOL) {
            config.deploy_tool = value;
        }
        if let Some(value) = lookup(keys::REMOVE_ZIP) {
            config.remove_archive = parse_bool(keys::REMOVE_ZIP, &value)?;
        }
        if let Some(value) = lookup(keys::INITIAL_INVOKE) {
            config.run_probe = parse_bool(keys::INITIAL_INVOKE, &value)?;
        }
        if let Some(value) = lookup(keys::DEPLOY_WITH_CLI) {
            config.prefer_cli = parse_bool(keys::DEPLOY_WITH_CLI, &value)?;
        }
        if let Some(value) = lookup(keys::TARGET_OS) {
            config.target_os = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: keys::TARGET_OS.to_string(),
                value: value.clone(),
            })?;
        }

        Ok(config)
    }

    /// 選択したデプロイ方式に必要な項目を確認
    ///
    /// 不足している項目はまとめて1つのエラーで報告する
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.app_name.is_none() {
            missing.push(keys::FUNCTION_APP.to_string());
        }

        let strategy = if self.prefer_cli {
            if self.resource_group.is_none() {
                missing.push(keys::RESOURCE_GROUP.to_string());
            }
            "CLI"
        } else {
            if self.user.is_none() {
                missing.push(keys::USER.to_string());
            }
            if self.password.is_none() {
                missing.push(keys::PASSWORD.to_string());
            }
            "HTTP"
        };

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingFields {
                strategy: strategy.to_string(),
                missing,
            })
        }
    }

    /// Basic 認証の資格情報が揃っているか
    pub fn has_credentials(&self) -> bool {
        self.user.is_some() && self.password.is_some()
    }

    /// ビルド出力ディレクトリ配下の生成設定ディレクトリ
    pub fn config_dir(&self, target_dir: &Path) -> PathBuf {
        target_dir.join(&self.config_folder)
    }

    /// アーカイブの配置先。設定ディレクトリ内に置き、パスで除外する
    pub fn archive_path(&self, target_dir: &Path) -> PathBuf {
        self.config_dir(target_dir).join(&self.zip_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_properties() {
        let props = Properties::parse(
            r#"
# comment
FUNCTION_APP=orders-app
export RESOURCE_GROUP=rg-prod
AZF_USER='$orders-app'
AZF_USER_PSW="p@ss=word"
RUNTIME_PATH=/opt/java/bin/java # trailing comment
"#,
        )
        .unwrap();
        assert_eq!(props.len(), 5);
        assert_eq!(props.get("FUNCTION_APP"), Some("orders-app"));
        assert_eq!(props.get("RESOURCE_GROUP"), Some("rg-prod"));
        assert_eq!(props.get("AZF_USER"), Some("$orders-app"));
        assert_eq!(props.get("AZF_USER_PSW"), Some("p@ss=word"));
        assert_eq!(props.get("RUNTIME_PATH"), Some("/opt/java/bin/java"));
    }

    #[test]
    fn test_parse_multiline_and_escapes() {
        let props = Properties::parse(
            "RUNTIME_PATH=\"C:\\\\Java\\\\bin\\\\java.exe\"\nDEPLOY_TOOL=\"az\nextra\"\n",
        )
        .unwrap();
        assert_eq!(props.get("RUNTIME_PATH"), Some("C:\\Java\\bin\\java.exe"));
        assert_eq!(props.get("DEPLOY_TOOL"), Some("az\nextra"));
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        let err = Properties::parse("FUNCTION_APP=orders\nnot a setting\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_defaults() {
        let config = DeployConfig::from_sources(&Properties::default(), no_env).unwrap();
        assert_eq!(config.zip_file_name, "app.zip");
        assert_eq!(config.config_folder, "azf-config");
        assert_eq!(config.deploy_tool, "az");
        assert!(config.remove_archive);
        assert!(config.run_probe);
        assert!(config.prefer_cli);
        assert_eq!(config.target_os, TargetOs::host());
        assert!(config.app_name.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let props = Properties::parse("FUNCTION_APP=from-file\nRESOURCE_GROUP=rg-file\n").unwrap();
        let config = DeployConfig::from_sources(&props, |key| match key {
            "FUNCTION_APP" => Some("from-env".to_string()),
            "RESOURCE_GROUP" => Some("  ".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.app_name.as_deref(), Some("from-env"));
        // 空の環境変数はファイルの値にフォールバック
        assert_eq!(config.resource_group.as_deref(), Some("rg-file"));
    }

    #[test]
    fn test_booleans() {
        let props = Properties::parse("REMOVE_ZIP=no\nINITIAL_INVOKE=0\nDEPLOY_WITH_CLI=FALSE\n").unwrap();
        let config = DeployConfig::from_sources(&props, no_env).unwrap();
        assert!(!config.remove_archive);
        assert!(!config.run_probe);
        assert!(!config.prefer_cli);

        let props = Properties::parse("REMOVE_ZIP=maybe\n").unwrap();
        let err = DeployConfig::from_sources(&props, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "REMOVE_ZIP"));
    }

    #[test]
    fn test_target_os() {
        let props = Properties::parse("TARGET_OS=Windows\n").unwrap();
        let config = DeployConfig::from_sources(&props, no_env).unwrap();
        assert_eq!(config.target_os, TargetOs::Windows);

        let props = Properties::parse("TARGET_OS=solaris\n").unwrap();
        assert!(matches!(
            DeployConfig::from_sources(&props, no_env),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_cli_strategy() {
        let config = DeployConfig::default();
        match config.validate().unwrap_err() {
            ConfigError::MissingFields { strategy, missing } => {
                assert_eq!(strategy, "CLI");
                assert_eq!(missing, vec!["FUNCTION_APP", "RESOURCE_GROUP"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let config = DeployConfig {
            app_name: Some("app".into()),
            resource_group: Some("rg".into()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_http_strategy() {
        let config = DeployConfig {
            app_name: Some("app".into()),
            user: Some("deployer".into()),
            prefer_cli: false,
            ..Default::default()
        };
        match config.validate().unwrap_err() {
            ConfigError::MissingFields { strategy, missing } => {
                assert_eq!(strategy, "HTTP");
                assert_eq!(missing, vec!["AZF_USER_PSW"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_debug_hides_password() {
        let config = DeployConfig {
            password: Some("hunter2".into()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_paths() {
        let config = DeployConfig::default();
        let target = Path::new("/work/target");
        assert_eq!(config.config_dir(target), Path::new("/work/target/azf-config"));
        assert_eq!(
            config.archive_path(target),
            Path::new("/work/target/azf-config/app.zip")
        );
    }

    #[test]
    #[serial]
    fn test_load_from_project_dir_and_env() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "FUNCTION_APP=file-app\nRESOURCE_GROUP=rg\n",
        )
        .unwrap();

        temp_env::with_vars(
            [
                ("FUNCTION_APP", Some("env-app")),
                ("ZIP_FILE_NAME", Some("bundle.zip")),
                ("RESOURCE_GROUP", None),
            ],
            || {
                let config = DeployConfig::load(None, dir.path()).unwrap();
                assert_eq!(config.app_name.as_deref(), Some("env-app"));
                assert_eq!(config.resource_group.as_deref(), Some("rg"));
                assert_eq!(config.zip_file_name, "bundle.zip");
            },
        );
    }

    #[test]
    #[serial]
    fn test_load_without_file() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars_unset(keys::ALL, || {
            let config = DeployConfig::load(None, dir.path()).unwrap();
            assert_eq!(config, DeployConfig::default());
        });
    }

    #[test]
    #[serial]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = DeployConfig::load(Some(&dir.path().join("missing.azf")), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
