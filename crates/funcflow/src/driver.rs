//! デプロイドライバー
//!
//! 1回のデプロイを逐次的な状態機械として実行します:
//!
//! ```text
//! Idle → ConfigLoaded → Validated → Packaged → Uploading → Verifying → Succeeded
//!                 └──────────┴───────────┴──────────┴─────────────────→ Failed
//! ```
//!
//! 自動リカバリは `Uploading` 中の CLI→HTTP フォールバックのみです。
//! 動作確認は実行を失敗させず、レポートに警告を追加するだけです。

use crate::error::{DeployError, Result};
use funcflow_build::{ArchiveSummary, PackageBuilder, pin_runtime_path};
use funcflow_cloud::{
    Credentials, DeployStrategy, LivenessProbe, ProbeStatus, StrategyKind, UploadReceipt,
    UploadRequest,
};
use funcflow_cloud_azure::{AzCli, CliStrategy, HttpProbe, ZipDeploy, ZipDeployStrategy};
use funcflow_config::{ConfigError, DeployConfig, keys};
use funcflow_core::{TargetOs, pinned_runtime_path};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 死活確認前の待機時間
pub const DEFAULT_PROBE_DELAY: Duration = Duration::from_secs(10);

const HOST_FILE_NAME: &str = "host.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    Idle,
    ConfigLoaded,
    Validated,
    Packaged,
    Uploading,
    Verifying,
    Succeeded,
    Failed,
}

impl DeployState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeployState::Succeeded | DeployState::Failed)
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployState::Idle => "idle",
            DeployState::ConfigLoaded => "config-loaded",
            DeployState::Validated => "validated",
            DeployState::Packaged => "packaged",
            DeployState::Uploading => "uploading",
            DeployState::Verifying => "verifying",
            DeployState::Succeeded => "succeeded",
            DeployState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 検証済みの設定から解決した1回分の値
#[derive(Debug, Clone)]
pub struct DeploymentContext {
    pub app_name: String,
    pub strategy: StrategyKind,
    pub resource_group: Option<String>,
    pub credentials: Option<Credentials>,
    pub config_dir: PathBuf,
    pub archive_path: PathBuf,
    pub remove_archive: bool,
    pub run_probe: bool,
    /// パッケージング中に `host.json` へ書き込むランタイム実行ファイル
    pub runtime_path: Option<String>,
}

impl DeploymentContext {
    /// `config` を検証し、`target_dir` 配下のパスを解決
    pub fn resolve(config: &DeployConfig, target_dir: &Path) -> Result<Self> {
        config
            .validate()
            .map_err(|e| DeployError::config("validate configuration", e))?;

        let Some(app_name) = config.app_name.clone() else {
            return Err(DeployError::config(
                "validate configuration",
                ConfigError::MissingFields {
                    strategy: StrategyKind::preferred(config.prefer_cli).to_string(),
                    missing: vec![keys::FUNCTION_APP.to_string()],
                },
            ));
        };

        let credentials = match (&config.user, &config.password) {
            (Some(user), Some(password)) => Some(Credentials::new(user, password)),
            _ => None,
        };

        Ok(Self {
            app_name,
            strategy: StrategyKind::preferred(config.prefer_cli),
            resource_group: config.resource_group.clone(),
            credentials,
            config_dir: config.config_dir(target_dir),
            archive_path: config.archive_path(target_dir),
            remove_archive: config.remove_archive,
            run_probe: config.run_probe,
            runtime_path: resolve_runtime_path(config),
        })
    }

    pub fn upload_request(&self) -> UploadRequest {
        UploadRequest::new(&self.archive_path, &self.app_name)
            .with_resource_group(self.resource_group.clone())
            .with_credentials(self.credentials.clone())
    }
}

/// 明示的な `RUNTIME_PATH`、なければ Linux 向けのインストールパス
fn resolve_runtime_path(config: &DeployConfig) -> Option<String> {
    if let Some(path) = &config.runtime_path {
        return Some(path.clone());
    }
    match config.target_os {
        TargetOs::Linux => config
            .runtime_version
            .as_deref()
            .and_then(pinned_runtime_path)
            .map(str::to_string),
        TargetOs::Windows => None,
    }
}

/// 成功した実行の結果
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub state: DeployState,
    pub app_name: String,
    /// アップロードに成功したデプロイ方式
    pub strategy: StrategyKind,
    pub fell_back: bool,
    pub receipt: UploadReceipt,
    pub archive: ArchiveSummary,
    pub archive_removed: bool,
    pub probe: Option<ProbeStatus>,
    pub warnings: Vec<String>,
    pub transitions: Vec<DeployState>,
}

pub struct DeploymentDriver {
    cli: Box<dyn DeployStrategy>,
    http: Box<dyn DeployStrategy>,
    probe: Box<dyn LivenessProbe>,
    packager: PackageBuilder,
    probe_delay: Duration,
    state: DeployState,
    transitions: Vec<DeployState>,
}

impl DeploymentDriver {
    pub fn new(
        cli: Box<dyn DeployStrategy>,
        http: Box<dyn DeployStrategy>,
        probe: Box<dyn LivenessProbe>,
    ) -> Self {
        Self {
            cli,
            http,
            probe,
            packager: PackageBuilder::new(),
            probe_delay: DEFAULT_PROBE_DELAY,
            state: DeployState::Idle,
            transitions: Vec::new(),
        }
    }

    /// az CLI・zipdeploy・公開URLを使うドライバー
    pub fn azure(config: &DeployConfig) -> Self {
        Self::new(
            Box::new(CliStrategy::new(AzCli::new(&config.deploy_tool))),
            Box::new(ZipDeployStrategy::new(ZipDeploy::new())),
            Box::new(HttpProbe::new()),
        )
    }

    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    pub fn with_packager(mut self, packager: PackageBuilder) -> Self {
        self.packager = packager;
        self
    }

    pub fn state(&self) -> DeployState {
        self.state
    }

    /// 直前の実行で遷移した状態（順番通り）
    pub fn transitions(&self) -> &[DeployState] {
        &self.transitions
    }

    /// `target_dir` 配下の設定ディレクトリをデプロイ
    ///
    /// `config` はマージ済みの設定。検証が終わるまでディスクにも
    /// ネットワークにも触れない
    pub async fn run(&mut self, config: &DeployConfig, target_dir: &Path) -> Result<DeployReport> {
        self.state = DeployState::Idle;
        self.transitions.clear();
        self.transition(DeployState::ConfigLoaded);

        match self.execute(config, target_dir).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(operation = e.operation(), error = %e, "Deployment failed");
                self.transition(DeployState::Failed);
                Err(e)
            }
        }
    }

    async fn execute(&mut self, config: &DeployConfig, target_dir: &Path) -> Result<DeployReport> {
        let context = DeploymentContext::resolve(config, target_dir)?;
        self.transition(DeployState::Validated);

        let archive = self.package(&context)?;
        self.transition(DeployState::Packaged);

        self.transition(DeployState::Uploading);
        let (receipt, fell_back) = self.upload(&context).await?;
        let archive_removed = self.cleanup(&context)?;

        let mut warnings = Vec::new();
        let probe = if context.run_probe {
            self.transition(DeployState::Verifying);
            self.verify(&context, &mut warnings).await
        } else {
            None
        };

        self.transition(DeployState::Succeeded);
        Ok(DeployReport {
            state: self.state,
            app_name: context.app_name,
            strategy: receipt.strategy,
            fell_back,
            receipt,
            archive,
            archive_removed,
            probe,
            warnings,
            transitions: self.transitions.clone(),
        })
    }

    fn transition(&mut self, next: DeployState) {
        debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
        self.transitions.push(next);
    }

    /// ランタイムパスを固定してアーカイブを作り、`host.json` を元に戻す
    fn package(&self, context: &DeploymentContext) -> Result<ArchiveSummary> {
        let host_file = context.config_dir.join(HOST_FILE_NAME);
        let pin = match &context.runtime_path {
            Some(runtime_path) if host_file.is_file() => pin_runtime_path(&host_file, runtime_path)
                .map_err(|e| DeployError::packaging("pin runtime path", e))?,
            _ => None,
        };

        let packaged = self.packager.build(&context.config_dir, &context.archive_path);
        // パッケージングに失敗しても戻す
        let restored = match pin {
            Some(pin) => pin.restore(),
            None => Ok(()),
        };

        let summary = packaged.map_err(|e| DeployError::packaging("build archive", e))?;
        restored.map_err(|e| DeployError::packaging("restore runtime path", e))?;
        Ok(summary)
    }

    fn strategy(&self, kind: StrategyKind) -> &dyn DeployStrategy {
        match kind {
            StrategyKind::Cli => self.cli.as_ref(),
            StrategyKind::Http => self.http.as_ref(),
        }
    }

    /// 設定した方式でアップロード。CLI が失敗したら一度だけ HTTP にフォールバック
    async fn upload(&self, context: &DeploymentContext) -> Result<(UploadReceipt, bool)> {
        let request = context.upload_request();
        let primary = self.strategy(context.strategy);
        info!(
            strategy = %primary.kind(),
            tool = primary.name(),
            archive = %request.archive_path.display(),
            "Uploading archive"
        );

        match primary.upload(&request).await {
            Ok(receipt) => Ok((receipt, false)),
            Err(cli_error) if context.strategy == StrategyKind::Cli => {
                warn!(error = %cli_error, "CLI upload failed, falling back to HTTP");
                self.http
                    .upload(&request)
                    .await
                    .map(|receipt| (receipt, true))
                    .map_err(|source| DeployError::Upload {
                        operation: "upload archive (HTTP fallback)",
                        source,
                    })
            }
            Err(source) => Err(DeployError::Upload {
                operation: "upload archive",
                source,
            }),
        }
    }

    fn cleanup(&self, context: &DeploymentContext) -> Result<bool> {
        if !context.remove_archive {
            return Ok(false);
        }
        std::fs::remove_file(&context.archive_path).map_err(|source| DeployError::Cleanup {
            operation: "remove archive",
            path: context.archive_path.clone(),
            source,
        })?;
        debug!(archive = %context.archive_path.display(), "Archive removed");
        Ok(true)
    }

    /// 待機後に一度だけ確認し、問題は警告にする
    async fn verify(&self, context: &DeploymentContext, warnings: &mut Vec<String>) -> Option<ProbeStatus> {
        if !self.probe_delay.is_zero() {
            info!(
                delay_secs = self.probe_delay.as_secs(),
                "Waiting for the function app to start"
            );
            tokio::time::sleep(self.probe_delay).await;
        }

        match self.probe.probe(&context.app_name).await {
            Ok(status) if status.is_healthy() => {
                info!(url = %status.url, status = status.status, "Function app is alive");
                Some(status)
            }
            Ok(status) => {
                let warning = format!(
                    "Liveness probe {} returned HTTP {}",
                    status.url, status.status
                );
                warn!("{warning}");
                warnings.push(warning);
                Some(status)
            }
            Err(e) => {
                let warning = format!(
                    "Liveness probe {} failed: {e}",
                    self.probe.endpoint(&context.app_name)
                );
                warn!("{warning}");
                warnings.push(warning);
                None
            }
        }
    }
}
