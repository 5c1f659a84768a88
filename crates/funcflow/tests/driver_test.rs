use async_trait::async_trait;
use funcflow::{DeployError, DeployState, DeploymentDriver};
use funcflow_cloud::{
    CloudError, DeployStrategy, FailureCode, LivenessProbe, ProbeStatus, StrategyKind,
    UploadReceipt, UploadRequest,
};
use funcflow_cloud_azure::{AzCli, CliStrategy};
use funcflow_config::DeployConfig;
use funcflow_core::TargetOs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Fail(&'static str, u16),
    /// ドライバーの知らないところでアーカイブを削除してから成功する
    SucceedAndDeleteArchive,
}

struct MockStrategy {
    kind: StrategyKind,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

impl MockStrategy {
    fn boxed(kind: StrategyKind, behavior: Behavior) -> (Box<dyn DeployStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = Box::new(Self {
            kind,
            behavior,
            calls: calls.clone(),
        });
        (strategy, calls)
    }
}

#[async_trait]
impl DeployStrategy for MockStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(&self, request: &UploadRequest) -> funcflow_cloud::Result<UploadReceipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(request.archive_path.is_file(), "archive must exist at upload time");
        match self.behavior {
            Behavior::Succeed => {}
            Behavior::Fail(reason, code) => {
                let code = match self.kind {
                    StrategyKind::Cli => FailureCode::Exit(i32::from(code)),
                    StrategyKind::Http => FailureCode::Status(code),
                };
                return Err(CloudError::upload(self.kind, reason, Some(code)));
            }
            Behavior::SucceedAndDeleteArchive => {
                std::fs::remove_file(&request.archive_path).unwrap();
            }
        }
        Ok(UploadReceipt {
            strategy: self.kind,
            detail: "mock".to_string(),
        })
    }
}

struct MockProbe {
    status: u16,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LivenessProbe for MockProbe {
    fn endpoint(&self, app_name: &str) -> String {
        format!("https://{app_name}.example/")
    }

    async fn probe(&self, app_name: &str) -> funcflow_cloud::Result<ProbeStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProbeStatus {
            url: self.endpoint(app_name),
            status: self.status,
        })
    }
}

fn probe(status: u16) -> (Box<dyn LivenessProbe>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    (
        Box::new(MockProbe {
            status,
            calls: calls.clone(),
        }),
        calls,
    )
}

const HOST_JSON: &str = r#"{
  "version": "2.0",
  "customHandler": {
    "description": {
      "defaultExecutablePath": "%JAVA_HOME%/bin/java",
      "arguments": ["-jar", "handler.jar"]
    }
  }
}"#;

/// 関数1つと host 記述子を持つ `<target>/azf-config`
fn target_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("azf-config");
    std::fs::create_dir_all(config_dir.join("Orders_GET_list")).unwrap();
    std::fs::write(config_dir.join("Orders_GET_list/function.json"), "{}").unwrap();
    std::fs::write(config_dir.join("host.json"), HOST_JSON).unwrap();
    std::fs::write(config_dir.join("Dockerfile"), "FROM scratch").unwrap();
    dir
}

fn cli_config() -> DeployConfig {
    DeployConfig {
        app_name: Some("orders".into()),
        resource_group: Some("rg".into()),
        user: Some("$orders".into()),
        password: Some("secret".into()),
        target_os: TargetOs::Linux,
        ..Default::default()
    }
}

fn archive_path(target: &Path) -> std::path::PathBuf {
    target.join("azf-config/app.zip")
}

#[tokio::test]
async fn test_successful_cli_deploy() {
    let target = target_dir();
    let (cli, cli_calls) = MockStrategy::boxed(StrategyKind::Cli, Behavior::Succeed);
    let (http, http_calls) = MockStrategy::boxed(StrategyKind::Http, Behavior::Succeed);
    let (probe, probe_calls) = probe(200);

    let mut driver = DeploymentDriver::new(cli, http, probe).with_probe_delay(Duration::ZERO);
    let report = driver.run(&cli_config(), target.path()).await.unwrap();

    assert_eq!(report.state, DeployState::Succeeded);
    assert_eq!(report.strategy, StrategyKind::Cli);
    assert!(!report.fell_back);
    assert!(report.archive_removed);
    assert!(report.warnings.is_empty());
    assert_eq!(report.archive.files, 2); // function.json + host.json, no Dockerfile
    assert_eq!(cli_calls.load(Ordering::SeqCst), 1);
    assert_eq!(http_calls.load(Ordering::SeqCst), 0);
    assert_eq!(probe_calls.load(Ordering::SeqCst), 1);
    assert!(!archive_path(target.path()).exists());
    assert_eq!(
        driver.transitions(),
        &[
            DeployState::ConfigLoaded,
            DeployState::Validated,
            DeployState::Packaged,
            DeployState::Uploading,
            DeployState::Verifying,
            DeployState::Succeeded,
        ]
    );
}

#[tokio::test]
async fn test_missing_cli_tool_falls_back_to_http_once() {
    let target = target_dir();
    let cli: Box<dyn DeployStrategy> =
        Box::new(CliStrategy::new(AzCli::new("funcflow-definitely-missing-tool")));
    let (http, http_calls) =
        MockStrategy::boxed(StrategyKind::Http, Behavior::Fail("bad credentials", 401));
    let (probe, probe_calls) = probe(200);

    let mut driver = DeploymentDriver::new(cli, http, probe).with_probe_delay(Duration::ZERO);
    let err = driver.run(&cli_config(), target.path()).await.unwrap_err();

    assert_eq!(http_calls.load(Ordering::SeqCst), 1);
    assert_eq!(probe_calls.load(Ordering::SeqCst), 0);
    assert_eq!(driver.state(), DeployState::Failed);
    match &err {
        DeployError::Upload { source, .. } => {
            assert_eq!(source.strategy(), Some(StrategyKind::Http));
            assert_eq!(source.code(), Some(FailureCode::Status(401)));
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("bad credentials"));
    assert!(!message.contains("not found"));
}

#[tokio::test]
async fn test_fallback_success_is_reported() {
    let target = target_dir();
    let (cli, _) = MockStrategy::boxed(StrategyKind::Cli, Behavior::Fail("exit code 1", 1));
    let (http, http_calls) = MockStrategy::boxed(StrategyKind::Http, Behavior::Succeed);
    let (probe, _) = probe(200);

    let mut driver = DeploymentDriver::new(cli, http, probe).with_probe_delay(Duration::ZERO);
    let report = driver.run(&cli_config(), target.path()).await.unwrap();

    assert!(report.fell_back);
    assert_eq!(report.strategy, StrategyKind::Http);
    assert_eq!(http_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_http_strategy_has_no_fallback() {
    let target = target_dir();
    let (cli, cli_calls) = MockStrategy::boxed(StrategyKind::Cli, Behavior::Succeed);
    let (http, http_calls) = MockStrategy::boxed(StrategyKind::Http, Behavior::Fail("boom", 500));
    let (probe, _) = probe(200);
    let config = DeployConfig {
        prefer_cli: false,
        ..cli_config()
    };

    let mut driver = DeploymentDriver::new(cli, http, probe).with_probe_delay(Duration::ZERO);
    let err = driver.run(&config, target.path()).await.unwrap_err();

    assert!(matches!(err, DeployError::Upload { .. }));
    assert_eq!(http_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cli_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_probe_does_not_fail_the_run() {
    let target = target_dir();
    let (cli, _) = MockStrategy::boxed(StrategyKind::Cli, Behavior::Succeed);
    let (http, _) = MockStrategy::boxed(StrategyKind::Http, Behavior::Succeed);
    let (probe, probe_calls) = probe(500);

    let mut driver = DeploymentDriver::new(cli, http, probe).with_probe_delay(Duration::ZERO);
    let report = driver.run(&cli_config(), target.path()).await.unwrap();

    assert_eq!(report.state, DeployState::Succeeded);
    assert_eq!(probe_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.probe.as_ref().map(|p| p.status), Some(500));
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("500"));
}

#[tokio::test]
async fn test_cleanup_failure_fails_the_run() {
    let target = target_dir();
    let (cli, _) = MockStrategy::boxed(StrategyKind::Cli, Behavior::SucceedAndDeleteArchive);
    let (http, http_calls) = MockStrategy::boxed(StrategyKind::Http, Behavior::Succeed);
    let (probe, probe_calls) = probe(200);

    let mut driver = DeploymentDriver::new(cli, http, probe).with_probe_delay(Duration::ZERO);
    let err = driver.run(&cli_config(), target.path()).await.unwrap_err();

    assert!(matches!(err, DeployError::Cleanup { .. }));
    assert_eq!(driver.state(), DeployState::Failed);
    assert_eq!(http_calls.load(Ordering::SeqCst), 0);
    assert_eq!(probe_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_keep_archive_and_skip_probe() {
    let target = target_dir();
    let (cli, _) = MockStrategy::boxed(StrategyKind::Cli, Behavior::Succeed);
    let (http, _) = MockStrategy::boxed(StrategyKind::Http, Behavior::Succeed);
    let (probe, probe_calls) = probe(200);
    let config = DeployConfig {
        remove_archive: false,
        run_probe: false,
        ..cli_config()
    };

    let mut driver = DeploymentDriver::new(cli, http, probe);
    let report = driver.run(&config, target.path()).await.unwrap();

    assert!(!report.archive_removed);
    assert!(report.probe.is_none());
    assert_eq!(probe_calls.load(Ordering::SeqCst), 0);
    assert!(archive_path(target.path()).is_file());
    assert!(!driver.transitions().contains(&DeployState::Verifying));
}

#[tokio::test]
async fn test_validation_happens_before_side_effects() {
    let target = target_dir();
    let (cli, cli_calls) = MockStrategy::boxed(StrategyKind::Cli, Behavior::Succeed);
    let (http, http_calls) = MockStrategy::boxed(StrategyKind::Http, Behavior::Succeed);
    let (probe, _) = probe(200);
    let config = DeployConfig {
        resource_group: None,
        ..cli_config()
    };

    let mut driver = DeploymentDriver::new(cli, http, probe).with_probe_delay(Duration::ZERO);
    let err = driver.run(&config, target.path()).await.unwrap_err();

    assert!(matches!(err, DeployError::Configuration { .. }));
    assert!(err.to_string().contains("RESOURCE_GROUP"));
    assert_eq!(driver.transitions(), &[DeployState::ConfigLoaded, DeployState::Failed]);
    assert_eq!(cli_calls.load(Ordering::SeqCst), 0);
    assert_eq!(http_calls.load(Ordering::SeqCst), 0);
    assert!(!archive_path(target.path()).exists());
}

#[tokio::test]
async fn test_missing_config_dir_is_a_packaging_error() {
    let target = tempfile::tempdir().unwrap();
    let (cli, cli_calls) = MockStrategy::boxed(StrategyKind::Cli, Behavior::Succeed);
    let (http, _) = MockStrategy::boxed(StrategyKind::Http, Behavior::Succeed);
    let (probe, _) = probe(200);

    let mut driver = DeploymentDriver::new(cli, http, probe);
    let err = driver.run(&cli_config(), target.path()).await.unwrap_err();

    assert!(matches!(err, DeployError::Packaging { .. }));
    assert_eq!(cli_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_runtime_path_is_pinned_in_archive_and_restored() {
    let target = target_dir();
    let (cli, _) = MockStrategy::boxed(StrategyKind::Cli, Behavior::Succeed);
    let (http, _) = MockStrategy::boxed(StrategyKind::Http, Behavior::Succeed);
    let (probe, _) = probe(200);
    let config = DeployConfig {
        runtime_version: Some("11".into()),
        remove_archive: false,
        run_probe: false,
        ..cli_config()
    };

    let mut driver = DeploymentDriver::new(cli, http, probe);
    driver.run(&config, target.path()).await.unwrap();

    let mut archive =
        zip::ZipArchive::new(std::fs::File::open(archive_path(target.path())).unwrap()).unwrap();
    let mut packaged = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("host.json").unwrap(), &mut packaged)
        .unwrap();
    let packaged: serde_json::Value = serde_json::from_str(&packaged).unwrap();
    assert_eq!(
        packaged["customHandler"]["description"]["defaultExecutablePath"],
        "/usr/lib/jvm/zre-11-azure-amd64/bin/java"
    );

    let on_disk = std::fs::read_to_string(target.path().join("azf-config/host.json")).unwrap();
    assert_eq!(on_disk, HOST_JSON);
}
