//! az CLI wrapper
//!
//! Runs `az functionapp deployment source config-zip`, forwarding the tool's
//! output to the log line by line while it runs.

use crate::error::{AzureError, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

pub const DEFAULT_PROGRAM: &str = "az";

/// az CLI wrapper
#[derive(Debug, Clone)]
pub struct AzCli {
    program: String,
}

impl Default for AzCli {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl AzCli {
    /// `program` is looked up on `PATH` unless it is a path itself
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments of the zip deployment command
    pub fn config_zip_args(resource_group: &str, app_name: &str, archive: &Path) -> Vec<String> {
        vec![
            "functionapp".to_string(),
            "deployment".to_string(),
            "source".to_string(),
            "config-zip".to_string(),
            "-g".to_string(),
            resource_group.to_string(),
            "-n".to_string(),
            app_name.to_string(),
            "--src".to_string(),
            archive.display().to_string(),
        ]
    }

    /// Deploy `archive` to `app_name`; succeeds only on exit code 0
    pub async fn deploy_zip(&self, resource_group: &str, app_name: &str, archive: &Path) -> Result<()> {
        let args = Self::config_zip_args(resource_group, app_name, archive);
        self.run_streaming(&args).await
    }

    /// Run the tool, logging stdout at info and stderr at warn/error
    async fn run_streaming(&self, args: &[String]) -> Result<()> {
        debug!("Running: {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AzureError::ToolNotFound(self.program.clone()),
                _ => AzureError::IoError(e),
            })?;

        let stdout = child.stdout.take().map(|out| tokio::spawn(forward_lines(out, false)));
        let stderr = child.stderr.take().map(|err| tokio::spawn(forward_lines(err, true)));

        let status = child.wait().await?;
        for reader in [stdout, stderr].into_iter().flatten() {
            if let Err(e) = reader.await {
                warn!(error = %e, "Output reader stopped unexpectedly");
            }
        }

        if status.success() {
            info!(program = %self.program, "Command finished");
            Ok(())
        } else {
            Err(AzureError::CommandFailed {
                program: self.program.clone(),
                code: status.code(),
            })
        }
    }
}

async fn forward_lines<R>(stream: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if is_stderr => {
                if line.trim_start().starts_with("ERROR") {
                    error!(target: "funcflow::az", "{line}");
                } else {
                    warn!(target: "funcflow::az", "{line}");
                }
            }
            Ok(Some(line)) => info!(target: "funcflow::az", "{line}"),
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "Stopped reading command output");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_zip_args() {
        let args = AzCli::config_zip_args("rg-prod", "orders", Path::new("target/app.zip"));
        assert_eq!(
            args.join(" "),
            "functionapp deployment source config-zip -g rg-prod -n orders --src target/app.zip"
        );
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let az = AzCli::new("funcflow-definitely-missing-tool");
        let err = az
            .deploy_zip("rg", "app", Path::new("app.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, AzureError::ToolNotFound(_)));
        assert!(err.failure_code().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_is_reported() {
        let az = AzCli::new("false");
        let err = az
            .deploy_zip("rg", "app", Path::new("app.zip"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AzureError::CommandFailed { code: Some(1), .. }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success() {
        // `true` ignores its arguments and exits 0
        let az = AzCli::new("true");
        az.deploy_zip("rg", "app", Path::new("app.zip")).await.unwrap();
    }
}
