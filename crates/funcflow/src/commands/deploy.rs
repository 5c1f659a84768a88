use super::{Workspace, print_header};
use crate::DeployArgs;
use colored::Colorize;
use funcflow::{DeployReport, DeploymentContext, DeploymentDriver};
use funcflow_build::StepProgress;
use funcflow_config::DeployConfig;
use std::io::IsTerminal;
use std::time::Duration;

pub async fn handle(workspace: &Workspace, args: DeployArgs) -> anyhow::Result<()> {
    print_header("Starting deployment...");

    let mut config = workspace.load_config()?;
    apply_overrides(&mut config, &args);

    // この確認より前には何も生成・送信しない
    let context = DeploymentContext::resolve(&config, &workspace.target_dir)?;
    println!("App:      {}", context.app_name.cyan());
    println!("Strategy: {}", context.strategy.to_string().cyan());

    if args.generate {
        let outcome = super::generate::run(workspace, &config, &args.source)?;
        println!("Generated {} function(s)", outcome.routes.len());
        config.runtime_version = Some(outcome.runtime.runtime_version);
    } else {
        // `generate` と同じランタイムを固定
        let manifest = args
            .source
            .manifest
            .clone()
            .or_else(|| funcflow::find_manifest(&workspace.target_dir));
        config.runtime_version = Some(funcflow::resolve_runtime_version(
            &config,
            manifest.as_deref(),
        )?);
    }

    let progress = if std::io::stderr().is_terminal() {
        StepProgress::new(&format!("Deploying {}...", context.app_name))
    } else {
        StepProgress::hidden()
    };

    let mut driver = DeploymentDriver::azure(&config)
        .with_probe_delay(Duration::from_secs(args.probe_delay));

    match driver.run(&config, &workspace.target_dir).await {
        Ok(report) => {
            progress.finish_success("Deployed");
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            progress.finish_error(e.operation());
            println!();
            println!("{}", format!("✗ {e}").red().bold());
            Err(e.into())
        }
    }
}

fn apply_overrides(config: &mut DeployConfig, args: &DeployArgs) {
    if let Some(app) = &args.app {
        config.app_name = Some(app.clone());
    }
    if let Some(resource_group) = &args.resource_group {
        config.resource_group = Some(resource_group.clone());
    }
    if args.http {
        config.prefer_cli = false;
    }
    if args.no_probe {
        config.run_probe = false;
    }
    if args.keep_archive {
        config.remove_archive = false;
    }
}

fn print_report(report: &DeployReport) {
    println!();
    println!(
        "{}",
        format!(
            "✓ Deployed {} via {} ({})",
            report.app_name, report.strategy, report.receipt.detail
        )
        .green()
        .bold()
    );
    if report.fell_back {
        println!("{}", "  CLI upload failed, HTTP upload used instead".yellow());
    }
    println!(
        "  archive: {} file(s), {} dir(s), {} bytes{}",
        report.archive.files,
        report.archive.directories,
        report.archive.bytes,
        if report.archive_removed { ", removed" } else { "" }
    );
    if let Some(probe) = &report.probe {
        println!("  probe:   {} → HTTP {}", probe.url, probe.status);
    }
    for warning in &report.warnings {
        println!("{}", format!("  ⚠ {warning}").yellow());
    }
}
