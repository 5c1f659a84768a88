use super::{Workspace, print_header};
use crate::SourceArgs;
use colored::Colorize;
use funcflow::{GenerateOptions, GenerateOutcome};

pub fn handle(workspace: &Workspace, source: &SourceArgs) -> anyhow::Result<()> {
    print_header("Generating function configuration...");
    let config = workspace.load_config()?;
    let outcome = run(workspace, &config, source)?;
    print_outcome(&outcome);
    Ok(())
}

/// `deploy --generate` と共通
pub fn run(
    workspace: &Workspace,
    config: &funcflow_config::DeployConfig,
    source: &SourceArgs,
) -> anyhow::Result<GenerateOutcome> {
    let manifest = workspace.manifest(source.manifest.as_deref())?;
    println!("Manifest: {}", manifest.display().to_string().cyan());

    let options = GenerateOptions {
        manifest,
        target_dir: workspace.target_dir.clone(),
        templates: source.templates.clone(),
        dockerfile: !source.no_dockerfile,
    };
    Ok(funcflow::generate(config, &options)?)
}

fn print_outcome(outcome: &GenerateOutcome) {
    println!();
    println!(
        "{}",
        format!("Functions ({}):", outcome.routes.len()).bold()
    );
    for route in &outcome.routes {
        println!(
            "  • {:<7} {} → {}",
            route.http_verb().to_string().green(),
            route.complete_route(),
            route.folder_name().cyan()
        );
    }

    println!();
    println!(
        "Runtime: java {} ({}, {})",
        outcome.runtime.runtime_version, outcome.runtime.target_os, outcome.runtime.runtime_path
    );
    if let Some(dockerfile) = &outcome.generated.dockerfile {
        println!("Dockerfile: {}", dockerfile.display());
    }
    for missing in &outcome.staged.missing {
        println!(
            "{}",
            format!("⚠ Build output not found: {}", missing.display()).yellow()
        );
    }

    println!();
    println!(
        "{}",
        format!(
            "✓ Configuration written to {}",
            outcome.generated.config_dir.display()
        )
        .green()
        .bold()
    );
}
