use super::{Workspace, print_header};
use colored::Colorize;
use std::path::PathBuf;

pub fn handle(workspace: &Workspace, manifest: Option<PathBuf>) -> anyhow::Result<()> {
    let manifest = workspace.manifest(manifest.as_deref())?;
    let (source, routes) = funcflow::load_routes(&manifest)?;

    print_header(&format!("Routes in {}", source.project().package));
    if routes.is_empty() {
        println!("{}", "No annotated handlers found.".yellow());
        return Ok(());
    }

    for route in &routes {
        println!(
            "  {:<7} /{}",
            route.http_verb().to_string().green().bold(),
            route.complete_route()
        );
        println!(
            "          {} {}",
            route.owner_qualified_name().dimmed(),
            format!("#{}", route.handler_name()).dimmed()
        );
    }
    println!();
    println!("{} route(s)", routes.len());
    Ok(())
}
