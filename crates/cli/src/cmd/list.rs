//! Print a consumer's watch-list

use super::server_api;
use anyhow::Result;
use cli_lib::FwatchConfig;
use delivery::watchlist::fetch_watch_list;
use owo_colors::OwoColorize;

pub async fn run(config: &FwatchConfig, server: Option<String>) -> Result<()> {
    let api = server_api(config, server);
    let list = fetch_watch_list(&reqwest::Client::new(), &api).await?;

    println!("{} {}", "Watched projects".bold(), format!("({})", list.projects.len()).dimmed());
    println!("{}: {}\n", "Server".dimmed(), api.base_url().dimmed());

    if list.projects.is_empty() {
        println!("{}", "No projects registered".yellow());
        return Ok(());
    }

    for project in &list.projects {
        println!("{}  {}", project.project_id.cyan(), project.local_root);
        if !project.watch_state_id.is_empty() {
            println!("  {} {}", "watch state:".dimmed(), project.watch_state_id);
        }
        if !project.ignored_paths.is_empty() {
            println!("  {} {}", "ignored paths:".dimmed(), project.ignored_paths.join(", "));
        }
        if !project.ignored_filenames.is_empty() {
            println!("  {} {}", "ignored files:".dimmed(), project.ignored_filenames.join(", "));
        }
        for ref_path in &project.ref_paths {
            println!("  {} {} {} {}", "ref:".dimmed(), ref_path.from, "→".dimmed(), ref_path.target());
        }
    }

    Ok(())
}
