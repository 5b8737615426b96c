use anyhow::Result;
use owo_colors::OwoColorize;
use urd_core::config::UrdConfig;
use urd_core::source::EventSource;

use super::Sources;

pub async fn run(config: &UrdConfig) -> Result<()> {
    let config_path = UrdConfig::config_path()?;
    let sources = Sources::from_config(config);

    println!("{}", "Paths".bold());
    println!("  Config:     {}", config_path.display());
    for file in sources.remind.files() {
        let missing = if file.exists() { "" } else { " (missing)" };
        println!("  Reminders:  {}{}", file.display(), missing.dimmed());
    }
    if let Some(task_file) = config.task_path() {
        println!("  Tasks:      {}", task_file.display());
    }

    println!();
    println!("{}", "Sources".bold());
    let mut reachable = 0;
    for source in sources.all.sources() {
        match source.test_connection().await {
            Ok(()) => {
                reachable += 1;
                println!("  {} {}", "ok".green(), source.name());
            }
            Err(e) => println!("  {} {}: {}", "failed".red(), source.name(), e),
        }
    }

    if reachable == 0 {
        anyhow::bail!("No source could be run");
    }
    Ok(())
}
