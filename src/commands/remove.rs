use anyhow::Result;
use owo_colors::OwoColorize;
use urd_core::config::UrdConfig;
use urd_core::source::RemindSource;

pub fn run(config: &UrdConfig, line: Option<u32>, matching: Option<String>) -> Result<()> {
    let remind = RemindSource::from_config(config);
    let path = remind.primary_file()?.display().to_string();

    match (line, matching) {
        (_, Some(pattern)) => {
            let (_, line) = remind.remove_matching(&pattern)?;
            println!("{}", format!("  Removed line {line} matching '{pattern}'").green());
        }
        (Some(line), None) => {
            let removed = remind.remove_at(line)?;
            println!("{}", format!("  Removed: {}", removed.trim()).green());
        }
        (None, None) => anyhow::bail!("Give a line number or --matching <text>"),
    }
    println!("  {}", path.dimmed());
    Ok(())
}
