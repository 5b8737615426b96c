use anyhow::Result;
use urd_core::config::UrdConfig;
use urd_core::source::RemindSource;

use crate::utils::editor;

pub async fn run(config: &UrdConfig, line: Option<u32>) -> Result<()> {
    let remind = RemindSource::from_config(config);
    let file = remind.primary_file()?;
    editor::launch(&config.editor, file, line).await?;
    Ok(())
}
