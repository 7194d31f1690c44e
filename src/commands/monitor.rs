use std::path::Path;

use onduty::config::Config;
use onduty::error::Result;
use onduty::monitoring::{write_status_file, StatusLabels};

use super::{open_backend, today};

pub async fn monitor(config: &Config, file: &Path) -> Result<()> {
    let roster = config.roster()?;
    let backend = open_backend(config).await?;

    let today = today();
    let entry = backend.schedule.fetch_day(today).await?;
    let oncaller = entry.as_ref().map(|e| e.code.as_str());
    if oncaller.is_none() {
        tracing::warn!(date = %today, "No duty entry for today");
    }

    write_status_file(file, &roster, oncaller, &StatusLabels::current())?;
    Ok(())
}
