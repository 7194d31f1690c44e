use chrono::Days;

use onduty::config::Config;
use onduty::error::{Error, Result};
use onduty::notifications::Urgency;

use super::{notification_manager, open_backend, today};

pub async fn notify(config: &Config, urgency: Urgency) -> Result<()> {
    let roster = config.roster()?;
    let backend = open_backend(config).await?;

    let today = today();
    let date = today
        .checked_add_days(Days::new(urgency.day_offset()))
        .ok_or_else(|| Error::other("date out of range"))?;

    let Some(entry) = backend.schedule.fetch_day(date).await? else {
        tracing::warn!(date = %date, "Nobody is scheduled, no reminder sent");
        println!("Nobody is on duty {}", urgency.when());
        return Ok(());
    };

    let assignee = roster.resolve(&entry.code);
    let manager = notification_manager(config)?;
    let report = manager.notify(&assignee, urgency, today).await;

    for delivery in &report.deliveries {
        println!("{delivery}");
    }
    match report.failures.into_iter().next() {
        Some(first) => Err(first.into()),
        None => Ok(()),
    }
}
