use chrono::NaiveDate;

use onduty::calendar::{DryRun, Mirrored, OpsgenieMirror, ScheduleStore};
use onduty::config::Config;
use onduty::error::Result;
use onduty::notifications::Urgency;
use onduty::scheduler::{Collaborators, GenerationReport, GenerationWindow, RotationEngine};

use super::{notification_manager, open_backend, today};

/// Options of the `generate` subcommand
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub start_date: Option<NaiveDate>,
    pub days: Option<u32>,
    pub last_on: Option<String>,
    pub dry_run: bool,
    pub unrestrict: bool,
    pub seed: Option<u64>,
}

/// Stack the optional Opsgenie mirror and the dry-run guard on a store
fn layered<S: ScheduleStore + 'static>(
    base: S,
    mirror: Option<OpsgenieMirror>,
    dry_run: bool,
) -> Box<dyn ScheduleStore> {
    match (mirror, dry_run) {
        (_, true) => Box::new(DryRun::new(base)),
        (Some(mirror), false) => Box::new(Mirrored::new(base, mirror)),
        (None, false) => Box::new(base),
    }
}

pub async fn generate(config: &Config, params: GenerateParams) -> Result<()> {
    let roster = config.roster()?;
    let holidays = config.holiday_calendar();
    let backend = open_backend(config).await?;

    let mirror = match &config.opsgenie {
        Some(settings) => Some(OpsgenieMirror::new(settings.clone(), config.request_timeout())?),
        None => None,
    };
    let store = layered(backend.schedule.clone(), mirror, params.dry_run);

    let start = params.start_date.unwrap_or_else(today);
    let days = params.days.filter(|d| *d > 0).unwrap_or(config.generate_days);
    let mut window = GenerationWindow::new(start, days);
    if let Some(code) = &params.last_on {
        window = window.with_last_on(code.as_str());
    }

    let mut engine = RotationEngine::new(roster, config.limits()).with_unrestrict(params.unrestrict);
    if let Some(seed) = params.seed {
        engine = engine.with_seed(seed);
    }

    println!(
        "Generating {days} days from {start}{}",
        if params.dry_run { " (dry run)" } else { "" }
    );
    println!("================================");

    let collaborators = Collaborators::new(store.as_ref(), backend.absences.as_ref(), &holidays);
    let report = engine.generate(&collaborators, &window).await?;

    print_report(&report);

    if !params.dry_run {
        notify_if_moved_up(config, &report).await?;
    }

    Ok(())
}

fn print_report(report: &GenerationReport) {
    for day in &report.days {
        println!("{day}");
    }

    println!();
    println!("Changed days: {}", report.changed_days().len());
    println!("Fixed days:   {}", report.fixed_days().len());

    let shadow = report.shadow_days();
    if !shadow.is_empty() {
        let dates: Vec<String> = shadow.iter().map(|d| d.to_string()).collect();
        println!("Nobody available on: {}", dates.join(", "));
    }
}

/// Send an emergency reminder when today's recorded assignee was replaced
async fn notify_if_moved_up(config: &Config, report: &GenerationReport) -> Result<()> {
    let today = today();
    let Some(day) = report.day(today) else {
        return Ok(());
    };
    if day.previous.is_none() || !day.changed() {
        return Ok(());
    }

    tracing::warn!(
        date = %today,
        previous = ?day.previous.as_ref().map(|a| a.code()),
        assignee = %day.assignee,
        "Today's assignee changed"
    );

    let manager = notification_manager(config)?;
    let outcome = manager.notify(&day.assignee, Urgency::Emergency, today).await;
    for failure in &outcome.failures {
        eprintln!("Error sending reminder: {failure}");
    }
    Ok(())
}
