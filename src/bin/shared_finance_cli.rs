use std::{
    env,
    sync::{Arc, Mutex},
};

use colored::Colorize;
use shared_finance::{
    config::ConfigManager,
    ledger::{summarize, GeneratedTransaction},
    scheduler::{Presentation, TimerSettings},
    storage::{JsonStorage, StateStore},
    AppState, FinanceError, RecurrenceScheduler, Result, SweepTimer,
};

const USAGE: &str = "usage: shared_finance_cli [sweep|upcoming|summary|run|help]";

/// Prints a one-line notice whenever the scheduler mutates the state.
struct ConsolePresentation;

impl Presentation for ConsolePresentation {
    fn refresh(&self, state: &AppState) {
        let message = format!(
            "state updated: {} people, {} recurring rules",
            state.ledger.people.len(),
            state.recurring.len()
        );
        println!("{}", message.dimmed());
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {err}", "Error:".red().bold());
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let command = env::args().nth(1).unwrap_or_else(|| "sweep".into());
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        println!("{USAGE}");
        return Ok(());
    }

    let manager = ConfigManager::new()?;
    let config = manager.load()?;
    shared_finance::init_with(&config.log_filter);

    let storage = Arc::new(JsonStorage::new(
        manager.data_dir(&config),
        Some(config.backup_retention),
    )?);
    let state = storage.load()?.unwrap_or_default();
    let scheduler = RecurrenceScheduler::new(Arc::new(Mutex::new(state)), storage)
        .with_presentation(Arc::new(ConsolePresentation));

    match command.as_str() {
        "sweep" => print_applied(&scheduler.sweep_now()),
        "upcoming" => print_upcoming(&scheduler),
        "summary" => print_summary(&scheduler),
        "run" => run_timer(scheduler, TimerSettings::from(&config))?,
        other => {
            return Err(FinanceError::InvalidInput(format!(
                "unknown command `{other}`\n{USAGE}"
            )))
        }
    }
    Ok(())
}

fn print_applied(applied: &[shared_finance::AppliedOccurrence]) {
    if applied.is_empty() {
        println!("{}", "No recurring transactions were due.".dimmed());
        return;
    }
    for occurrence in applied {
        let amount = occurrence.transaction.amount();
        let (label, amount) = match occurrence.transaction {
            GeneratedTransaction::Income(_) => ("income", format!("+{:.2}", amount).green()),
            GeneratedTransaction::Expense(_) => ("expense", format!("-{:.2}", amount).red()),
        };
        println!(
            "{} {} {} for {} (due {})",
            "applied".bold(),
            label,
            amount,
            occurrence.payer_id,
            occurrence.scheduled_for
        );
    }
}

fn print_upcoming(scheduler: &RecurrenceScheduler) {
    let upcoming = scheduler.upcoming();
    if upcoming.is_empty() {
        println!("{}", "No active recurring rules.".dimmed());
        return;
    }
    for item in upcoming {
        let mode = if item.auto_apply { "auto" } else { "manual" };
        println!("{}  {:<6} {}", item.next_date, mode, item.description);
    }
}

fn print_summary(scheduler: &RecurrenceScheduler) {
    let shared = scheduler.state();
    let state = shared.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    for person in summarize(&state.ledger) {
        let balance = person.balance();
        let formatted = format!("{:.2}", balance);
        let styled = if balance < 0.0 {
            formatted.red()
        } else {
            formatted.green()
        };
        println!("{:<20} {}", person.name, styled);
    }
}

fn run_timer(scheduler: RecurrenceScheduler, settings: TimerSettings) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let timer = SweepTimer::start(Arc::new(scheduler), settings);
        println!("Sweeping recurring rules; press Ctrl+C to stop.");
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl+C");
        }
        timer.stop().await;
    });
    Ok(())
}
