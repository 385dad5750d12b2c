mod cli;
mod config;
mod db;
mod error;
mod export;
mod metrics;
mod report;
mod timer;

use crate::cli::{Cli, Commands, ConfigCommands, GoalCommands};
use crate::config::Config;
use crate::db::{EntryFilter, EntryPatch, Goal, NewEntry, Store};
use crate::error::minutes_between;
use crate::report::GroupBy;
use crate::timer::{SessionMeta, StopOutcome, TimerPhase};
use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            category,
            topic,
            notes,
        } => handle_start(category, topic, notes),
        Commands::Pause => handle_pause(),
        Commands::Resume => handle_resume(),
        Commands::Stop => handle_stop(),
        Commands::Cancel => handle_cancel(),
        Commands::Status => handle_status(),
        Commands::Add {
            start,
            end,
            category,
            topic,
            notes,
        } => handle_add(start, end, category, topic, notes),
        Commands::Edit {
            id,
            start,
            end,
            category,
            topic,
            notes,
        } => handle_edit(id, start, end, category, topic, notes),
        Commands::Delete { id } => handle_delete(id),
        Commands::List {
            from,
            to,
            categories,
        } => handle_list(from, to, categories),
        Commands::Report {
            from,
            to,
            categories,
            group_by,
        } => handle_report(from, to, categories, group_by.into()),
        Commands::Dashboard => handle_dashboard(),
        Commands::Goal { command } => handle_goal_command(command),
        Commands::Export {
            from,
            to,
            categories,
            output,
        } => handle_export(from, to, categories, output),
        Commands::Config { command } => handle_config_command(command),
    }
}

fn handle_start(
    category: Option<String>,
    topic: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;
    let mut timer = store.load_timer()?;

    let meta = SessionMeta {
        category: config.category_or_default(category.as_deref()),
        topic,
        notes,
    };
    let now = Local::now().naive_local();
    timer.start(now, meta)?;
    store.save_timer(&timer)?;

    let meta = timer.meta();
    match &meta.topic {
        Some(topic) => println!(
            "Started: {} - {topic} at {}",
            meta.category,
            now.format("%H:%M:%S")
        ),
        None => println!("Started: {} at {}", meta.category, now.format("%H:%M:%S")),
    }

    Ok(())
}

fn handle_pause() -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;
    let mut timer = store.load_timer()?;

    let now = Local::now().naive_local();
    timer.pause(now)?;
    store.save_timer(&timer)?;

    if let Some(elapsed) = timer.elapsed(now) {
        println!("Paused at {}", format_elapsed(elapsed));
    }

    Ok(())
}

fn handle_resume() -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;
    let mut timer = store.load_timer()?;

    let now = Local::now().naive_local();
    timer.resume(now)?;
    store.save_timer(&timer)?;

    if let Some(elapsed) = timer.elapsed(now) {
        println!("Resumed at {}", format_elapsed(elapsed));
    }

    Ok(())
}

fn handle_stop() -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;
    let mut timer = store.load_timer()?;

    let outcome = timer.stop(Local::now().naive_local())?;
    match outcome {
        StopOutcome::Saved(entry) => {
            let id = store.insert_entry(&entry)?;
            store.clear_timer()?;
            println!(
                "Saved entry {id}: {} for {}",
                entry.category,
                format_minutes(entry.duration_minutes)
            );
        }
        StopOutcome::Discarded => {
            store.clear_timer()?;
            println!("Session too short, discarded (nothing saved).");
        }
    }

    Ok(())
}

fn handle_cancel() -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;
    let mut timer = store.load_timer()?;

    timer.cancel();
    store.clear_timer()?;
    println!("Timer cancelled.");

    Ok(())
}

fn handle_status() -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;
    let timer = store.load_timer()?;

    if timer.phase() == TimerPhase::Idle {
        println!("No active session.");
        return Ok(());
    }

    let now = Local::now().naive_local();
    let meta = timer.meta();
    println!("Session: {} ({})", meta.category, timer.phase());
    if let Some(topic) = &meta.topic {
        println!("Topic: {topic}");
    }
    if let Some(started_at) = timer.started_at() {
        println!("Started at: {}", started_at.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(elapsed) = timer.elapsed(now) {
        println!("Elapsed: {}", format_elapsed(elapsed));
    }

    Ok(())
}

fn handle_add(
    start: String,
    end: String,
    category: Option<String>,
    topic: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;

    let start = parse_datetime(&start)?;
    let end = parse_datetime(&end)?;
    let entry = NewEntry {
        start,
        end,
        duration_minutes: minutes_between(start, end),
        category: config.category_or_default(category.as_deref()),
        topic,
        notes,
    };

    let id = store.insert_entry(&entry)?;
    println!(
        "Added entry {id}: {} for {}",
        entry.category,
        format_minutes(entry.duration_minutes)
    );

    Ok(())
}

fn handle_edit(
    id: i64,
    start: Option<String>,
    end: Option<String>,
    category: Option<String>,
    topic: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;

    let patch = EntryPatch {
        start: start.as_deref().map(parse_datetime).transpose()?,
        end: end.as_deref().map(parse_datetime).transpose()?,
        category,
        topic,
        notes,
    };

    let updated = store.update_entry(id, &patch)?;
    println!(
        "Updated entry {id}: {} {} .. {} ({})",
        updated.category,
        updated.start.format("%Y-%m-%d %H:%M"),
        updated.end.format("%Y-%m-%d %H:%M"),
        format_minutes(updated.duration_minutes)
    );

    Ok(())
}

fn handle_delete(id: i64) -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;

    store.delete_entry(id)?;
    println!("Deleted entry {id}.");

    Ok(())
}

fn handle_list(from: Option<String>, to: Option<String>, categories: Vec<String>) -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;

    let filter = build_filter(from, to, categories)?;
    let entries = store.entries_filtered(&filter)?;

    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{:>5}  {}  {}  {:>8}  {}{}",
            entry.id,
            entry.start.format("%Y-%m-%d %H:%M"),
            entry.end.format("%Y-%m-%d %H:%M"),
            format_minutes(entry.duration_minutes),
            entry.category,
            entry
                .topic
                .as_deref()
                .map(|topic| format!(" | {topic}"))
                .unwrap_or_default()
        );
    }

    Ok(())
}

fn handle_report(
    from: Option<String>,
    to: Option<String>,
    categories: Vec<String>,
    group_by: GroupBy,
) -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;

    let filter = build_filter(from, to, categories)?;
    let today = Local::now().date_naive();
    let report = report::build_report(&store, &filter, group_by, today)?;

    println!("Summary");
    if report.rows.is_empty() {
        println!("  (no entries in range)");
    }
    for row in &report.rows {
        println!("  {}  {}", row.key, format_minutes(row.minutes));
    }

    println!();
    print_streaks(&report.streaks);
    print_goal_progress(&report.goal_progress);

    Ok(())
}

fn handle_dashboard() -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;

    let today = Local::now().date_naive();
    let dashboard = report::build_dashboard(&store, today)?;

    println!(
        "Today's time: {} (goal {}, {:.0}%)",
        format_minutes(dashboard.today_minutes),
        format_minutes(dashboard.daily_goal_minutes),
        dashboard.daily_goal_progress * 100.0
    );
    print_streaks(&dashboard.streaks);
    print_goal_progress(&dashboard.goal_progress);

    Ok(())
}

fn handle_goal_command(command: GoalCommands) -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;

    match command {
        GoalCommands::Set {
            category,
            daily,
            weekly,
            monthly,
            priority,
        } => {
            let goal = Goal {
                category,
                daily_goal_minutes: daily,
                weekly_goal_minutes: weekly,
                monthly_goal_minutes: monthly,
                priority,
            };
            store.upsert_goal(&goal)?;
            println!("Goal saved for {}.", goal.category);
        }
        GoalCommands::List => {
            let goals = store.goals()?;
            if goals.is_empty() {
                println!("No goals configured.");
                return Ok(());
            }
            for goal in goals {
                println!(
                    "{}: daily {}, weekly {}, monthly {} (priority {})",
                    goal.category,
                    format_minutes(goal.daily_goal_minutes),
                    format_minutes(goal.weekly_goal_minutes),
                    format_minutes(goal.monthly_goal_minutes),
                    goal.priority
                );
            }
        }
    }

    Ok(())
}

fn handle_export(
    from: Option<String>,
    to: Option<String>,
    categories: Vec<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;

    let filter = build_filter(from, to, categories)?;
    let entries = store.entries_filtered(&filter)?;
    if entries.is_empty() {
        println!("No data to export.");
        return Ok(());
    }

    let today = Local::now().date_naive();
    let path = output.unwrap_or_else(|| export::default_export_path(&config.export_dir, today));
    export::export_to_file(&entries, &path)?;

    println!("Exported {} entries to {}", entries.len(), path.display());

    Ok(())
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}

fn open_store(config: &Config) -> Result<Store> {
    debug!(path = %config.db_path.display(), "opening store");
    Store::open(&config.db_path)
}

fn build_filter(
    from: Option<String>,
    to: Option<String>,
    categories: Vec<String>,
) -> Result<EntryFilter> {
    Ok(EntryFilter {
        from: from.as_deref().map(parse_date).transpose()?,
        to: to.as_deref().map(parse_date).transpose()?,
        categories: (!categories.is_empty()).then_some(categories),
    })
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {input}. Example: 2026-03-10"))
}

fn parse_datetime(input: &str) -> Result<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];

    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .with_context(|| {
            format!("Invalid timestamp format: {input}. Example: 2026-03-10 09:00")
        })
}

fn print_streaks(streaks: &report::Streaks) {
    println!("Daily streak: {} days", streaks.daily);
    println!("Weekly streak: {} weeks", streaks.weekly);
    println!("Monthly streak: {} months", streaks.monthly);
}

fn print_goal_progress(rows: &[report::GoalProgressRow]) {
    if rows.is_empty() {
        return;
    }

    println!("Goal progress");
    for row in rows {
        println!(
            "  {}: day {}/{} ({:.0}%), week {}/{} ({:.0}%), month {}/{} ({:.0}%)",
            row.category,
            format_minutes(row.daily_minutes),
            format_minutes(row.daily_goal_minutes),
            row.daily_progress * 100.0,
            format_minutes(row.weekly_minutes),
            format_minutes(row.weekly_goal_minutes),
            row.weekly_progress * 100.0,
            format_minutes(row.monthly_minutes),
            format_minutes(row.monthly_goal_minutes),
            row.monthly_progress * 100.0
        );
    }
}

fn format_minutes(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as i64;
    format!("{}h {}m", total / 60, total % 60)
}

fn format_elapsed(elapsed: Duration) -> String {
    let total_seconds = elapsed.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{hours}h {minutes}m {seconds}s")
}
