//! Subcommand implementations shared by the flag-driven and interactive
//! front ends.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use sewershed_cli_utils::MultiProgress;
use sewershed_config::AppConfig;
use sewershed_stats::PositivityStatsEngine;
use sewershed_stats_models::{BucketRates, PositivityReport};
use sewershed_trace::dropin::{DropInRow, write_drop_in};
use sewershed_trace::{AffectedReport, ModeClassifier, TraceEngine, TraceError, TraceMode};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Loaded configuration plus output settings.
pub struct Context {
    pub config: AppConfig,
    pub multi: MultiProgress,
    pub json: bool,
}

impl Context {
    #[must_use]
    pub const fn new(config: AppConfig, multi: MultiProgress, json: bool) -> Self {
        Self {
            config,
            multi,
            json,
        }
    }

    /// Date label parser in the sheet's format.
    #[must_use]
    pub fn classifier(&self) -> ModeClassifier {
        ModeClassifier::new(&self.config.measurements.layout.date_format)
    }

    fn trace_engine(&self) -> Result<TraceEngine, Box<dyn std::error::Error>> {
        let spinner = sewershed_cli_utils::spinner(&self.multi, "Loading network and sheet...");
        let engine = self.config.trace_engine();
        spinner.finish_and_clear();
        Ok(engine?)
    }

    fn stats_engine(&self) -> Result<PositivityStatsEngine, Box<dyn std::error::Error>> {
        let spinner = sewershed_cli_utils::spinner(&self.multi, "Loading metadata and sheet...");
        let engine = self.config.stats_engine();
        spinner.finish_and_clear();
        Ok(engine?)
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_report(ctx: &Context, report: &AffectedReport) -> CliResult {
    if ctx.json {
        return print_json(report);
    }
    if let Some(error) = &report.error {
        eprintln!("{error}");
        return Ok(());
    }
    if report.ids.is_empty() {
        println!("(none)");
    }
    for id in &report.ids {
        println!("{id}");
    }
    Ok(())
}

/// Prints the buildings affected on `date`.
pub fn buildings(ctx: &Context, date: &str, mode: TraceMode) -> CliResult {
    let engine = ctx.trace_engine()?;
    print_report(ctx, &engine.affected_buildings_report(date, mode))
}

/// Prints the manholes affected on `date`.
pub fn manholes(ctx: &Context, date: &str, mode: TraceMode) -> CliResult {
    let engine = ctx.trace_engine()?;
    print_report(ctx, &engine.affected_manholes_report(date, mode))
}

/// Prints the composite status of every manhole.
pub fn status(ctx: &Context, date: &str) -> CliResult {
    let engine = ctx.trace_engine()?;
    let date = engine.classifier().parse_label(date)?;
    let records = engine.multi_trace(date)?;

    if ctx.json {
        return print_json(&records);
    }

    println!("{:<16} {:<48} CQ", "MANHOLE", "STATUS");
    println!("{}", "-".repeat(72));
    for record in &records {
        println!(
            "{:<16} {:<48} {}",
            record.manhole_id,
            record.status.to_string(),
            record.measurement
        );
    }
    Ok(())
}

/// Prints single-day and rolling positivity rates.
pub fn positivity(ctx: &Context, date: &str) -> CliResult {
    let classifier = ctx.classifier();
    let date = classifier.parse_label(date)?;
    let report = ctx.stats_engine()?.rolling_average(date)?;

    if ctx.json {
        return print_json(&report);
    }

    print_positivity(&classifier, &report);
    Ok(())
}

fn print_positivity(classifier: &ModeClassifier, report: &PositivityReport) {
    println!(
        "Positivity as of {} (latest valid day {}, {} days pooled)",
        classifier.label(report.requested_date),
        classifier.label(report.latest_valid_date),
        report.days_used.len()
    );
    println!();
    println!("{:<18} {:>10} {:>10}", "", "DAY", "7-DAY");

    let row = |name: &str, rates: &BucketRates| {
        println!(
            "{name:<18} {:>10} {:>10}",
            rates.single_day.to_string(),
            rates.seven_day.to_string()
        );
    };
    row("Residential", &report.residential);
    row("Non-residential", &report.non_residential);
    row("Total", &report.total);
}

/// Exports drop-in rows for every valid date in `from..=to`.
///
/// Dates without data are skipped with a warning. Any other failure aborts
/// the export.
pub fn drop_in(ctx: &Context, from: &str, to: Option<&str>, out: Option<&Path>) -> CliResult {
    let engine = ctx.trace_engine()?;
    let from = engine.classifier().parse_label(from)?;
    let to = to
        .map(|label| engine.classifier().parse_label(label))
        .transpose()?
        .unwrap_or(from);

    if to < from {
        return Err(format!(
            "Range end {} is before start {}",
            engine.classifier().label(to),
            engine.classifier().label(from)
        )
        .into());
    }

    let dates: Vec<NaiveDate> = from.iter_days().take_while(|d| *d <= to).collect();
    let rows = collect_drop_in(ctx, &engine, &dates)?;

    match out {
        Some(path) => {
            write_drop_in(&rows, File::create(path)?)?;
            log::info!("Wrote {} rows to {}", rows.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            write_drop_in(&rows, &mut stdout)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn collect_drop_in(
    ctx: &Context,
    engine: &TraceEngine,
    dates: &[NaiveDate],
) -> Result<Vec<DropInRow>, TraceError> {
    let bar = sewershed_cli_utils::steps_bar(
        &ctx.multi,
        "Exporting dates",
        u64::try_from(dates.len()).unwrap_or(u64::MAX),
    );
    let mut rows = Vec::new();
    let mut skipped = 0_usize;

    for date in dates {
        bar.set_message(engine.classifier().label(*date));
        match engine.drop_in(*date) {
            Ok(day_rows) => rows.extend(day_rows),
            Err(TraceError::InvalidDate(e)) => {
                log::warn!("Skipping {}: no measurements", e.date);
                skipped += 1;
            }
            Err(e) => {
                bar.abandon();
                return Err(e);
            }
        }
        bar.inc(1);
    }

    bar.finish_and_clear();
    log::info!(
        "Exported {} dates ({skipped} skipped), {} rows",
        dates.len() - skipped,
        rows.len()
    );
    Ok(rows)
}
