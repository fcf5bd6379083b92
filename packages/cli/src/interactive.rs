//! Menu-driven front end using `dialoguer`, for running reports without
//! memorizing subcommands.

use std::path::PathBuf;

use chrono::Local;
use dialoguer::{Input, Select};
use sewershed_trace::TraceMode;

use crate::commands::{self, Context};

enum Action {
    AffectedBuildings,
    AffectedManholes,
    StatusReport,
    Positivity,
    DropIn,
}

impl Action {
    const ALL: &[Self] = &[
        Self::AffectedBuildings,
        Self::AffectedManholes,
        Self::StatusReport,
        Self::Positivity,
        Self::DropIn,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::AffectedBuildings => "Trace affected buildings",
            Self::AffectedManholes => "Trace affected manholes",
            Self::StatusReport => "Manhole status report",
            Self::Positivity => "Positivity rates",
            Self::DropIn => "Export drop-in CSV",
        }
    }
}

/// Prompts for an action and its inputs, then runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected report fails.
pub fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    println!("Sewershed");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::AffectedBuildings => {
            let date = prompt_date(ctx, "Sampling date")?;
            commands::buildings(ctx, &date, prompt_mode()?)?;
        }
        Action::AffectedManholes => {
            let date = prompt_date(ctx, "Sampling date")?;
            commands::manholes(ctx, &date, prompt_mode()?)?;
        }
        Action::StatusReport => commands::status(ctx, &prompt_date(ctx, "Sampling date")?)?,
        Action::Positivity => commands::positivity(ctx, &prompt_date(ctx, "As of date")?)?,
        Action::DropIn => {
            let from = prompt_date(ctx, "First date")?;
            let to: String = Input::new()
                .with_prompt("Last date")
                .default(from.clone())
                .interact_text()?;
            let out: String = Input::new()
                .with_prompt("Output file (empty for stdout)")
                .allow_empty(true)
                .interact_text()?;
            let out = (!out.trim().is_empty()).then(|| PathBuf::from(out.trim()));
            commands::drop_in(ctx, &from, Some(&to), out.as_deref())?;
        }
    }

    Ok(())
}

/// Asks for a date label, defaulting to today in the sheet's format.
fn prompt_date(ctx: &Context, prompt: &str) -> Result<String, dialoguer::Error> {
    let today = ctx.classifier().label(Local::now().date_naive());
    Input::new()
        .with_prompt(prompt)
        .default(today)
        .interact_text()
}

fn prompt_mode() -> Result<TraceMode, dialoguer::Error> {
    let labels: Vec<String> = TraceMode::ALL.iter().map(ToString::to_string).collect();
    let idx = Select::new()
        .with_prompt("Trace mode")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(TraceMode::ALL[idx])
}
