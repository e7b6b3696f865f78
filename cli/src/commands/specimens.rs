//! SPECIMENS command - Show specimens and mark them usable or unusable.

use anyhow::Result;
use biobank_core::{RestClient, Specimen, SpecimenState, VersionedRecord, confirm_then};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;

use super::{ConsoleNotifier, HumanReadable, annotation_context, format_timestamp, output, output_outcome};

/// Arguments for the specimens command.
#[derive(Args)]
pub struct SpecimensArgs {
    #[command(subcommand)]
    pub command: SpecimensCommand,
}

#[derive(Subcommand)]
pub enum SpecimensCommand {
    /// Show one specimen
    Show {
        /// Specimen ID
        id: String,
    },

    /// Mark an unusable specimen usable
    Usable(StateArgs),

    /// Mark a usable specimen unusable
    Unusable(StateArgs),
}

#[derive(Args)]
pub struct StateArgs {
    /// Specimen ID
    pub id: String,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Serialize)]
pub struct SpecimenView {
    pub id: Option<String>,
    pub version: u64,
    pub inventory_id: String,
    pub location_id: String,
    pub amount: f64,
    pub state: SpecimenState,
    pub time_created: DateTime<Utc>,
}

impl From<&VersionedRecord<Specimen>> for SpecimenView {
    fn from(specimen: &VersionedRecord<Specimen>) -> Self {
        Self {
            id: specimen.id.clone(),
            version: specimen.version,
            inventory_id: specimen.entity.inventory_id.clone(),
            location_id: specimen.entity.location_id.clone(),
            amount: specimen.entity.amount,
            state: specimen.entity.state,
            time_created: specimen.entity.time_created,
        }
    }
}

impl HumanReadable for SpecimenView {
    fn print_human(&self) {
        let state = match self.state {
            SpecimenState::Usable => self.state.to_string().green(),
            SpecimenState::Unusable => self.state.to_string().red(),
        };

        println!("{}", "Specimen".green().bold());
        println!("{}", "=".repeat(60));
        println!();
        println!("  {} {}", "ID:".cyan(), self.id.as_deref().unwrap_or("-"));
        println!("  {} {}", "Inventory ID:".cyan(), self.inventory_id);
        println!("  {} {}", "Location:".cyan(), self.location_id);
        println!("  {} {}", "Amount:".cyan(), self.amount);
        println!("  {} {}", "State:".cyan(), state);
        println!("  {} {}", "Created:".cyan(), format_timestamp(&self.time_created));
        println!("  {} {}", "Version:".cyan(), self.version);
    }
}

/// Execute the specimens command.
pub async fn execute<R: RestClient>(rest: &R, human: bool, args: SpecimensArgs) -> Result<()> {
    match args.command {
        SpecimensCommand::Show { id } => {
            let specimen = VersionedRecord::<Specimen>::get(rest, &id, &annotation_context()).await?;
            output(&SpecimenView::from(&specimen), human)
        }
        SpecimensCommand::Usable(args) => set_state(rest, human, args, SpecimenState::Usable).await,
        SpecimensCommand::Unusable(args) => set_state(rest, human, args, SpecimenState::Unusable).await,
    }
}

async fn set_state<R: RestClient>(rest: &R, human: bool, args: StateArgs, target: SpecimenState) -> Result<()> {
    let specimen = VersionedRecord::<Specimen>::get(rest, &args.id, &annotation_context()).await?;
    match target {
        SpecimenState::Usable => specimen.entity.check_make_usable()?,
        SpecimenState::Unusable => specimen.entity.check_make_unusable()?,
    }

    let notifier = ConsoleNotifier::new(args.yes);
    let title = format!("Make specimen {}", target.to_string().to_lowercase());
    let message = format!(
        "Specimen {} is {}. Continue?",
        specimen.entity.inventory_id, specimen.entity.state
    );
    let done = format!("Specimen is now {}", target.to_string().to_lowercase());

    let outcome = confirm_then(&notifier, &title, &message, &done, || async {
        match target {
            SpecimenState::Usable => specimen.make_usable(rest).await,
            SpecimenState::Unusable => specimen.make_unusable(rest).await,
        }
    })
    .await?;

    output_outcome(outcome.map(|updated| SpecimenView::from(&updated)), human)
}
