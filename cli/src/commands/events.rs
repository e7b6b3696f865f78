//! EVENTS command - Show collection events with their annotations.

use anyhow::Result;
use biobank_core::{CollectionEvent, RestClient, VersionedRecord};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;

use super::{AnnotationView, HumanReadable, format_timestamp, output, print_annotations};

/// Arguments for the events command.
#[derive(Args)]
pub struct EventsArgs {
    #[command(subcommand)]
    pub command: EventsCommand,
}

#[derive(Subcommand)]
pub enum EventsCommand {
    /// Show a collection event and its annotations
    Show {
        /// Collection event ID
        id: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventView {
    pub id: Option<String>,
    pub version: u64,
    pub participant_id: String,
    pub event_type: String,
    pub visit_number: u32,
    pub time_completed: DateTime<Utc>,
    pub annotations: Vec<AnnotationView>,
}

impl HumanReadable for EventView {
    fn print_human(&self) {
        println!("{}", "Collection Event".green().bold());
        println!("{}", "=".repeat(60));
        println!();
        println!("  {} {}", "ID:".cyan(), self.id.as_deref().unwrap_or("-"));
        println!("  {} {}", "Type:".cyan(), self.event_type);
        println!("  {} {}", "Participant:".cyan(), self.participant_id);
        println!("  {} {}", "Visit:".cyan(), self.visit_number);
        println!(
            "  {} {}",
            "Completed:".cyan(),
            format_timestamp(&self.time_completed)
        );
        println!("  {} {}", "Version:".cyan(), self.version);
        print_annotations(&self.annotations);
    }
}

/// Execute the events command.
pub async fn execute<R: RestClient>(rest: &R, human: bool, args: EventsArgs) -> Result<()> {
    match args.command {
        EventsCommand::Show { id } => {
            let (event, event_type) = VersionedRecord::<CollectionEvent>::get_with_type(rest, &id).await?;
            let view = EventView {
                id: event.id.clone(),
                version: event.version,
                participant_id: event.entity.participant_id.clone(),
                event_type: event_type.entity.name.clone(),
                visit_number: event.entity.visit_number,
                time_completed: event.entity.time_completed,
                annotations: AnnotationView::all(&event)?,
            };
            output(&view, human)
        }
    }
}
