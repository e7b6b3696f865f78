//! Command implementations for the biobank CLI.
//!
//! Each command module provides:
//! - Args struct for clap argument parsing
//! - execute() function that performs the command
//! - Human-readable and JSON output formatting

pub mod events;
pub mod specimens;
pub mod users;

use anyhow::Result;
use biobank_core::{Annotation, AnnotationHolder, AnnotationTypes, Notifier, Outcome};
use colored::Colorize;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Print output in JSON or human-readable format.
pub fn output<T: Serialize + HumanReadable>(value: &T, human: bool) -> Result<()> {
    if human {
        value.print_human();
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

/// Trait for types that can be printed in human-readable format.
pub trait HumanReadable {
    fn print_human(&self);
}

/// Format a timestamp for human display.
pub fn format_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Annotation context for records whose owning configuration the CLI
/// cannot look up. Their annotations are skipped rather than failing the read.
pub fn annotation_context() -> AnnotationTypes {
    AnnotationTypes::none().ignoring_unknown()
}

/// One annotation as shown to the user.
#[derive(Debug, Serialize)]
pub struct AnnotationView {
    pub annotation_type_id: String,
    pub label: String,
    pub value: String,
    pub required: bool,
}

impl AnnotationView {
    fn from_annotation(annotation: &Annotation) -> Result<Self> {
        Ok(Self {
            annotation_type_id: annotation.annotation_type_id()?.to_string(),
            label: annotation.label()?.to_string(),
            value: annotation.get_value()?,
            required: annotation.is_required(),
        })
    }

    pub fn all<H: AnnotationHolder>(holder: &H) -> Result<Vec<Self>> {
        holder.annotations().iter().map(Self::from_annotation).collect()
    }
}

pub fn print_annotations(annotations: &[AnnotationView]) {
    if annotations.is_empty() {
        return;
    }
    println!();
    println!("{}", "Annotations:".yellow());
    for a in annotations {
        let value = if a.value.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            a.value.clone()
        };
        let marker = if a.required { "*" } else { "" };
        println!("  {}{} {}", format!("{}:", a.label).cyan(), marker, value);
    }
}

/// Reports on stderr and asks for confirmation on stdin.
pub struct ConsoleNotifier {
    assume_yes: bool,
}

impl ConsoleNotifier {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        eprintln!("{}", message.green());
    }

    fn error(&self, message: &str) {
        eprintln!("{}", message.red());
    }

    async fn confirm(&self, title: &str, message: &str) -> Outcome<()> {
        if self.assume_yes {
            return Outcome::Confirmed(());
        }

        eprintln!("{}", title.bold());
        eprint!("{} [y/N] ", message);

        let mut answer = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut answer).await {
            Ok(_) if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") => {
                Outcome::Confirmed(())
            }
            _ => Outcome::Cancelled,
        }
    }
}

/// Print the result of a confirmed action, or note the cancellation.
pub fn output_outcome<T: Serialize + HumanReadable>(outcome: Outcome<T>, human: bool) -> Result<()> {
    match outcome {
        Outcome::Confirmed(value) => output(&value, human),
        Outcome::Cancelled => {
            eprintln!("{}", "Cancelled".yellow());
            Ok(())
        }
    }
}
