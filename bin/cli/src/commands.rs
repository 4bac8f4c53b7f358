//! The `postflow` subcommands.
//!
//! Every command reads its inputs from files and writes its report to the
//! given writer, so the binary and the tests share one code path.

use crate::config::CliConfig;
use crate::error::CliError;
use clap::Subcommand;
use postflow_automation::{
    Automation, AutomationError, AutomationService, AutomationStore, InMemoryAutomationStore,
    RecordingDispatcher, record,
};
use postflow_compliance::{ComplianceGate, InMemoryConsentStore};
use postflow_core::{ConsentSet, Result};
use postflow_workflow::{CatalogEntry, NodeCatalog, validate_for_save};
use rootcause::Report;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the built-in node catalog as JSON.
    Catalog,

    /// Report save-time validation issues in an automation record.
    Validate {
        /// Path to the automation record (JSON).
        #[arg(value_name = "RECORD")]
        record: PathBuf,
    },

    /// Evaluate an automation record against an account's consents.
    Check {
        #[arg(value_name = "RECORD")]
        record: PathBuf,

        /// Path to the consent set, e.g. `{ "x": ["explicit_consent"] }`.
        #[arg(long, value_name = "FILE")]
        consents: PathBuf,
    },

    /// Dry-run activation and print the updated record.
    Activate {
        #[arg(value_name = "RECORD")]
        record: PathBuf,

        #[arg(long, value_name = "FILE")]
        consents: PathBuf,

        /// Write the activated record here instead of stdout.
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to report.
    Clean,
    /// The input was read but has issues, violations, or was rejected.
    Issues,
}

/// Runs one command against `out`.
///
/// # Errors
///
/// Returns an error when inputs cannot be read or decoded, or output cannot
/// be written. Problems with the automation itself are an [`Outcome::Issues`].
pub async fn run(command: Command, config: &CliConfig, out: &mut impl Write) -> Result<Outcome, CliError> {
    match command {
        Command::Catalog => catalog(out),
        Command::Validate { record } => validate(&record, out),
        Command::Check { record, consents } => check(&record, &consents, config, out),
        Command::Activate {
            record,
            consents,
            output,
        } => activate(&record, &consents, output.as_deref(), config, out).await,
    }
}

fn catalog(out: &mut impl Write) -> Result<Outcome, CliError> {
    let entries: Vec<&CatalogEntry> = NodeCatalog::builtin().entries().collect();
    let json = serde_json::to_string_pretty(&entries)
        .map_err(|e| Report::new(e).context(CliError::WriteOutput))?;
    emit(out, &json)?;
    Ok(Outcome::Clean)
}

fn validate(path: &Path, out: &mut impl Write) -> Result<Outcome, CliError> {
    let automation = load_record(path)?;
    match validate_for_save(automation.graph()) {
        Ok(()) => {
            emit(out, &format!("{}: no issues", automation.name()))?;
            Ok(Outcome::Clean)
        }
        Err(issues) => {
            for issue in &issues {
                emit(out, &issue.to_string())?;
            }
            Ok(Outcome::Issues)
        }
    }
}

fn check(record: &Path, consents: &Path, config: &CliConfig, out: &mut impl Write) -> Result<Outcome, CliError> {
    let automation = load_record(record)?;
    let consents = load_consents(consents)?;
    let gate = ComplianceGate::new(config.compliance.clone());

    match gate.evaluate(automation.graph(), &consents) {
        Ok(()) => {
            emit(out, &format!("{}: compliant", automation.name()))?;
            Ok(Outcome::Clean)
        }
        Err(violations) => {
            for violation in &violations {
                emit(out, &violation.to_string())?;
            }
            Ok(Outcome::Issues)
        }
    }
}

async fn activate(
    record_path: &Path,
    consents_path: &Path,
    output: Option<&Path>,
    config: &CliConfig,
    out: &mut impl Write,
) -> Result<Outcome, CliError> {
    let automation = load_record(record_path)?;
    let consents = load_consents(consents_path)?;
    let automation_id = automation.id();

    let store = Arc::new(InMemoryAutomationStore::new());
    store
        .insert(&automation)
        .await
        .map_err(|e| Report::new(e).context(CliError::DryRun { automation_id }))?;
    let consent_store = Arc::new(InMemoryConsentStore::new());
    consent_store.set(automation.account_id(), consents);
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let service = AutomationService::new(store, consent_store, dispatcher.clone(), config.compliance.clone());

    let activated = match service.activate(automation_id, automation.version()).await {
        Ok(activated) => activated,
        Err(err) => {
            if let AutomationError::Lifecycle(rejection) = err.current_context() {
                warn!(%automation_id, "dry-run activation rejected");
                emit(out, &format!("activation rejected: {rejection}"))?;
                return Ok(Outcome::Issues);
            }
            return Err(err.context(CliError::DryRun { automation_id }));
        }
    };
    debug!(events = dispatcher.events().len(), "dispatcher notified");

    let json = record::serialize(&activated)
        .map_err(|e| Report::new(e).context(CliError::DryRun { automation_id }))?;
    match output {
        Some(path) => {
            fs::write(path, json).map_err(|e| Report::new(e).context(CliError::WriteOutput))?;
            info!(%automation_id, path = %path.display(), "activated record written");
            emit(out, &format!("activated {automation_id}; record written to {}", path.display()))?;
        }
        None => emit(out, &json)?,
    }
    Ok(Outcome::Clean)
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|e| {
        Report::new(e).context(CliError::ReadInput {
            path: path.to_path_buf(),
        })
    })
}

fn load_record(path: &Path) -> Result<Automation, CliError> {
    let json = read(path)?;
    let automation = record::deserialize(&json).map_err(|e| {
        Report::new(e).context(CliError::InvalidRecord {
            path: path.to_path_buf(),
        })
    })?;
    debug!(automation_id = %automation.id(), status = %automation.status(), "record loaded");
    Ok(automation)
}

fn load_consents(path: &Path) -> Result<ConsentSet, CliError> {
    let json = read(path)?;
    serde_json::from_str(&json).map_err(|e| {
        Report::new(e).context(CliError::InvalidConsents {
            path: path.to_path_buf(),
        })
    })
}

fn emit(out: &mut impl Write, text: &str) -> Result<(), CliError> {
    writeln!(out, "{text}").map_err(|e| Report::new(e).context(CliError::WriteOutput))
}
