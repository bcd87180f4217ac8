//! Terminal rendering of plans and outcomes

use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::deploy::fsm::RunState;
use crate::deploy::outcome::{step_label, RoleStatus, RunOutcome, SkipReason};
use crate::deploy::plan::Plan;
use crate::errors::DeployerError;
use crate::topology::TopologyCatalog;

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

fn json<T: Serialize>(value: &T) -> Result<(), DeployerError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a list of names
pub fn names(title: &str, names: &[String], format: OutputFormat) -> Result<(), DeployerError> {
    if format == OutputFormat::Json {
        return json(&names);
    }
    header(title);
    if names.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for name in names {
        println!("  {}", name);
    }
    Ok(())
}

pub fn shapes(catalog: &TopologyCatalog) {
    header("Shapes");
    for shape in catalog.shapes() {
        println!("  {:<20} {}", shape.id.bold(), shape.description);

        let roles = shape
            .role_ids()
            .iter()
            .map(|role| role.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {:<20} {}", "", format!("roles: {}", roles).dimmed());

        let aliases = catalog.aliases_of(shape.id);
        if !aliases.is_empty() {
            println!("  {:<20} {}", "", format!("aliases: {}", aliases.join(", ")).dimmed());
        }
    }
}

pub fn plan(plan: &Plan, format: OutputFormat) -> Result<(), DeployerError> {
    if format == OutputFormat::Json {
        return json(plan);
    }

    header(&format!("Plan for {} (tag {})", plan.shape, plan.tag));
    for group in &plan.groups {
        println!();
        println!("{}", group.app.cyan().bold());
        for (index, operation) in group.operations.iter().enumerate() {
            println!("  {} {}", format!("[{}]", index).blue(), operation);
        }
    }
    for role in &plan.excluded {
        println!();
        println!("{} {}", role.app_name(&plan.tag).dimmed(), "(excluded)".dimmed());
    }
    println!();
    println!("{} operations in {} groups", plan.operation_count(), plan.groups.len());
    Ok(())
}

pub fn outcome(outcome: &RunOutcome, format: OutputFormat) -> Result<(), DeployerError> {
    if format == OutputFormat::Json {
        return json(outcome);
    }

    header(&format!("Run {} ({})", outcome.tag, outcome.shape));
    for role in &outcome.roles {
        let progress = format!("{}/{}", role.completed, role.total);
        match &role.status {
            RoleStatus::Succeeded => {
                println!("  {} {:<24} {}", "✓".green(), role.app, progress.dimmed());
            }
            RoleStatus::Failed {
                step, kind, error, ..
            } => {
                println!(
                    "  {} {:<24} {} {}",
                    "✗".red(),
                    role.app,
                    progress.dimmed(),
                    format!("failed at {} ({})", step_label(*step, role.total), kind).red()
                );
                println!("      {}", error.dimmed());
            }
            RoleStatus::NotAttempted { reason } => {
                let reason = match reason {
                    SkipReason::Excluded => "excluded",
                    SkipReason::Cancelled => "cancelled",
                };
                println!("  {} {:<24} {}", "-".dimmed(), role.app, reason.dimmed());
            }
        }
    }

    println!();
    let elapsed = outcome.finished_at - outcome.started_at;
    let summary = format!("{:?} in {}s", outcome.state, elapsed.num_seconds());
    match outcome.state {
        RunState::Succeeded => success(&summary),
        RunState::PartiallyFailed => {
            println!("{} {}", "⚠".yellow(), summary);
            let failed = outcome
                .failed_roles()
                .iter()
                .map(|role| role.as_str())
                .collect::<Vec<_>>()
                .join(",");
            println!(
                "  {}",
                format!("re-run with --tag {} --roles {}", outcome.tag, failed).dimmed()
            );
        }
        _ => error(&summary),
    }
    Ok(())
}
