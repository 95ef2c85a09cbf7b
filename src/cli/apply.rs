//! Apply and validate commands.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::cli::{output, Connection};
use crate::core::manifest::Manifest;
use crate::core::reconcile::ChangeReport;
use crate::error::{Error, Result};

/// Converge the server on the manifest at `path`.
///
/// The manifest is parsed and validated before the token is resolved, so a
/// broken manifest never reaches the network.
pub fn execute(path: &Path, connection: &Connection, json: bool) -> Result<()> {
    let manifest = load(path)?;
    let client = connection.client()?;

    let report = manifest.apply(&client)?;
    info!(changes = report.changes().len(), "apply finished");

    if json {
        print_json(&report)
    } else {
        print_report(&report);
        Ok(())
    }
}

/// Parse and validate the manifest at `path` without contacting the server.
pub fn validate(path: &Path) -> Result<()> {
    load(path)?;
    output::success(&format!("{} is valid", path.display()));
    Ok(())
}

fn load(path: &Path) -> Result<Manifest> {
    let manifest = Manifest::load(path)?;
    manifest.validate()?;
    Ok(manifest)
}

pub(crate) fn print_json(report: &ChangeReport) -> Result<()> {
    let rendered = serde_json::to_string_pretty(report).map_err(Error::Render)?;
    println!("{}", rendered);
    Ok(())
}

fn print_report(report: &ChangeReport) {
    if !report.changed {
        output::success("already converged");
    } else {
        for change in report.changes() {
            output::change(change);
        }
        let count = report.changes().len();
        output::success(&format!(
            "converged ({} change{})",
            count,
            if count == 1 { "" } else { "s" }
        ));
    }

    if !report.outputs().is_empty() {
        output::section("Outputs");
        for (name, value) in report.outputs() {
            output::kv(name, render(value));
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
