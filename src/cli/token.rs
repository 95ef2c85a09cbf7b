//! Token command.

use serde_json::Value;

use crate::cli::apply::print_json;
use crate::cli::{output, Connection};
use crate::core::kinds::token::lookup_self;
use crate::error::Result;

const FIELDS: &[&str] = &["display_name", "policies", "ttl", "expire_time", "entity_id"];

/// Show the calling token.
pub fn execute(connection: &Connection, json: bool) -> Result<()> {
    let client = connection.client()?;
    let report = lookup_self(&client)?;

    if json {
        return print_json(&report);
    }

    match report.output("token") {
        Some(Value::Object(token)) => {
            output::header("Token");
            for field in FIELDS {
                if let Some(value) = token.get(*field).filter(|v| !v.is_null()) {
                    output::kv(field, display(value));
                }
            }
        }
        _ => output::warn("token not recognised by the server"),
    }
    Ok(())
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
