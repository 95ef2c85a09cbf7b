//! Shared CLI output helpers for consistent terminal output.
//!
//! Color scheme (respects NO_COLOR):
//! - Green: created, success
//! - Yellow: updated, recreated
//! - Red: deleted, errors
//! - Cyan: hints, resource keys
//! - Bold: headers
//! - Dimmed: secondary info
//!
//! Reports go to stdout, errors and hints to stderr.

use std::fmt::Display;

use console::{style, StyledObject};

use crate::core::reconcile::{Action, Change};

const RULE_WIDTH: usize = 56;

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

fn paint<D>(value: D, f: impl FnOnce(StyledObject<D>) -> StyledObject<D>) -> StyledObject<D> {
    let styled = style(value);
    if colors_enabled() {
        f(styled)
    } else {
        styled.force_styling(false)
    }
}

/// Print a success message with checkmark.
///
/// Example: `✓ converged (3 changes)`
pub fn success(msg: &str) {
    println!("{} {}", paint("✓", |s| s.green()), msg);
}

/// Print an error message to stderr.
///
/// Example: `✗ no vault token`
pub fn error(msg: &str) {
    eprintln!("{} {}", paint("✗", |s| s.red().for_stderr()), msg);
}

/// Print a warning message.
pub fn warn(msg: &str) {
    println!("{} {}", paint("⚠", |s| s.yellow()), msg);
}

/// Print a hint message to stderr.
///
/// Example: `→ set VAULT_TOKEN or run: vault login`
pub fn hint(msg: &str) {
    eprintln!(
        "{} {}",
        paint("→", |s| s.cyan().for_stderr()),
        paint(msg, |s| s.cyan().for_stderr())
    );
}

/// Print a bold section header.
pub fn header(title: &str) {
    println!("{}", paint(title, |s| s.bold()));
}

/// Print a key-value pair (label dimmed, value bold).
///
/// Example: `  display_name  root`
pub fn kv(label: &str, value: impl Display) {
    println!(
        "  {}  {}",
        paint(label, |s| s.dim()),
        paint(value.to_string(), |s| s.bold())
    );
}

/// Print a horizontal rule separator.
pub fn rule() {
    println!("{}", paint("─".repeat(RULE_WIDTH), |s| s.dim()));
}

/// Print a dimmed/secondary message.
pub fn dimmed(msg: &str) {
    println!("{}", paint(msg, |s| s.dim()));
}

/// Print a section header with a separator line.
pub fn section(title: &str) {
    println!();
    header(title);
    rule();
}

/// Marker shown next to an applied change.
fn marker(action: Action) -> StyledObject<&'static str> {
    match action {
        Action::Created => paint("+", |s| s.green()),
        Action::Updated => paint("~", |s| s.yellow()),
        Action::Recreated => paint("±", |s| s.yellow()),
        Action::Deleted => paint("-", |s| s.red()),
        Action::Unchanged => paint("=", |s| s.dim()),
    }
}

/// Print one applied change.
///
/// Example: `  + policy ops (created)`
pub fn change(change: &Change) {
    println!(
        "  {} {} {} {}",
        marker(change.action),
        change.kind,
        paint(change.key.as_str(), |s| s.cyan()),
        paint(format!("({})", change.action), |s| s.dim())
    );
}
