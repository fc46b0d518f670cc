//! Terminal output for CLI handlers.
//!
//! Human-readable by default; with `--json` every line is a JSON object of
//! the form `{"type": ..., "payload": ...}` so the output can be scripted.

use std::fmt::Display;
use std::sync::OnceLock;

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;

/// Output settings from the global CLI flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
}

static OUTPUT_CONFIG: OnceLock<OutputConfig> = OnceLock::new();

fn config() -> OutputConfig {
    OUTPUT_CONFIG.get().copied().unwrap_or_default()
}

fn emit_json_line(kind: &str, payload: serde_json::Value) {
    println!("{}", json!({ "type": kind, "payload": payload }));
}

/// Apply output settings. Only the first call takes effect.
pub fn configure(config: OutputConfig) {
    let _ = OUTPUT_CONFIG.set(config);
}

#[must_use]
pub fn is_json() -> bool {
    config().json
}

fn suppressed(config: OutputConfig) -> bool {
    !config.json && config.quiet
}

/// Print a section header.
pub fn section(title: &str) {
    let config = config();
    if config.json {
        emit_json_line("section", json!({ "title": title }));
        return;
    }
    if suppressed(config) {
        return;
    }
    println!();
    println!("{}", title.bold());
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let config = config();
    let value = value.to_string();
    if config.json {
        emit_json_line("field", json!({ "label": label, "value": value }));
        return;
    }
    if suppressed(config) {
        return;
    }
    println!("  {:<14} {}", label.dimmed(), value);
}

pub fn success(message: &str) {
    let config = config();
    if config.json {
        emit_json_line("success", json!({ "message": message }));
        return;
    }
    if suppressed(config) {
        return;
    }
    println!("  {} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    if config().json {
        emit_json_line("warning", json!({ "message": message }));
        return;
    }
    println!("  {} {}", "⚠".yellow(), message);
}

/// Print an error line to stderr.
pub fn error(message: &str) {
    if config().json {
        eprintln!(
            "{}",
            json!({ "type": "error", "payload": { "message": message } })
        );
        return;
    }
    eprintln!("  {} {}", "×".red(), message);
}

pub fn note(message: &str) {
    let config = config();
    if config.json {
        emit_json_line("note", json!({ "message": message }));
        return;
    }
    if suppressed(config) {
        return;
    }
    println!("  {}", message.dimmed());
}

/// Emit a serializable value as one JSON line of the given type.
pub fn record<T: Serialize>(kind: &str, value: &T) {
    match serde_json::to_value(value) {
        Ok(payload) => emit_json_line(kind, payload),
        Err(e) => error(&format!("failed to serialize {kind}: {e}")),
    }
}
