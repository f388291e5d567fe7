//! Shared output layer for pretty/text/JSON parity across all `hd` commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: pretty output for humans, tab-separated text for pipes, or
//! stable JSON.
//!
//! The mode itself is resolved in `helpdesk_core::config` (flag, then
//! `FORMAT`, then `config.toml`, then TTY detection) and mapped here with
//! [`OutputMode::from_resolved`].

use helpdesk_core::config::ConfigError;
use helpdesk_core::error::{ErrorCode, StorageError};
use serde::Serialize;
use std::io::{self, Write};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-optimized output (sections, aligned fields).
    Pretty,
    /// Tab-separated rows with a header line.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Map a resolved mode name (`pretty`, `text`, `json`) to a mode.
    /// Anything unrecognized is treated as pretty.
    pub fn from_resolved(name: &str) -> Self {
        match name {
            "json" => Self::Json,
            "text" => Self::Text,
            _ => Self::Pretty,
        }
    }
}

/// Trait implemented by any CLI result type that can be rendered in all modes.
pub trait Renderable {
    /// Render for human consumption.
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()>;

    /// Render as a self-contained JSON value.
    fn render_json(&self, w: &mut dyn Write) -> io::Result<()>;

    /// Render as a single text row, in [`Renderable::table_headers`] order.
    fn render_table(&self, w: &mut dyn Write) -> io::Result<()>;

    /// Column headers for text mode. Default: none.
    fn table_headers() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[]
    }
}

/// Render a single [`Renderable`] item to stdout using the given output mode.
pub fn render_item<R: Renderable>(item: &R, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_item(&mut out, item, mode)
}

fn write_item<R: Renderable>(out: &mut dyn Write, item: &R, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Pretty => item.render_human(out),
        OutputMode::Text => {
            let headers = R::table_headers();
            if !headers.is_empty() {
                writeln!(out, "{}", headers.join("\t"))?;
            }
            item.render_table(out)
        }
        OutputMode::Json => {
            item.render_json(out)?;
            writeln!(out)
        }
    }
}

/// Render a list of [`Renderable`] items to stdout.
///
/// - In JSON mode, wraps items in a JSON array.
/// - In text mode, prints the header row once, then one row per item.
/// - In pretty mode, renders items sequentially, or `empty_note` when there
///   are none.
pub fn render_list<R: Renderable>(items: &[R], mode: OutputMode, empty_note: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_list(&mut out, items, mode, empty_note)
}

fn write_list<R: Renderable>(
    out: &mut dyn Write,
    items: &[R],
    mode: OutputMode,
    empty_note: &str,
) -> io::Result<()> {
    match mode {
        OutputMode::Pretty => {
            if items.is_empty() {
                writeln!(out, "{empty_note}")?;
            }
            for item in items {
                item.render_human(out)?;
            }
        }
        OutputMode::Text => {
            let headers = R::table_headers();
            if !items.is_empty() && !headers.is_empty() {
                writeln!(out, "{}", headers.join("\t"))?;
            }
            for item in items {
                item.render_table(out)?;
            }
        }
        OutputMode::Json => {
            write!(out, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(out, ",")?;
                }
                writeln!(out)?;
                let mut buf = Vec::new();
                item.render_json(&mut buf)?;
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                out.write_all(&buf)?;
            }
            writeln!(out, "\n]")?;
        }
    }
    Ok(())
}

/// Render a serializable value with explicit pretty/text renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (e.g. "E2001").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Catalog summary for `error_code`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

impl CliError {
    /// Create an error with a suggestion and error code.
    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
            kind: None,
        }
    }

    /// Build from a catalog code, using its hint as the suggestion.
    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
            kind: Some(code.message()),
        }
    }
}

impl From<&StorageError> for CliError {
    fn from(err: &StorageError) -> Self {
        Self::from_code(err.code(), err.to_string())
    }
}

impl From<&ConfigError> for CliError {
    fn from(err: &ConfigError) -> Self {
        Self::from_code(err.code(), err.to_string())
    }
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, mode, error)?;
    Ok(())
}

fn write_error(out: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut *out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            writeln!(out, "error: {}", error.message)?;
            if let (Some(code), Some(kind)) = (&error.error_code, error.kind) {
                writeln!(out, "  code: {code} ({kind})")?;
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// Render a success message to stdout.
pub fn render_success(mode: OutputMode, message: &str) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "ok": true,
                "message": message,
            });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            writeln!(out, "✓ {message}")?;
        }
    }
    Ok(())
}
