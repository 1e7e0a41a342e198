//! Output formatting abstraction for text vs JSON rendering
//!
//! All subcommand output flows through [`OutputWriter`] which handles format switching.
//! This keeps format-specific logic out of command handlers entirely.

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use xdpwall_core::api::StatusReport;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Abstraction for writing CLI output in different formats.
///
/// Subcommand handlers call `writer.render(&payload)` where `payload`
/// implements both `Serialize` (for JSON) and `Render` (for text).
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a new output writer with the specified format.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use xdpwall_cli::output::OutputWriter;
    /// use xdpwall_cli::cli::OutputFormat;
    ///
    /// let writer = OutputWriter::new(OutputFormat::Text);
    /// ```
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a payload to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(payload, &mut handle)
    }

    /// Render a payload to an arbitrary writer.
    ///
    /// For `Text` format, delegates to `Render::render_text()`.
    /// For `Json` format, serialises via `serde_json`.
    pub fn render_to<T: Render + Serialize>(
        &self,
        payload: &T,
        w: &mut dyn Write,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => {
                payload.render_text(w)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }
}

/// Trait for human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

/// Result of a mutating command.
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub message: String,
    /// Extra per-item notes from the daemon (e.g. interfaces with nothing loaded).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Outcome {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            notes: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }
}

impl Render for Outcome {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}", self.message.green())?;
        for note in &self.notes {
            writeln!(w, "  {}", note.yellow())?;
        }
        Ok(())
    }
}

impl Render for StatusReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}", "Loaded interfaces:".bold())?;
        if self.interfaces.is_empty() {
            writeln!(w, "  {}", "(none)".dimmed())?;
        }
        for (i, iface) in self.interfaces.iter().enumerate() {
            writeln!(w, "  {}- {}", i + 1, iface)?;
        }

        writeln!(w)?;
        writeln!(w, "{}", "Blocked IP addresses:".bold())?;
        if self.blocked.is_empty() {
            writeln!(w, "  {}", "(none)".dimmed())?;
        }
        for (i, cidr) in self.blocked.iter().enumerate() {
            writeln!(w, "  {}- {}", i + 1, cidr.red())?;
        }

        writeln!(w)?;
        writeln!(w, "{}", "Timeouts:".bold())?;
        writeln!(
            w,
            "{:<4} {:<20} {:<20} Remaining",
            "No", "Target", "Expires at"
        )?;
        writeln!(w, "{}", "-".repeat(60))?;
        for (i, entry) in self.timeout.iter().enumerate() {
            writeln!(
                w,
                "{:<4} {:<20} {:<20} {}s",
                i + 1,
                entry.target,
                entry.timeout,
                entry.remaining_time
            )?;
        }

        writeln!(w)?;
        writeln!(w, "{}", "Drop counters:".bold())?;
        writeln!(
            w,
            "{:<4} {:<16} {:>14} {:>12} {:>14} {:>12}",
            "No", "Address", "Src bytes", "Src pkts", "Dst bytes", "Dst pkts"
        )?;
        writeln!(w, "{}", "-".repeat(77))?;
        for (i, row) in self.stats.iter().enumerate() {
            writeln!(
                w,
                "{:<4} {:<16} {:>14} {:>12} {:>14} {:>12}",
                i + 1,
                row.target,
                row.src_bytes_dropped,
                row.src_count,
                row.dst_bytes_dropped,
                row.dst_count
            )?;
        }

        Ok(())
    }
}
