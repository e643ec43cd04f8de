/*!
Diagnostic results and report rendering.

A `DiagnosticReport` maps each executed command to the raw text the device
returned, preserving execution order for rendering. Reports serialize to a
plain-text file (one labeled section per command) or to JSON; neither output
is a designed file format with a parsing contract.
*/

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Prefix recorded in place of output when a command's send fails. A marked
/// entry keeps the rest of the run intact and is treated as inconclusive by
/// health rules.
pub const COMMAND_ERROR_PREFIX: &str = "Error executing command:";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("report serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandRecord {
    pub command: String,
    pub output: String,
}

/// Command-to-output mapping produced by one diagnostic run. Keys are unique;
/// re-recording a command overwrites its output in place, keeping the position
/// of the first occurrence.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub device: String,
    pub hostname: String,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub generated_at: SystemTime,
    entries: Vec<CommandRecord>,
}

fn serialize_rfc3339<S: Serializer>(ts: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_rfc3339_seconds(*ts))
}

impl DiagnosticReport {
    pub fn new(device: &str, hostname: &str) -> Self {
        Self {
            device: device.to_string(),
            hostname: hostname.to_string(),
            generated_at: SystemTime::now(),
            entries: Vec::new(),
        }
    }

    /// Record a command's output. Last write wins for repeated commands.
    pub fn record(&mut self, command: &str, output: String) {
        match self.entries.iter_mut().find(|e| e.command == command) {
            Some(entry) => entry.output = output,
            None => self.entries.push(CommandRecord {
                command: command.to_string(),
                output,
            }),
        }
    }

    /// Record a failed command as data so the run can continue.
    pub fn record_failure(&mut self, command: &str, reason: &str) {
        self.record(command, format!("{} {}", COMMAND_ERROR_PREFIX, reason));
    }

    pub fn get(&self, command: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.command == command)
            .map(|e| e.output.as_str())
    }

    /// True when the stored output is an error marker rather than device text.
    pub fn is_error(&self, command: &str) -> bool {
        self.get(command)
            .is_some_and(|out| out.starts_with(COMMAND_ERROR_PREFIX))
    }

    /// Entries in execution order.
    pub fn entries(&self) -> impl Iterator<Item = &CommandRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        let banner = "=".repeat(80);
        out.push_str(&banner);
        out.push('\n');
        out.push_str("Cisco Diagnostic Report\n");
        out.push_str(&format!("Device: {}\n", self.device));
        out.push_str(&format!("Hostname: {}\n", self.hostname));
        out.push_str(&format!(
            "Generated: {}\n",
            humantime::format_rfc3339_seconds(self.generated_at)
        ));
        out.push_str(&banner);
        out.push_str("\n\n");

        let divider = "#".repeat(60);
        for entry in &self.entries {
            out.push('\n');
            out.push_str(&divider);
            out.push('\n');
            out.push_str(&format!("# Command: {}\n", entry.command));
            out.push_str(&divider);
            out.push_str("\n\n");
            out.push_str(&entry.output);
            out.push_str("\n\n");
        }
        out
    }

    /// Write the report as plain text, one section per command in run order.
    pub fn write_text(&self, path: &Path) -> Result<(), ReportError> {
        fs::write(path, self.render_text())?;
        Ok(())
    }

    /// Write the report as JSON for programmatic use.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// `cisco_report_<hostname>_<timestamp>.txt`, safe for use as a file name.
pub fn default_report_name(hostname: &str) -> String {
    let ts = humantime::format_rfc3339_seconds(SystemTime::now())
        .to_string()
        .replace(':', "-");
    format!("cisco_report_{}_{}.txt", hostname, ts)
}
