//! Verbose progress logger for agents.
//!
//! Every message also goes to the `log` facade at the matching level; the
//! colored, timestamped console line is printed only in verbose mode.

use chrono::Local;

use crate::utilities::printer::{Printer, PrinterColor};

/// Logger with optional verbose console output and timestamps.
#[derive(Debug, Clone)]
pub struct Logger {
    /// Enables console output.
    pub verbose: bool,
    /// Prefix identifying who is logging (agent name, "Orchestrator", ...).
    pub source: String,
    printer: Printer,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(false, "agent")
    }
}

impl Logger {
    pub fn new(verbose: bool, source: impl Into<String>) -> Self {
        Self {
            verbose,
            source: source.into(),
            printer: Printer::default(),
        }
    }

    /// Log `message` under `title`.
    pub fn log(&self, level: log::Level, title: &str, message: &str, color: PrinterColor) {
        log::log!(level, "[{}] {}: {}", self.source, title, message);
        if self.verbose {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            let formatted = format!("\n[{}][{}] {}:\n{}", timestamp, self.source, title, message);
            self.printer.print(&formatted, color);
        }
    }

    pub fn thought(&self, message: &str) {
        self.log(log::Level::Debug, "Thought", message, PrinterColor::Magenta);
    }

    pub fn tool_use(&self, message: &str) {
        self.log(log::Level::Info, "Using capability", message, PrinterColor::Green);
    }

    pub fn observation(&self, message: &str) {
        self.log(log::Level::Debug, "Observations", message, PrinterColor::Blue);
    }

    pub fn final_answer(&self, message: &str) {
        self.log(log::Level::Info, "Final answer", message.trim(), PrinterColor::BoldGreen);
    }

    pub fn warning(&self, message: &str) {
        self.log(log::Level::Warn, "Warning", message, PrinterColor::Yellow);
    }

    pub fn error(&self, message: &str) {
        self.log(log::Level::Error, "Error", message, PrinterColor::Red);
    }
}
