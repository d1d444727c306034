//! Sinks for verbose loading output.

use colored::Colorize;

/// Receives user-facing progress lines while a configuration is loaded.
pub trait Reporter {
    /// Progress, such as the file about to be read.
    fn info(&mut self, line: &str);

    /// Problems: missing files and layer failures.
    fn error(&mut self, line: &str);
}

/// Writes info lines to stdout and error lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn info(&mut self, line: &str) {
        println!("{}", line.dimmed());
    }

    fn error(&mut self, line: &str) {
        eprintln!("{}", error_line(line));
    }
}

fn error_line(line: &str) -> String {
    format!("{} {line}", "Error:".red())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// Keeps every line in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    pub lines: Vec<(Level, String)>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines reported at `level`, in order.
    pub fn at(&self, level: Level) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line.as_str())
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn info(&mut self, line: &str) {
        self.lines.push((Level::Info, line.to_string()));
    }

    fn error(&mut self, line: &str) {
        self.lines.push((Level::Error, line.to_string()));
    }
}

/// Discards everything; used when verbose output is off.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Silent;

impl Reporter for Silent {
    fn info(&mut self, _line: &str) {}
    fn error(&mut self, _line: &str) {}
}
