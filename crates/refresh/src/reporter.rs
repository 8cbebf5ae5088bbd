//! Human-readable notification output.

use console::{Style, Term};

/// Receives one call per reported file when quiet mode is off.
pub trait Reporter: Send + Sync {
    /// A reload was sent for `file_name` (base name only).
    fn reloaded(&self, file_name: &str);
}

/// Writes `Reloaded <file>` lines to stderr, with the file name in magenta.
#[derive(Debug)]
pub struct ConsoleReporter {
    term: Term,
    magenta: Style,
}

impl ConsoleReporter {
    /// Create a reporter writing to stderr.
    #[must_use]
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            magenta: Style::new().magenta(),
        }
    }

    fn line(&self, file_name: &str) -> String {
        format!("Reloaded {}", self.magenta.apply_to(file_name))
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn reloaded(&self, file_name: &str) {
        let _ = self.term.write_line(&self.line(file_name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_names_file() {
        let reporter = ConsoleReporter::new();
        let line = reporter.line("a.css");
        assert_eq!(console::strip_ansi_codes(&line), "Reloaded a.css");
    }
}
