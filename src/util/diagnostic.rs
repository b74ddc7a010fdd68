//! User-facing diagnostic messages.
//!
//! Every reported problem carries its root cause, the context it was found
//! in and, where possible, a suggested fix.

use std::fmt;

/// Common suggestion messages.
pub mod suggestions {
    pub const INSTALL_COMPILER: &str =
        "install a gcc-<N> or clang-<N> toolchain (aarch64-linux-gnu-gcc-<N> for arm64)";

    pub const INSTALL_VMM: &str =
        "install qemu-system-<arch> or firecracker-<arch> to run the generated images";

    pub const RELAX_RULES: &str = "check the exclusion rules and the tools selected in config.toml";

    pub const VERBOSE: &str = "run with --verbose to see every excluded variant";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self::new(Severity::Note, message)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
            }
        };
        output.push_str(&format!("{}: {}\n", severity, self.message));

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            let help = if color { "\x1b[1;32mhelp\x1b[0m" } else { "help" };
            if let [single] = self.suggestions.as_slice() {
                output.push_str(&format!("{}: {}\n", help, single));
            } else {
                output.push_str(&format!("{}: consider:\n", help));
                for (i, suggestion) in self.suggestions.iter().enumerate() {
                    output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
                }
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::warning("skipping target fc/arm64")
            .with_context("no compiler found for arm64")
            .with_suggestion(suggestions::INSTALL_COMPILER);

        let output = diag.format(false);
        assert!(output.starts_with("warning: skipping target fc/arm64\n"));
        assert!(output.contains("  = no compiler found for arm64\n"));
        assert!(output.contains("help: install a gcc-<N>"));
    }

    #[test]
    fn test_numbered_suggestions() {
        let diag = Diagnostic::error("nothing to generate")
            .with_suggestion(suggestions::RELAX_RULES)
            .with_suggestion(suggestions::VERBOSE);

        let output = diag.to_string();
        assert!(output.contains("help: consider:"));
        assert!(output.contains("  2. run with --verbose"));
    }
}
