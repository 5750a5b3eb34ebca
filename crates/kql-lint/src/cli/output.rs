//! Output formatting utilities

use super::options::ColorChoice;
use colored::Colorize;
use kql_lint_diagnostics::Diagnostic;
use std::io::IsTerminal;

/// Whether output should be colored for the given preference
pub fn use_colors(choice: ColorChoice) -> bool {
    match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal(),
    }
}

/// Set up color output based on user preference
pub fn setup_colors(choice: ColorChoice) -> bool {
    let enabled = use_colors(choice);
    colored::control::set_override(enabled);
    enabled
}

/// Format an error for display
pub fn format_error(error: &anyhow::Error) -> String {
    format!("{} {:#}", "error:".red().bold(), error)
}

/// `source: succeeded` or `source: failed`
pub fn format_status(source: &str, success: bool, colors: bool) -> String {
    let status = if success { "succeeded" } else { "failed" };
    if !colors {
        return format!("{}: {}", source, status);
    }
    let status = if success { status.green() } else { status.red().bold() };
    format!("{}: {}", source.cyan(), status)
}

pub fn format_diagnostic(diagnostic: &Diagnostic, colors: bool) -> String {
    if colors {
        diagnostic.render_colored()
    } else {
        diagnostic.render()
    }
}
