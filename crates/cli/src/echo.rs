//! Styled messages on stderr. Standard output is reserved for output paths.
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Broadsheet".bold().bright_red(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "News articles to PDF\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print the end-of-batch tally
pub fn print_summary(converted: usize, skipped: usize, failed: usize) {
    eprintln!(
        "\n  {} {}  {} {}  {} {}\n",
        "Converted:".dimmed(),
        converted.to_string().bright_white(),
        "Skipped:".dimmed(),
        skipped.to_string().bright_white(),
        "Failed:".dimmed(),
        if failed > 0 { failed.to_string().bright_red().to_string() } else { failed.to_string().bright_white().to_string() },
    );
}
