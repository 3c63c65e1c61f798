//! Console output formatter for routed requests

use colored::Colorize;
use std::time::Duration;
use toolrouter_application::HandleRequestOutput;
use toolrouter_domain::{RouteDecision, ServerCatalog};

/// Formats request results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// The server list shown at startup and by `/servers`
    pub fn format_servers(catalog: &ServerCatalog) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", "Available tool servers:".cyan().bold()));
        if catalog.is_empty() {
            output.push_str("  (none)\n");
        }
        for (name, description) in catalog.descriptions() {
            output.push_str(&format!("  {} {}\n", format!("{:<16}", name).yellow(), description));
        }
        output
    }

    /// Answer, route and collected errors of one request
    pub fn format_output(output: &HandleRequestOutput) -> String {
        let mut text = String::new();

        let route = match &output.decision {
            RouteDecision::Server(name) => format!("[{}]", name).green().bold(),
            RouteDecision::NoTool => "[none]".yellow().bold(),
            RouteDecision::Unrecognized(name) => format!("[{}?]", name).red().bold(),
        };
        text.push_str(&format!("{} {}\n", "Route:".cyan().bold(), route));

        let answer = output.answer();
        if answer.is_empty() {
            text.push_str(&format!("{}\n", "(no answer)".dimmed()));
        } else {
            text.push_str(&format!("\n{}\n", answer));
        }

        if output.state.has_errors() {
            text.push_str(&format!("\n{}\n", "Errors:".red().bold()));
            for error in &output.state.error_messages {
                text.push_str(&format!("  {} {}\n", "x".red(), error));
            }
        }

        text
    }

    pub fn format_error(error: &dyn std::fmt::Display) -> String {
        format!("{} {}", "Error:".red().bold(), error)
    }

    pub fn format_elapsed(elapsed: Duration) -> String {
        format!("(processed in {:.2}s)", elapsed.as_secs_f64())
            .dimmed()
            .to_string()
    }
}
