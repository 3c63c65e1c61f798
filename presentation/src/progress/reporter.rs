//! Progress reporting for request handling

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use toolrouter_application::RequestProgress;
use toolrouter_domain::RouteDecision;

/// Spinner showing the current routing or tool step
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn start(&self, prefix: &str, message: String) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix(prefix.to_string());
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));

        let mut slot = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(pb) {
            previous.finish_and_clear();
        }
    }

    fn finish(&self, message: String) {
        let mut slot = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = slot.take() {
            pb.finish_with_message(message);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestProgress for ProgressReporter {
    fn on_routing_start(&self) {
        self.start("Routing", "asking the router model...".to_string());
    }

    fn on_route_decided(&self, decision: &RouteDecision) {
        let message = match decision {
            RouteDecision::Server(name) => format!("{} {}", "->".green(), name),
            RouteDecision::NoTool => format!("{} no tool server", "->".yellow()),
            RouteDecision::Unrecognized(name) => format!("{} unknown server '{}'", "x".red(), name),
        };
        self.finish(message);
    }

    fn on_tool_call_start(&self, server: &str, tool: &str) {
        self.start("Tool", format!("{}/{}", server, tool));
    }

    fn on_tool_call_complete(&self, tool: &str, success: bool) {
        let mark = if success { "v".green() } else { "x".red() };
        self.finish(format!("{} {}", mark, tool));
    }

    fn on_finished(&self) {
        let mut slot = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = slot.take() {
            pb.finish_and_clear();
        }
    }
}

/// Plain line-per-step progress for terminals without spinner support
pub struct SimpleProgress;

impl RequestProgress for SimpleProgress {
    fn on_routing_start(&self) {
        eprintln!("{} {}", "->".cyan(), "Routing".bold());
    }

    fn on_route_decided(&self, decision: &RouteDecision) {
        match decision.server() {
            Some(server) => eprintln!("  {} {}", "v".green(), server),
            None => eprintln!("  {} no tool server", "-".yellow()),
        }
    }

    fn on_tool_call_start(&self, server: &str, tool: &str) {
        eprintln!("{} {}/{}", "->".cyan(), server, tool);
    }

    fn on_tool_call_complete(&self, tool: &str, success: bool) {
        if success {
            eprintln!("  {} {}", "v".green(), tool);
        } else {
            eprintln!("  {} {} (failed)", "x".red(), tool);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_lifecycle_leaves_no_bar() {
        let reporter = ProgressReporter::new();
        reporter.on_routing_start();
        reporter.on_route_decided(&RouteDecision::Server("filesystem".to_string()));
        reporter.on_tool_call_start("filesystem", "read_file");
        reporter.on_tool_call_start("filesystem", "list_directory");
        reporter.on_tool_call_complete("list_directory", true);
        reporter.on_finished();

        assert!(reporter.spinner.lock().unwrap().is_none());
    }
}
