//! Human-readable rendering of runtime lifecycle events and error chains.
//!
//! The runtime itself stays silent; a [`TelemetryFormatter`] turns its
//! [`RunEvent`]s and the errors channel's [`ErrorEvent`]s into lines a CLI
//! or log sink can print.

use crate::channels::errors::ErrorEvent;

pub const CONTEXT_COLOR: &str = "\x1b[32m"; // green
pub const LINE_COLOR: &str = "\x1b[35m"; // magenta / dark pink
pub const RESET_COLOR: &str = "\x1b[0m";

/// A single lifecycle event a [`crate::runtime::Runtime`] run produces, for
/// callers that want to observe progress without instrumenting every node.
#[derive(Clone, Debug)]
pub enum RunEvent {
    NodeStarted { node_id: String, step: u64 },
    NodeCompleted { node_id: String, step: u64 },
    NodeFailed { node_id: String, step: u64, message: String },
    RunFinished { exit: String, steps_taken: u64 },
}

impl RunEvent {
    #[must_use]
    pub fn scope_label(&self) -> Option<&str> {
        match self {
            RunEvent::NodeStarted { node_id, .. }
            | RunEvent::NodeCompleted { node_id, .. }
            | RunEvent::NodeFailed { node_id, .. } => Some(node_id.as_str()),
            RunEvent::RunFinished { .. } => None,
        }
    }
}

impl std::fmt::Display for RunEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunEvent::NodeStarted { node_id, step } => write!(f, "[{step}] {node_id} started"),
            RunEvent::NodeCompleted { node_id, step } => write!(f, "[{step}] {node_id} completed"),
            RunEvent::NodeFailed { node_id, step, message } => write!(f, "[{step}] {node_id} failed: {message}"),
            RunEvent::RunFinished { exit, steps_taken } => write!(f, "run finished ({exit}) after {steps_taken} step(s)"),
        }
    }
}

/// Rendered output for a telemetry item that can be consumed by sinks.
#[derive(Clone, Debug, Default)]
pub struct EventRender {
    pub context: Option<String>,
    pub lines: Vec<String>,
}

impl EventRender {
    pub fn join_lines(&self) -> String {
        self.lines.join("")
    }
}

pub trait TelemetryFormatter: Send + Sync {
    fn render_event(&self, event: &RunEvent) -> EventRender;
    fn render_errors(&self, errors: &[ErrorEvent]) -> Vec<EventRender>;
}

pub struct PlainFormatter;

fn format_error_chain(error: &crate::channels::errors::LadderError, indent: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(cause) = &error.cause {
        let indent_str = "  ".repeat(indent);
        lines.push(format!(
            "{LINE_COLOR}{}cause: {}{RESET_COLOR}\n",
            indent_str, cause.message
        ));
        lines.extend(format_error_chain(cause, indent + 1));
    }
    lines
}

impl TelemetryFormatter for PlainFormatter {
    fn render_event(&self, event: &RunEvent) -> EventRender {
        let line = format!("{LINE_COLOR}{}{RESET_COLOR}\n", event);
        EventRender {
            context: event.scope_label().map(ToString::to_string),
            lines: vec![line],
        }
    }

    fn render_errors(&self, errors: &[ErrorEvent]) -> Vec<EventRender> {
        errors
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let mut lines = Vec::new();
                let scope_str = format!("{CONTEXT_COLOR}{:?}{RESET_COLOR}", e.scope);
                lines.push(format!("[{}] {} | {}\n", i, e.when, scope_str));
                lines.push(format!(
                    "{LINE_COLOR}  error: {}{RESET_COLOR}\n",
                    e.error.message
                ));
                lines.extend(format_error_chain(&e.error, 1));
                if !e.tags.is_empty() {
                    lines.push(format!("{LINE_COLOR}  tags: {:?}{RESET_COLOR}\n", e.tags));
                }
                if !e.context.is_null() {
                    lines.push(format!(
                        "{LINE_COLOR}  context: {}{RESET_COLOR}\n",
                        e.context
                    ));
                }
                EventRender {
                    context: Some(format!("{:?}", e.scope)),
                    lines,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_node_lifecycle_event() {
        let formatter = PlainFormatter;
        let render = formatter.render_event(&RunEvent::NodeCompleted {
            node_id: "agent".to_string(),
            step: 2,
        });
        assert_eq!(render.context.as_deref(), Some("agent"));
        assert!(render.join_lines().contains("completed"));
    }

    #[test]
    fn renders_run_finished_without_a_node_scope() {
        let formatter = PlainFormatter;
        let render = formatter.render_event(&RunEvent::RunFinished {
            exit: "completed".to_string(),
            steps_taken: 3,
        });
        assert!(render.context.is_none());
        assert!(render.join_lines().contains("3 step"));
    }
}
