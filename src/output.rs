// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Prints plans and pass reports as text or JSON lines.

use serde::Serialize;
use std::fmt::Write as _;
use std::time::Instant;

use crate::diagnostics::Warning;
use crate::reconcile::{OperationPlan, PassPhase, PassReport};
use crate::types::NetworkRef;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a computed plan.
    pub fn plan(&self, plan: &OperationPlan, warnings: &[Warning]) {
        match self.mode {
            OutputMode::Normal => print!("{}", render_plan(plan, warnings)),
            OutputMode::Json => print_json(&JsonEvent::Plan {
                plan,
                warnings,
            }),
        }
    }

    /// Print the outcome of a pass.
    pub fn report(&self, report: &PassReport) {
        match self.mode {
            OutputMode::Normal => {
                print!("{}", render_report(report));
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("Finished in {:.1}s", elapsed);
                }
            }
            OutputMode::Json => print_json(&JsonEvent::Report {
                report,
                duration_secs: self.start_time.map(|_| self.elapsed_secs()),
            }),
        }
    }

    /// Print a suggestion that follows an error (suppressed in json mode).
    pub fn hint(&self, hint: &str) {
        if self.mode == OutputMode::Normal {
            eprintln!("  hint: {hint}");
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(&JsonEvent::Error { message }) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonEvent<'a> {
    Plan {
        plan: &'a OperationPlan,
        warnings: &'a [Warning],
    },
    Report {
        report: &'a PassReport,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_secs: Option<f64>,
    },
    Error {
        message: &'a str,
    },
}

fn print_json(event: &JsonEvent<'_>) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "failed to serialize output"),
    }
}

fn render_plan(plan: &OperationPlan, warnings: &[Warning]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Plan for container {}", plan.container_id.short());
    if plan.is_empty() {
        let _ = writeln!(out, "  nothing to do");
    }
    for network in plan.to_join.iter() {
        let _ = writeln!(out, "  + join  {network}");
    }
    for network in plan.to_leave.iter() {
        let _ = writeln!(out, "  - leave {network}");
    }
    render_warnings(&mut out, warnings);
    out
}

fn render_report(report: &PassReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Pass {} for container {}",
        report.phase,
        report.container_id.short()
    );
    render_networks(&mut out, "joined", &report.joined);
    render_networks(&mut out, "left", &report.left);
    render_networks(&mut out, "skipped", &report.skipped);
    render_networks(&mut out, "rolled back", &report.rolled_back);
    if report.phase == PassPhase::Committed && !report.changed() {
        let _ = writeln!(out, "  no changes");
    }
    let _ = writeln!(
        out,
        "  external connectivity: {}",
        if report.has_external { "yes" } else { "no" }
    );
    render_warnings(&mut out, &report.warnings);
    out
}

fn render_networks(out: &mut String, label: &str, networks: &[NetworkRef]) {
    for network in networks {
        let _ = writeln!(out, "  {label}: {network}");
    }
}

fn render_warnings(out: &mut String, warnings: &[Warning]) {
    for warning in warnings {
        let _ = writeln!(out, "  warning: {}", warning.message);
    }
}
