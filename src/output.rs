// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use crate::deploy::Deployment;
use crate::events::DeploymentEvent;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
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

    pub fn mode(&self) -> OutputMode {
        self.mode
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

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a deployment event as it happens.
    pub fn event(&self, event: &DeploymentEvent) {
        match self.mode {
            OutputMode::Normal => match event {
                DeploymentEvent::DeploymentUpdate {
                    deployment_id,
                    status,
                    logs,
                    ..
                } => match logs {
                    Some(logs) => println!("  → {deployment_id}: {status} ({logs})"),
                    None => println!("  → {deployment_id}: {status}"),
                },
                DeploymentEvent::DeploymentRemoved { deployment_id } => {
                    println!("  → {deployment_id}: removed");
                }
            },
            OutputMode::Quiet => {}
            OutputMode::Json => print_json(event),
        }
    }

    /// Print one deployment record.
    pub fn deployment(&self, deployment: &Deployment) {
        match self.mode {
            OutputMode::Normal => {
                println!("{}", deployment.id);
                println!("  Repository: {} ({})", deployment.repo_url, deployment.branch);
                println!("  Status: {}", deployment.status);
                if let Some(url) = &deployment.url {
                    println!("  URL: {url}");
                }
                if let Some(container) = &deployment.container_ref {
                    println!("  Container: {}", container.short(12));
                }
                if let Some(logs) = &deployment.logs {
                    println!("  Last message: {logs}");
                }
                println!("  Updated: {}", deployment.updated_at.to_rfc3339());
            }
            OutputMode::Quiet => println!("{}\t{}", deployment.id, deployment.status),
            OutputMode::Json => print_json(deployment),
        }
    }

    /// Print a table of deployments.
    pub fn deployments(&self, deployments: &[Deployment]) {
        if self.mode == OutputMode::Json {
            print_json(&deployments);
            return;
        }
        if deployments.is_empty() {
            self.progress("No deployments");
            return;
        }
        for deployment in deployments {
            match self.mode {
                OutputMode::Normal => println!(
                    "{}  {:<12}  {}",
                    deployment.id,
                    deployment.status,
                    deployment.url.as_deref().unwrap_or("-")
                ),
                _ => println!("{}\t{}", deployment.id, deployment.status),
            }
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => print_json(&JsonEvent {
                event: "success",
                message,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Warning: {message}"),
            OutputMode::Json => eprint_json(&JsonEvent {
                event: "warning",
                message,
                duration_secs: None,
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => eprint_json(&JsonEvent {
                event: "error",
                message,
                duration_secs: self.duration(),
            }),
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        println!("{json}");
    }
}

fn eprint_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        eprintln!("{json}");
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
