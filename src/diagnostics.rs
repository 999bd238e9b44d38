// ABOUTME: Diagnostics accumulator for non-fatal warnings during teardown.
// ABOUTME: Collects stop and cleanup failures that shouldn't fail an operation but should be shown.

use crate::deploy::CleanupError;

/// Collects non-fatal warnings during deployment operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Take over cleanup failures, which were already logged when they happened.
    pub fn extend_cleanup(&mut self, failures: Vec<CleanupError>) {
        self.warnings
            .extend(failures.iter().map(|e| Warning::cleanup(e.to_string())));
    }
}

/// A non-fatal warning collected during teardown.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a container stop warning.
    pub fn stop(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Stop,
            message: message.into(),
        }
    }

    /// Create a cleanup warning.
    pub fn cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Cleanup,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Stopping or removing the container or its image failed.
    Stop,
    /// A resource Cleanup tried to reclaim was left behind.
    Cleanup,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ContainerError;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::stop("daemon unavailable"));
        diag.extend_cleanup(vec![CleanupError::ListContainers {
            name: "skiff-alice-d1".to_string(),
            source: ContainerError::Runtime("timeout".to_string()),
        }]);

        assert_eq!(diag.warnings().len(), 2);
        assert_eq!(diag.warnings()[1].kind, WarningKind::Cleanup);
        assert!(diag.warnings()[1].message.contains("skiff-alice-d1"));
    }
}
