//! Index readiness state machine and progress reporting.

use serde::Serialize;

/// Lifecycle phase of the index.
///
/// `Uninitialized` is the instant-start default; the background build moves
/// through `Building` into `Ready` or `Failed`. `Failed` is terminal for
/// the process lifetime; a rebuild (restart) is the only recovery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexPhase {
    Uninitialized,
    Building,
    Ready,
    Failed,
}

/// Readiness state plus build progress, readable at any time.
///
/// `processed` counts records examined (skips included), so it reaches
/// `total` even when deleted or unembeddable records shrink the final
/// index. `error` carries the failure reason in `Failed`, or the last
/// durability error while `Ready` (a mutation applied in memory whose
/// persist step failed).
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub phase: IndexPhase,
    pub total: u64,
    pub processed: u64,
    pub error: Option<String>,
}

impl IndexStatus {
    /// Initial state before any build or load has happened.
    pub fn new() -> Self {
        Self {
            phase: IndexPhase::Uninitialized,
            total: 0,
            processed: 0,
            error: None,
        }
    }

    /// Whether operations that require a ready index may proceed.
    pub fn is_ready(&self) -> bool {
        self.phase == IndexPhase::Ready
    }
}

impl Default for IndexStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress counters included in the health report.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub total: u64,
    pub processed: u64,
}

/// Snapshot returned by the health endpoint.
///
/// Non-ready states are reported here as data, never as a success response
/// carrying partial search results.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub ready: bool,
    pub phase: IndexPhase,
    pub size: usize,
    pub progress: Progress,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status() {
        let status = IndexStatus::new();
        assert_eq!(status.phase, IndexPhase::Uninitialized);
        assert_eq!(status.total, 0);
        assert_eq!(status.processed, 0);
        assert!(status.error.is_none());
        assert!(!status.is_ready());
    }

    #[test]
    fn test_phase_serializes_lowercase() {
        let json = serde_json::to_string(&IndexPhase::Building).unwrap();
        assert_eq!(json, "\"building\"");
    }
}
