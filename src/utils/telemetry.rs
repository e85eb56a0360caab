// file: src/utils/telemetry.rs
// description: stage timing for the compilation report
// reference: per-stage wall-clock durations

use crate::models::StageTiming;
use std::time::{Duration, Instant};
use tracing::info;

/// Operation timer for performance tracking
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        info!("Starting stage: {}", operation);
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> StageTiming {
        let elapsed = self.elapsed();
        info!(
            "Completed stage: {} in {:.2}s",
            self.operation,
            elapsed.as_secs_f64()
        );
        StageTiming {
            stage: self.operation,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn finish_with_count(self, count: usize) -> StageTiming {
        let elapsed = self.elapsed();
        info!(
            "Completed stage: {} - {} items in {:.2}s",
            self.operation,
            count,
            elapsed.as_secs_f64()
        );
        StageTiming {
            stage: self.operation,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}
