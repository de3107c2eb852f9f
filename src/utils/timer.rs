//! Stage timing

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// Wall time of one named stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    /// Seconds since the timer started
    pub at_secs: f64,
    /// Seconds since the previous checkpoint
    pub delta_secs: f64,
}

/// Wall-clock timer with named checkpoints
#[derive(Debug)]
pub struct Timer {
    name: String,
    start: Instant,
    checkpoints: Vec<(String, Duration)>,
}

impl Timer {
    /// Create and start a new timer
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            checkpoints: Vec::new(),
        }
    }

    /// Record the end of a stage
    pub fn checkpoint(&mut self, stage: impl Into<String>) {
        self.checkpoints.push((stage.into(), self.start.elapsed()));
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Checkpoints with per-stage deltas
    pub fn timings(&self) -> Vec<StageTiming> {
        let mut prev = Duration::ZERO;
        self.checkpoints
            .iter()
            .map(|(stage, at)| {
                let timing = StageTiming {
                    stage: stage.clone(),
                    at_secs: at.as_secs_f64(),
                    delta_secs: at.saturating_sub(prev).as_secs_f64(),
                };
                prev = *at;
                timing
            })
            .collect()
    }

    /// Log every checkpoint and the total, returning the timings
    pub fn stop_with_report(self) -> Vec<StageTiming> {
        let timings = self.timings();
        for t in &timings {
            info!("{} {}: {:.3}s (+{:.3}s)", self.name, t.stage, t.at_secs, t.delta_secs);
        }
        info!("{} total: {:.3}s", self.name, self.elapsed_secs());
        timings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoints_are_ordered() {
        let mut timer = Timer::start("run");
        timer.checkpoint("load");
        std::thread::sleep(Duration::from_millis(5));
        timer.checkpoint("fit");

        let timings = timer.stop_with_report();
        assert_eq!(timings.len(), 2);
        assert_eq!(timings[0].stage, "load");
        assert!(timings[1].at_secs >= timings[0].at_secs);
        assert!(timings[1].delta_secs >= 0.005);
    }
}
