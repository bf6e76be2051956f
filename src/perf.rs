//! Lifecycle checkpoints.
//!
//! The controller reports a labelled checkpoint after each stage. What happens
//! with it is up to the sink: [`PerformanceAnalysis`] keeps the elapsed time
//! per checkpoint and logs it, [`NoopInstrumentation`] drops it.

use std::time::{Duration, Instant};

/// Sink for lifecycle checkpoints.
pub trait Instrumentation {
    fn checkpoint(&mut self, label: &str);
}

/// Discards every checkpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {
    fn checkpoint(&mut self, _label: &str) {}
}

/// A recorded checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub label: String,
    pub elapsed: Duration,
}

/// Records checkpoints with the time elapsed since creation.
#[derive(Debug, Clone)]
pub struct PerformanceAnalysis {
    started: Instant,
    checkpoints: Vec<Checkpoint>,
}

impl Default for PerformanceAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceAnalysis {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            checkpoints: Vec::new(),
        }
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn labels(&self) -> Vec<&str> {
        self.checkpoints.iter().map(|c| c.label.as_str()).collect()
    }

    pub fn total(&self) -> Duration {
        self.checkpoints
            .last()
            .map(|c| c.elapsed)
            .unwrap_or_default()
    }
}

impl Instrumentation for PerformanceAnalysis {
    fn checkpoint(&mut self, label: &str) {
        let elapsed = self.started.elapsed();
        tracing::debug!(
            label,
            elapsed_us = elapsed.as_micros() as u64,
            "checkpoint"
        );
        self.checkpoints.push(Checkpoint {
            label: label.to_string(),
            elapsed,
        });
    }
}

impl<T: Instrumentation + ?Sized> Instrumentation for Box<T> {
    fn checkpoint(&mut self, label: &str) {
        (**self).checkpoint(label)
    }
}

impl<T: Instrumentation + ?Sized> Instrumentation for &mut T {
    fn checkpoint(&mut self, label: &str) {
        (**self).checkpoint(label)
    }
}
