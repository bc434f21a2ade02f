//! Progress-callback trait for tool operations.
//!
//! Inject an [`Arc<dyn ToolProgressCallback>`] via
//! [`crate::config::ToolkitConfigBuilder::progress_callback`] to receive
//! events while an operation runs.
//!
//! Two shapes of progress exist in the toolkit:
//!
//! * **Stepped** — page rendering, batch image conversion, PDF merging: the
//!   operation knows how many steps it will take and reports each one.
//! * **Percent** — ffmpeg transcodes only know how far into the media they
//!   are, reported as 0–100 through [`ToolProgressCallback::on_percent`].
//!
//! The trait is `Send + Sync` so it can be called from `spawn_blocking`
//! threads and from concurrently running batch items.
//!
//! # Example
//!
//! ```rust
//! use axevora::{ToolProgressCallback, ToolkitConfig};
//! use std::sync::{Arc, atomic::{AtomicU8, Ordering}};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl ToolProgressCallback for LastPercent {
//!     fn on_percent(&self, percent: u8) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ToolkitConfig::builder()
//!     .progress_callback(Arc::new(LastPercent(AtomicU8::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by tool operations as they make progress.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ToolProgressCallback: Send + Sync {
    /// Called once before any work starts.
    ///
    /// # Arguments
    /// * `task`        — short human-readable task name, e.g. `"render"`
    /// * `total_steps` — number of steps, or `0` when only percentages follow
    fn on_task_start(&self, task: &str, total_steps: usize) {
        let _ = (task, total_steps);
    }

    /// Called after one step (page, file) has finished.
    ///
    /// # Arguments
    /// * `step`        — 1-indexed step number
    /// * `total_steps` — total steps
    fn on_step_complete(&self, step: usize, total_steps: usize) {
        let _ = (step, total_steps);
    }

    /// Called when one step failed but the task continues.
    fn on_step_error(&self, step: usize, total_steps: usize, error: &str) {
        let _ = (step, total_steps, error);
    }

    /// Called with a completion percentage in `0..=100`.
    ///
    /// Percentages are monotonic within one task.
    fn on_percent(&self, percent: u8) {
        let _ = percent;
    }

    /// Called once after the task finished (successfully or not).
    ///
    /// # Arguments
    /// * `total_steps`   — total steps attempted
    /// * `success_count` — steps that finished without error
    fn on_task_complete(&self, total_steps: usize, success_count: usize) {
        let _ = (total_steps, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ToolProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ToolkitConfig`].
pub type ProgressCallback = Arc<dyn ToolProgressCallback>;

/// Forward percentages to a callback, dropping repeats and regressions.
///
/// ffmpeg emits a progress block roughly twice per second, often with the
/// same rounded percentage; callers only want to hear about changes.
pub(crate) struct PercentReporter<'a> {
    callback: Option<&'a ProgressCallback>,
    last: Option<u8>,
}

impl<'a> PercentReporter<'a> {
    pub(crate) fn new(callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            callback,
            last: None,
        }
    }

    pub(crate) fn report(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last.is_some_and(|last| percent <= last) {
            return;
        }
        self.last = Some(percent);
        if let Some(cb) = self.callback {
            cb.on_percent(percent);
        }
    }
}
