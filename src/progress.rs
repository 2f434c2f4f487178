//! Progress sinks
//!
//! Observers for group boundaries reported by the provisioner. None of them
//! can fail or alter the outcome of a pass.

use crate::domain::ports::{ProgressEvent, ProgressSink};
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{info, warn};

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Reports group boundaries as log events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started(group) => info!("Ensuring {}", group),
            ProgressEvent::Succeeded(group) => info!("Ensured {}", group),
            ProgressEvent::Failed(group) => warn!("Failed to ensure {}", group),
        }
    }
}

// =============================================================================
// Terminal Spinner
// =============================================================================

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// One spinner line per group on stderr
pub struct SpinnerProgress {
    current: Mutex<Option<ProgressBar>>,
    style: ProgressStyle,
    hidden: bool,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        Self {
            current: Mutex::new(None),
            style,
            hidden: false,
        }
    }

    /// Spinner that tracks state without drawing anything
    pub fn hidden() -> Self {
        Self {
            hidden: true,
            ..Self::new()
        }
    }

    fn start(&self) -> ProgressBar {
        let bar = if self.hidden {
            ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
        } else {
            ProgressBar::new_spinner()
        };
        bar.set_style(self.style.clone());
        if !self.hidden {
            bar.enable_steady_tick(TICK_INTERVAL);
        }
        bar
    }

    fn is_active(&self) -> bool {
        self.current.lock().is_some()
    }
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for SpinnerProgress {
    fn report(&self, event: ProgressEvent) {
        let mut current = self.current.lock();
        match event {
            ProgressEvent::Started(group) => {
                if let Some(previous) = current.take() {
                    previous.abandon();
                }
                let bar = self.start();
                bar.set_message(format!("Ensuring {}", group));
                *current = Some(bar);
            }
            ProgressEvent::Succeeded(group) => {
                if let Some(bar) = current.take() {
                    bar.finish_with_message(format!("{} {}", style("✓").green(), group));
                }
            }
            ProgressEvent::Failed(group) => {
                if let Some(bar) = current.take() {
                    bar.abandon_with_message(format!("{} {}", style("✗").red(), group));
                }
            }
        }
    }
}
