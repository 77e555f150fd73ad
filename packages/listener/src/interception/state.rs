// packages/listener/src/interception/state.rs
//! Listening state machine with a block guard
//!
//! Two states, `Stopped` and `Listening`, plus an orthogonal counter of
//! outstanding blockers. While any blocker is outstanding, `stop()` and
//! subscriber clearing are refused.

use crate::observability::GUARD_REFUSALS_TOTAL;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Listening state shared by the pipeline, the registries and the patched transports
#[derive(Debug, Default)]
pub struct ListeningStateMachine {
    listening: AtomicBool,
    block_count: AtomicUsize,
}

impl ListeningStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition to `Listening`; no-op when already listening
    pub fn start(&self) {
        if !self.listening.swap(true, Ordering::SeqCst) {
            info!("Listening for HTTP calls");
        }
    }

    /// Transition to `Stopped` unless a blocker is outstanding
    pub fn stop(&self) -> bool {
        if self.is_blocked() {
            debug!(
                "Refusing to stop: {} blocker(s) outstanding",
                self.block_count()
            );
            metrics::counter!(GUARD_REFUSALS_TOTAL, "operation" => "stop").increment(1);
            return false;
        }

        if self.listening.swap(false, Ordering::SeqCst) {
            info!("Stopped listening for HTTP calls");
        }
        true
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    pub fn is_blocked(&self) -> bool {
        self.block_count() > 0
    }

    pub fn block_count(&self) -> usize {
        self.block_count.load(Ordering::SeqCst)
    }

    /// Add a blocker; the returned handle releases it
    pub fn block(self: &Arc<Self>) -> BlockHandle {
        let count = self.block_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Listening state blocked ({} outstanding)", count);

        BlockHandle {
            state: Arc::clone(self),
            released: AtomicBool::new(false),
        }
    }

    fn release(&self) {
        // Saturating: never below zero
        let _ = self
            .block_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

/// Capability to release exactly one blocker
///
/// Dropping the handle does not unblock.
#[must_use = "dropping a BlockHandle keeps the listening state blocked"]
#[derive(Debug)]
pub struct BlockHandle {
    state: Arc<ListeningStateMachine>,
    released: AtomicBool,
}

impl BlockHandle {
    /// Release the blocker; repeat calls are no-ops
    pub fn unblock(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.state.release();
            debug!(
                "Listening state unblocked ({} outstanding)",
                self.state.block_count()
            );
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}
