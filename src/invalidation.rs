//! Batched measure invalidation.
//!
//! Each element owns one tracker. While a batch is open, invalidations only mark the tracker as
//! pending; the outermost commit turns any number of them into a single notification.

use tracing::{debug, warn};

/// Why an element's measurement became stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidationReason {
    /// `width_request` or `height_request` changed.
    SizeRequest,
    /// `minimum_width_request` or `minimum_height_request` changed.
    MinimumSizeRequest,
    /// `is_visible` changed.
    Visibility,
    /// `is_platform_enabled` changed.
    PlatformEnabled,
    /// The native state became consistent again.
    NativeState,
    /// The native peer reported a new intrinsic size.
    NativeSize,
    /// A visual child was added or removed.
    Children,
}

/// What the caller must do after an invalidation or commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct CommitOutcome {
    /// True if this call closed the outermost batch.
    pub batch_closed: bool,
    /// Set if a measure-invalidated notification must fire now.
    pub fire: Option<InvalidationReason>,
}

/// Per-element batch state: `{depth, pending}`.
#[derive(Debug, Default, Clone)]
pub struct InvalidationTracker {
    depth: usize,
    pending: Option<InvalidationReason>,
}

impl InvalidationTracker {
    pub fn new() -> InvalidationTracker {
        InvalidationTracker::default()
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True while at least one batch is open.
    pub fn is_batched(&self) -> bool {
        self.depth > 0
    }

    /// True if an invalidation arrived during the open batch.
    pub fn pending_commit(&self) -> bool {
        self.pending.is_some()
    }

    /// Opens a (possibly nested) batch.
    pub fn begin(&mut self) {
        self.depth += 1;
        debug!(depth = self.depth, "batch opened");
    }

    /// Records an invalidation. Returns the reason to fire now, or `None` while batched.
    pub fn invalidate(&mut self, reason: InvalidationReason) -> Option<InvalidationReason> {
        if self.depth == 0 {
            Some(reason)
        } else {
            // keep the first reason; later ones coalesce into it
            self.pending.get_or_insert(reason);
            None
        }
    }

    /// Closes one batch level.
    pub fn commit(&mut self) -> CommitOutcome {
        if self.depth == 0 {
            warn!("unbalanced batch commit ignored");
            return CommitOutcome {
                batch_closed: false,
                fire: None,
            };
        }

        self.depth -= 1;
        if self.depth > 0 {
            return CommitOutcome {
                batch_closed: false,
                fire: None,
            };
        }

        let fire = self.pending.take();
        debug!(coalesced = ?fire, "batch closed");
        CommitOutcome {
            batch_closed: true,
            fire,
        }
    }
}
