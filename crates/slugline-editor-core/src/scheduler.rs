//! Deferred binder work.
//!
//! Two kinds of work wait for a later tick: a coalesced document
//! re-initialization (single slot, last request wins) and the cursor
//! placeholder fix, which must run exactly one tick after it was scheduled.

use std::time::Duration;

use web_time::Instant;

use crate::element::ElementId;

/// Work that came due on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Remove the placeholder from the block linked to `element` and
    /// reposition the cursor.
    CursorFix { element: ElementId },
    InitializeDocument,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    initialize_delay: Duration,
    pending_initialize: Option<Instant>,
    pending_cursor_fix: Option<ElementId>,
}

impl Scheduler {
    pub fn new(initialize_delay: Duration) -> Self {
        Self {
            initialize_delay,
            pending_initialize: None,
            pending_cursor_fix: None,
        }
    }

    /// Schedule a re-initialization, replacing any earlier pending request.
    pub fn request_initialize(&mut self, now: Instant) {
        if self.pending_initialize.is_some() {
            tracing::trace!(target: "slugline::binder", "coalescing initialize request");
        }
        self.pending_initialize = Some(now + self.initialize_delay);
    }

    pub fn cancel_initialize(&mut self) {
        self.pending_initialize = None;
    }

    pub fn is_initialize_pending(&self) -> bool {
        self.pending_initialize.is_some()
    }

    pub fn schedule_cursor_fix(&mut self, element: ElementId) {
        self.pending_cursor_fix = Some(element);
    }

    pub fn is_idle(&self) -> bool {
        self.pending_initialize.is_none() && self.pending_cursor_fix.is_none()
    }

    /// When the next piece of work is due, if any.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        if self.pending_cursor_fix.is_some() {
            return Some(now);
        }
        self.pending_initialize
    }

    /// Take the work that is due at `now`. A cursor fix is always due.
    pub fn tick(&mut self, now: Instant) -> Vec<DeferredTask> {
        let mut due = Vec::new();
        if let Some(element) = self.pending_cursor_fix.take() {
            due.push(DeferredTask::CursorFix { element });
        }
        if self.pending_initialize.is_some_and(|deadline| deadline <= now) {
            self.pending_initialize = None;
            due.push(DeferredTask::InitializeDocument);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_initialize_request_wins() {
        let mut scheduler = Scheduler::new(Duration::from_millis(100));
        let t0 = Instant::now();
        scheduler.request_initialize(t0);
        scheduler.request_initialize(t0 + Duration::from_millis(80));

        // The first deadline has passed, but it was superseded.
        assert!(scheduler.tick(t0 + Duration::from_millis(120)).is_empty());
        assert_eq!(
            scheduler.tick(t0 + Duration::from_millis(180)),
            vec![DeferredTask::InitializeDocument]
        );
        assert!(scheduler.tick(t0 + Duration::from_millis(400)).is_empty());
    }

    #[test]
    fn test_cursor_fix_runs_on_next_tick_only() {
        let mut scheduler = Scheduler::new(Duration::from_millis(100));
        let element = ElementId {
            index: 3,
            generation: 1,
        };
        scheduler.schedule_cursor_fix(element);
        let now = Instant::now();
        assert_eq!(
            scheduler.tick(now),
            vec![DeferredTask::CursorFix { element }]
        );
        assert!(scheduler.tick(now).is_empty());
        assert!(scheduler.is_idle());
    }
}
