/// Cancellation token for one scheduled render-loop invocation.
///
/// Handles are never reused: each schedule issues a fresh id, so a callback
/// that fires with a handle cancelled in the meantime can be told apart from
/// the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// Bookkeeping for the self-rescheduling frame loop.
///
/// The actual wake-up source (a redraw request, a display-refresh callback)
/// lives outside; this type owns the invariant that at most one frame is
/// outstanding at any time and that cancelled callbacks are rejected when
/// they eventually fire.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    next_id: u64,
    pending: Option<FrameHandle>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the handle for the next frame. Replaces (and thereby cancels)
    /// any still-pending handle, which indicates a caller bug upstream.
    pub fn schedule(&mut self) -> FrameHandle {
        if let Some(stale) = self.pending {
            log::warn!("Frame {:?} was still pending and has been superseded", stale);
        }
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.pending = Some(handle);
        handle
    }

    /// Cancels the pending frame, if any. Returns the cancelled handle.
    pub fn cancel(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Claims a fired callback. Returns `true` and clears the pending slot
    /// iff `handle` is the live one; a stale handle leaves the slot alone.
    pub fn acquire(&mut self, handle: FrameHandle) -> bool {
        if self.pending == Some(handle) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_issues_distinct_handles() {
        let mut scheduler = FrameScheduler::new();
        let a = scheduler.schedule();
        scheduler.cancel();
        let b = scheduler.schedule();
        assert_ne!(a, b, "handles must never be reused");
    }

    #[test]
    fn at_most_one_frame_is_pending() {
        let mut scheduler = FrameScheduler::new();
        scheduler.schedule();
        scheduler.schedule();
        assert!(scheduler.has_pending());
        scheduler.cancel();
        assert!(!scheduler.has_pending(), "cancel must clear the single slot");
    }

    #[test]
    fn acquire_claims_only_the_live_handle() {
        let mut scheduler = FrameScheduler::new();
        let live = scheduler.schedule();
        assert!(scheduler.acquire(live));
        assert!(!scheduler.has_pending(), "acquire consumes the pending slot");
        assert!(!scheduler.acquire(live), "a handle cannot be claimed twice");
    }

    #[test]
    fn cancelled_handle_is_rejected_when_it_fires() {
        let mut scheduler = FrameScheduler::new();
        let cancelled = scheduler.schedule();
        scheduler.cancel();
        let live = scheduler.schedule();

        assert!(!scheduler.acquire(cancelled), "cancelled callback must be dropped");
        assert!(
            scheduler.has_pending(),
            "a stale acquire must not disturb the live handle"
        );
        assert!(scheduler.acquire(live));
    }

    #[test]
    fn superseded_handle_is_rejected() {
        let mut scheduler = FrameScheduler::new();
        let first = scheduler.schedule();
        let second = scheduler.schedule();
        assert!(!scheduler.acquire(first));
        assert!(scheduler.acquire(second));
    }
}
