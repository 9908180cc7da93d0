use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FrameId(pub u64);

/// "Call me back on the next frame" capability.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameId;
    fn cancel_frame(&mut self, id: FrameId);
}

/// Single-slot frame queue. The driver loop pulls the due frame with
/// [`FrameQueue::take_due`] once per frame interval and hands it back to the
/// controller. Requests and cancellations are counted for inspection.
#[derive(Debug, Default)]
pub struct FrameQueue {
    next_id: u64,
    pending: Option<FrameId>,
    pub requested: u64,
    pub cancelled: Vec<FrameId>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<FrameId> {
        self.pending
    }

    pub fn take_due(&mut self) -> Option<FrameId> {
        self.pending.take()
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameId {
        self.next_id += 1;
        let id = FrameId(self.next_id);
        self.pending = Some(id);
        self.requested += 1;
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if self.pending == Some(id) {
            self.pending = None;
        }
        self.cancelled.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_fresh_and_cancel_clears_slot() {
        let mut q = FrameQueue::new();
        let a = q.request_frame();
        let b = q.request_frame();
        assert_ne!(a, b);
        assert_eq!(q.pending(), Some(b));
        q.cancel_frame(a);
        assert_eq!(q.pending(), Some(b));
        q.cancel_frame(b);
        assert_eq!(q.pending(), None);
        assert_eq!(q.cancelled, vec![a, b]);
    }

    #[test]
    fn take_due_empties_slot() {
        let mut q = FrameQueue::new();
        let a = q.request_frame();
        assert_eq!(q.take_due(), Some(a));
        assert_eq!(q.take_due(), None);
    }
}
