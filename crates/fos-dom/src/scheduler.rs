//! Animation Frames
//!
//! `requestAnimationFrame` queue. Callbacks requested while a frame runs are
//! deferred to the following frame.

use crate::Dom;

/// Handle returned by [`Dom::request_animation_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

pub(crate) type FrameCallback = Box<dyn FnOnce(&Dom)>;

#[derive(Default)]
pub(crate) struct FrameQueue {
    next_id: u64,
    pending: Vec<(FrameId, FrameCallback)>,
}

impl FrameQueue {
    pub(crate) fn request(&mut self, callback: FrameCallback) -> FrameId {
        self.next_id += 1;
        let id = FrameId(self.next_id);
        self.pending.push((id, callback));
        id
    }

    pub(crate) fn cancel(&mut self, id: FrameId) -> Option<FrameCallback> {
        let pos = self.pending.iter().position(|(frame, _)| *frame == id)?;
        Some(self.pending.remove(pos).1)
    }

    /// Take the callbacks belonging to the current frame
    pub(crate) fn take_frame(&mut self) -> Vec<FrameCallback> {
        self.pending.drain(..).map(|(_, cb)| cb).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
