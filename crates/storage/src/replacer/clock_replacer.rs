use log::trace;

use super::replacer::{FrameState, Replacer};
use crate::typedef::FrameId;

/// Clock ("second chance") replacement.
///
/// Every frame carries a [`FrameState`]. A frame that is unpinned becomes `Referenced`; the
/// first sweep that passes over it demotes it to `Available`, and only a later visit selects it.
/// The clock hand persists across calls, so successive sweeps continue where the last one
/// stopped.
#[derive(Debug)]
pub struct ClockReplacer {
    states: Vec<FrameState>,
    cursor: usize,
}

impl ClockReplacer {
    /// Creates a clock over `num_frames` frames, all `Available`, with the hand at frame 0.
    pub fn new(num_frames: usize) -> Self {
        Self {
            states: vec![FrameState::Available; num_frames],
            cursor: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> FrameId {
        self.cursor
    }

    fn set_state(&mut self, frame_id: FrameId, state: FrameState) {
        if let Some(slot) = self.states.get_mut(frame_id) {
            *slot = state;
        }
    }

    fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.states.len();
    }
}

impl Replacer for ClockReplacer {
    /// Sweeps at most two full turns. The first turn may demote every `Referenced` frame; the
    /// second then finds one of them `Available`. If neither turn selects a frame, every frame
    /// is pinned.
    fn pick_victim(&mut self, is_unpinned: &dyn Fn(FrameId) -> bool) -> Option<FrameId> {
        let num_frames = self.states.len();
        for _ in 0..(2 * num_frames) {
            let frame_id = self.cursor;
            match self.states[frame_id] {
                FrameState::Available => {
                    self.advance();
                    return Some(frame_id);
                }
                FrameState::Referenced if is_unpinned(frame_id) => {
                    trace!("clock: second chance used by frame {}", frame_id);
                    self.states[frame_id] = FrameState::Available;
                }
                // Pin count already dropped to zero but the unpin has not been reported yet.
                FrameState::Pinned if is_unpinned(frame_id) => {
                    self.advance();
                    return Some(frame_id);
                }
                _ => {}
            }
            self.advance();
        }
        None
    }

    /// Replays the sweep without demoting. A `Referenced` frame passed over on the first turn
    /// would be `Available` on the second.
    fn peek_victim(&self, is_unpinned: &dyn Fn(FrameId) -> bool) -> Option<FrameId> {
        let num_frames = self.states.len();
        for step in 0..(2 * num_frames) {
            let frame_id = (self.cursor + step) % num_frames;
            let second_turn = step >= num_frames;
            match self.states[frame_id] {
                FrameState::Available => return Some(frame_id),
                FrameState::Referenced if second_turn && is_unpinned(frame_id) => {
                    return Some(frame_id)
                }
                FrameState::Pinned if is_unpinned(frame_id) => return Some(frame_id),
                _ => {}
            }
        }
        None
    }

    fn notify_installed(&mut self, frame_id: FrameId) {
        self.set_state(frame_id, FrameState::Pinned);
    }

    fn notify_pinned(&mut self, frame_id: FrameId) {
        self.set_state(frame_id, FrameState::Pinned);
    }

    fn notify_unpinned(&mut self, frame_id: FrameId) {
        self.set_state(frame_id, FrameState::Referenced);
    }

    fn notify_freed(&mut self, frame_id: FrameId) {
        self.set_state(frame_id, FrameState::Available);
    }

    fn frame_state(&self, frame_id: FrameId) -> FrameState {
        self.states
            .get(frame_id)
            .copied()
            .unwrap_or(FrameState::Available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_unpinned(_: FrameId) -> bool {
        true
    }

    #[test]
    fn test_clock_replacer_new() {
        let replacer = ClockReplacer::new(4);
        assert_eq!(replacer.cursor(), 0);
        for frame_id in 0..4 {
            assert_eq!(replacer.frame_state(frame_id), FrameState::Available);
        }
    }

    #[test]
    fn test_clock_replacer_empty_pool_has_no_victim() {
        let mut replacer = ClockReplacer::new(0);
        assert_eq!(replacer.pick_victim(&all_unpinned), None);
    }

    #[test]
    fn test_clock_replacer_available_frames_in_order() {
        let mut replacer = ClockReplacer::new(3);

        // Fresh frames are handed out in clock order and installed right away.
        for expected in 0..3 {
            let victim = replacer.pick_victim(&all_unpinned);
            assert_eq!(victim, Some(expected));
            replacer.notify_installed(expected);
        }
        assert_eq!(replacer.cursor(), 0);
    }

    #[test]
    fn test_clock_replacer_all_pinned() {
        let mut replacer = ClockReplacer::new(3);
        for frame_id in 0..3 {
            replacer.notify_installed(frame_id);
        }

        assert_eq!(replacer.pick_victim(&|_| false), None);
        // Pinned frames are never demoted by a failed sweep.
        for frame_id in 0..3 {
            assert_eq!(replacer.frame_state(frame_id), FrameState::Pinned);
        }
    }

    #[test]
    fn test_clock_replacer_second_chance() {
        let mut replacer = ClockReplacer::new(2);
        replacer.notify_installed(0);
        replacer.notify_installed(1);

        // Frame 0 is released, frame 1 stays pinned.
        replacer.notify_unpinned(0);
        assert_eq!(replacer.frame_state(0), FrameState::Referenced);

        let pinned = |frame_id: FrameId| frame_id != 1;
        assert_eq!(replacer.pick_victim(&pinned), Some(0));
        assert_eq!(replacer.cursor(), 1);
    }

    #[test]
    fn test_clock_replacer_all_referenced_selects_start_frame() {
        let num_frames = 4;
        let mut replacer = ClockReplacer::new(num_frames);
        for frame_id in 0..num_frames {
            replacer.notify_installed(frame_id);
            replacer.notify_unpinned(frame_id);
        }

        // Move the hand off frame 0 so the start frame is not trivially the first one.
        replacer.cursor = 2;

        assert_eq!(replacer.pick_victim(&all_unpinned), Some(2));
        assert_eq!(replacer.cursor(), 3);
        // The first turn demoted every frame.
        for frame_id in 0..num_frames {
            assert_eq!(replacer.frame_state(frame_id), FrameState::Available);
        }
    }

    #[test]
    fn test_clock_replacer_transient_pinned_is_selected() {
        let mut replacer = ClockReplacer::new(2);
        replacer.notify_installed(0);
        replacer.notify_installed(1);

        // Frame 1 reached zero pins without an unpin notification.
        let unpinned = |frame_id: FrameId| frame_id == 1;
        assert_eq!(replacer.pick_victim(&unpinned), Some(1));
    }

    #[test]
    fn test_clock_replacer_referenced_but_pinned_is_skipped() {
        let mut replacer = ClockReplacer::new(2);
        replacer.notify_installed(0);
        replacer.notify_unpinned(0);
        replacer.notify_installed(1);

        // Frame 0 is marked referenced but a caller re-pinned it; it must keep its state.
        assert_eq!(replacer.pick_victim(&|_| false), None);
        assert_eq!(replacer.frame_state(0), FrameState::Referenced);
    }

    #[test]
    fn test_clock_replacer_cursor_persists() {
        let mut replacer = ClockReplacer::new(3);
        for frame_id in 0..3 {
            replacer.notify_installed(frame_id);
            replacer.notify_unpinned(frame_id);
        }

        // First search: demote 0, 1, 2, then select 0.
        assert_eq!(replacer.pick_victim(&all_unpinned), Some(0));
        replacer.notify_installed(0);

        // Second search resumes at frame 1, which is already available.
        assert_eq!(replacer.pick_victim(&all_unpinned), Some(1));
    }

    #[test]
    fn test_clock_replacer_free_makes_frame_available() {
        let mut replacer = ClockReplacer::new(3);
        for frame_id in 0..3 {
            replacer.notify_installed(frame_id);
        }
        replacer.notify_freed(2);
        assert_eq!(replacer.frame_state(2), FrameState::Available);

        let unpinned = |frame_id: FrameId| frame_id == 2;
        assert_eq!(replacer.pick_victim(&unpinned), Some(2));
    }

    #[test]
    fn test_clock_replacer_pin_after_unpin() {
        let mut replacer = ClockReplacer::new(1);
        replacer.notify_installed(0);
        replacer.notify_unpinned(0);
        replacer.notify_pinned(0);
        assert_eq!(replacer.frame_state(0), FrameState::Pinned);
        assert_eq!(replacer.pick_victim(&|_| false), None);
    }

    #[test]
    fn test_clock_replacer_out_of_bounds() {
        let mut replacer = ClockReplacer::new(2);

        // These should not panic
        replacer.notify_installed(100);
        replacer.notify_unpinned(100);
        replacer.notify_freed(100);

        assert_eq!(replacer.frame_state(100), FrameState::Available);
        assert_eq!(replacer.pick_victim(&all_unpinned), Some(0));
    }

    #[test]
    fn test_clock_replacer_peek_leaves_state_alone() {
        let num_frames = 3;
        let mut replacer = ClockReplacer::new(num_frames);
        for frame_id in 0..num_frames {
            replacer.notify_installed(frame_id);
            replacer.notify_unpinned(frame_id);
        }
        replacer.notify_pinned(0);
        let unpinned = |frame_id: FrameId| frame_id != 0;

        assert_eq!(replacer.peek_victim(&unpinned), Some(1));
        assert_eq!(replacer.cursor(), 0);
        for frame_id in 1..num_frames {
            assert_eq!(replacer.frame_state(frame_id), FrameState::Referenced);
        }

        // The real sweep lands on the same frame.
        assert_eq!(replacer.pick_victim(&unpinned), Some(1));
        assert_eq!(replacer.frame_state(2), FrameState::Available);
    }

    #[test]
    fn test_clock_replacer_peek_matches_pick() {
        let mut replacer = ClockReplacer::new(4);
        replacer.notify_installed(0);
        replacer.notify_installed(1);
        replacer.notify_unpinned(1);
        replacer.notify_installed(2);
        replacer.cursor = 1;
        let unpinned = |frame_id: FrameId| frame_id != 0;

        let peeked = replacer.peek_victim(&unpinned);
        assert_eq!(peeked, Some(2));
        assert_eq!(replacer.pick_victim(&unpinned), peeked);
        assert_eq!(ClockReplacer::new(0).peek_victim(&all_unpinned), None);
    }
}
