use std::fmt::Debug;

use crate::typedef::FrameId;

/// Replacement state of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// Empty, or evictable with no second chance pending.
    Available,
    /// Unpinned at least once since its last pin; gets one more sweep before eviction.
    Referenced,
    /// In active use by at least one caller.
    Pinned,
}

/// Page replacement policy used by the buffer pool to choose eviction victims.
///
/// The buffer pool owns the pin counts; a replacer only sees them through the `is_unpinned`
/// callback passed to [`Replacer::pick_victim`], so the two can never disagree about whether a
/// frame is in use.
pub trait Replacer: Send + Sync + Debug {
    /// Chooses a frame whose content may be replaced.
    /// Returns `None` if every frame is pinned.
    fn pick_victim(&mut self, is_unpinned: &dyn Fn(FrameId) -> bool) -> Option<FrameId>;

    /// Returns the frame [`Replacer::pick_victim`] would choose, without changing any state.
    fn peek_victim(&self, is_unpinned: &dyn Fn(FrameId) -> bool) -> Option<FrameId>;

    /// A page was just installed into the frame with its first pin.
    fn notify_installed(&mut self, frame_id: FrameId);

    /// The frame's resident page received an additional pin.
    fn notify_pinned(&mut self, frame_id: FrameId);

    /// The frame's pin count dropped to zero.
    fn notify_unpinned(&mut self, frame_id: FrameId);

    /// The frame's page was freed and the frame is empty again.
    fn notify_freed(&mut self, frame_id: FrameId);

    /// Returns the replacement state of the frame.
    fn frame_state(&self, frame_id: FrameId) -> FrameState;
}
