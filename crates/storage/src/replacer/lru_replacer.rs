use crate::typedef::FrameId;
use std::collections::HashMap;

use super::replacer::{FrameState, Replacer};

#[derive(Debug)]
struct LruNode {
    is_evictable: bool,
    last_accessed_timestamp: u64,
}

/// Least-recently-used replacement.
///
/// Empty frames are always preferred. Among resident frames the one released longest ago is
/// chosen.
#[derive(Debug)]
pub struct LruReplacer {
    num_frames: usize,
    node_store: HashMap<FrameId, LruNode>,
    current_timestamp: u64,
}

impl LruReplacer {
    pub fn new(num_frames: usize) -> Self {
        LruReplacer {
            num_frames,
            node_store: HashMap::new(),
            current_timestamp: 0,
        }
    }

    fn current_timestamp(&mut self) -> u64 {
        let old_timestamp = self.current_timestamp;
        self.current_timestamp += 1;
        old_timestamp
    }

    /// Records an access and updates the evictability of the frame.
    /// Creates a new node if the frame has not been seen before.
    fn record_access(&mut self, frame_id: FrameId, is_evictable: bool) {
        if frame_id >= self.num_frames {
            return;
        }
        let timestamp = self.current_timestamp();
        let node = self.node_store.entry(frame_id).or_insert(LruNode {
            is_evictable,
            last_accessed_timestamp: timestamp,
        });
        node.is_evictable = is_evictable;
        node.last_accessed_timestamp = timestamp;
    }
}

impl Replacer for LruReplacer {
    fn pick_victim(&mut self, is_unpinned: &dyn Fn(FrameId) -> bool) -> Option<FrameId> {
        self.peek_victim(is_unpinned)
    }

    fn peek_victim(&self, is_unpinned: &dyn Fn(FrameId) -> bool) -> Option<FrameId> {
        if let Some(empty) = (0..self.num_frames).find(|f| !self.node_store.contains_key(f)) {
            return Some(empty);
        }
        self.node_store
            .iter()
            .filter(|&(&frame_id, node)| node.is_evictable && is_unpinned(frame_id))
            .min_by_key(|(_, node)| node.last_accessed_timestamp)
            .map(|(&frame_id, _)| frame_id)
    }

    fn notify_installed(&mut self, frame_id: FrameId) {
        self.record_access(frame_id, false);
    }

    fn notify_pinned(&mut self, frame_id: FrameId) {
        self.record_access(frame_id, false);
    }

    fn notify_unpinned(&mut self, frame_id: FrameId) {
        self.record_access(frame_id, true);
    }

    fn notify_freed(&mut self, frame_id: FrameId) {
        self.node_store.remove(&frame_id);
    }

    fn frame_state(&self, frame_id: FrameId) -> FrameState {
        match self.node_store.get(&frame_id) {
            None => FrameState::Available,
            Some(node) if node.is_evictable => FrameState::Referenced,
            Some(_) => FrameState::Pinned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_replacer_prefers_empty_frames() {
        let mut replacer = LruReplacer::new(3);
        replacer.notify_installed(0);
        replacer.notify_unpinned(0);

        assert_eq!(replacer.pick_victim(&|_| true), Some(1));
    }

    #[test]
    fn test_lru_replacer_evicts_least_recently_released() {
        let mut replacer = LruReplacer::new(3);
        for frame_id in 0..3 {
            replacer.notify_installed(frame_id);
        }
        replacer.notify_unpinned(2);
        replacer.notify_unpinned(0);
        replacer.notify_unpinned(1);

        assert_eq!(replacer.pick_victim(&|_| true), Some(2));

        // Re-pinning frame 2 refreshes it and takes it out of the running.
        replacer.notify_pinned(2);
        assert_eq!(replacer.pick_victim(&|f| f != 2), Some(0));
    }

    #[test]
    fn test_lru_replacer_all_pinned() {
        let mut replacer = LruReplacer::new(2);
        replacer.notify_installed(0);
        replacer.notify_installed(1);
        assert_eq!(replacer.pick_victim(&|_| false), None);
        assert_eq!(replacer.frame_state(0), FrameState::Pinned);
    }

    #[test]
    fn test_lru_replacer_freed_frame_is_empty_again() {
        let mut replacer = LruReplacer::new(2);
        replacer.notify_installed(0);
        replacer.notify_installed(1);
        replacer.notify_unpinned(1);
        assert_eq!(replacer.frame_state(1), FrameState::Referenced);

        replacer.notify_freed(1);
        assert_eq!(replacer.frame_state(1), FrameState::Available);
        assert_eq!(replacer.pick_victim(&|f| f == 1), Some(1));
    }
}
