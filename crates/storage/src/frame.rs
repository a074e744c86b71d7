use core::fmt;
use std::sync::{Arc, RwLock};

use pagepool_error::Error;

use crate::{
    page::{PageBuf, PAGE_SIZE},
    typedef::{FrameId, PageId},
    Result,
};

/// One slot of the buffer pool: the page content plus residency metadata.
///
/// The metadata fields are only touched while the pool lock is held. The content lives behind
/// its own `RwLock` so that a pinned page can be read or written without holding the pool lock.
pub struct PageFrame {
    frame_id: FrameId,            // Position in the frame arena, never changes
    page_id: Option<PageId>,      // Resident page, `None` when the frame is empty
    is_dirty: bool,               // Content differs from the on-disk copy
    pin_cnt: u32,                 // Number of outstanding pins
    data: Arc<RwLock<PageBuf>>,   // Page content shared with handles
}

impl fmt::Debug for PageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrame")
            .field("frame_id", &self.frame_id)
            .field("page_id", &self.page_id)
            .field("is_dirty", &self.is_dirty)
            .field("pin_cnt", &self.pin_cnt)
            .finish()
    }
}

impl PageFrame {
    /// Creates an empty, clean, unpinned frame.
    pub(crate) fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            page_id: None,
            is_dirty: false,
            pin_cnt: 0,
            data: Arc::new(RwLock::new([0; PAGE_SIZE])),
        }
    }

    pub(crate) fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the resident page, if any.
    pub(crate) fn page_id(&self) -> Option<PageId> {
        self.page_id
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub(crate) fn pin_count(&self) -> u32 {
        self.pin_cnt
    }

    /// Returns the shared content lock of this frame.
    pub(crate) fn data(&self) -> &Arc<RwLock<PageBuf>> {
        &self.data
    }

    /// ORs `dirty` into the dirty flag. Only `clear_dirty` can reset it.
    pub(crate) fn mark_dirty(&mut self, dirty: bool) {
        self.is_dirty |= dirty;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.is_dirty = false;
    }

    /// Makes `page_id` resident in this frame with a single pin and clean content.
    pub(crate) fn install(&mut self, page_id: PageId) {
        self.page_id = Some(page_id);
        self.pin_cnt = 1;
        self.is_dirty = false;
    }

    /// Increments the pin count by 1 and returns the new count.
    pub(crate) fn increment_pin_count(&mut self) -> u32 {
        self.pin_cnt += 1;
        self.pin_cnt
    }

    /// Decrements the pin count by 1 and returns the new count.
    /// Fails if the count is already zero.
    pub(crate) fn decrement_pin_count(&mut self) -> Result<u32> {
        match self.pin_cnt.checked_sub(1) {
            Some(pin_cnt) => {
                self.pin_cnt = pin_cnt;
                Ok(pin_cnt)
            }
            None => Err(Error::PageNotPinned(self.page_id.unwrap_or_default())),
        }
    }

    /// Copies `content` into the frame, zero-filling the remainder of the page.
    pub(crate) fn load(&self, content: &[u8]) -> Result<()> {
        if content.len() > PAGE_SIZE {
            return Err(Error::InvalidInput(format!(
                "Page content of {} bytes exceeds the page size of {}",
                content.len(),
                PAGE_SIZE
            )));
        }
        let mut data = self.data.write()?;
        data[..content.len()].copy_from_slice(content);
        data[content.len()..].fill(0);
        Ok(())
    }

    /// Resets the frame to its initial empty state, discarding the content.
    pub(crate) fn reset(&mut self) -> Result<()> {
        self.page_id = None;
        self.pin_cnt = 0;
        self.is_dirty = false;
        self.data.write()?.fill(0);
        Ok(())
    }
}
