use crate::buffer_pool::BufferPoolManager;
use crate::frame::PageFrame;
use crate::page::{PageBuf, PAGE_SIZE};
use crate::typedef::{FrameId, PageId};
use crate::Result;
use core::fmt;
use log::warn;
use pagepool_error::errinput;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Access to the content of a pinned page.
///
/// A handle is produced by every successful pin and stays meaningful until the matching unpin.
/// It does not unpin on drop; pair it with [`BufferPoolManager::unpin`], or use a
/// [`PageGuard`] instead.
pub struct PageHandle {
    page_id: PageId,
    frame_id: FrameId,
    data: Arc<RwLock<PageBuf>>,
}

impl fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageHandle")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame_id)
            .finish()
    }
}

impl PageHandle {
    pub(crate) fn new(page_id: PageId, frame: &PageFrame) -> Self {
        PageHandle {
            page_id,
            frame_id: frame.frame_id(),
            data: Arc::clone(frame.data()),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the index of the frame holding the page.
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Acquires a read lock on the page content.
    pub fn read(&self) -> Result<RwLockReadGuard<'_, PageBuf>> {
        Ok(self.data.read()?)
    }

    /// Acquires a write lock on the page content. Writing does not mark the page dirty; the
    /// caller reports that when unpinning.
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, PageBuf>> {
        Ok(self.data.write()?)
    }
}

/// A pinned page that unpins itself when dropped.
///
/// The page is reported dirty on drop if mutable access was ever taken through the guard.
pub struct PageGuard<'a> {
    bpm: &'a BufferPoolManager,
    handle: PageHandle,
    is_dirty: bool,
}

impl fmt::Debug for PageGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageGuard")
            .field("handle", &self.handle)
            .field("is_dirty", &self.is_dirty)
            .finish()
    }
}

impl<'a> PageGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, handle: PageHandle) -> Self {
        PageGuard {
            bpm,
            handle,
            is_dirty: false,
        }
    }

    /// A guard over a page whose content only exists in memory.
    pub(crate) fn new_dirty(bpm: &'a BufferPoolManager, handle: PageHandle) -> Self {
        PageGuard {
            bpm,
            handle,
            is_dirty: true,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.handle.page_id()
    }

    pub fn frame_id(&self) -> FrameId {
        self.handle.frame_id()
    }

    /// Provides read-only access to page data.
    pub fn data(&self) -> Result<RwLockReadGuard<'_, PageBuf>> {
        self.handle.read()
    }

    /// Provides mutable access to page data and marks the page dirty.
    pub fn data_mut(&mut self) -> Result<RwLockWriteGuard<'_, PageBuf>> {
        self.is_dirty = true;
        self.handle.write()
    }

    /// Writes `data` to the page at the given offset.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        if offset + data.len() > PAGE_SIZE {
            return errinput!(
                "Write of {} bytes at offset {} is out of page bounds",
                data.len(),
                offset
            );
        }
        let mut page = self.data_mut()?;
        page[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.bpm.unpin(self.handle.page_id(), self.is_dirty) {
            warn!(
                "page guard for page {} could not unpin: {}",
                self.handle.page_id(),
                e
            );
        }
    }
}
