use log::{debug, trace, warn};
use pagepool_error::{errinput, Error};

use crate::config::BufferPoolConfig;
use crate::disk::{DiskIo, DiskManager};
use crate::frame::PageFrame;
use crate::frame_handle::{PageGuard, PageHandle};
use crate::page::{PageBuf, PAGE_SIZE};
use crate::replacer::{FrameState, Replacer};
use crate::typedef::{FrameId, PageId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::Result;

/// How the content of a frame is produced when a pin misses the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinMode<'a> {
    /// Read the page from disk.
    DiskRead,
    /// Copy the given bytes into the frame. Shorter content is zero-padded to a full page.
    MemCopy(&'a [u8]),
    /// Leave the frame content as is. The caller must overwrite the whole page before reading it.
    NoOp,
}

/// Frame arena, page table and replacement state. Always accessed under the pool lock.
#[derive(Debug)]
struct PoolState {
    frames: Vec<PageFrame>,               // Storage for all frames in the buffer pool
    page_table: HashMap<PageId, FrameId>, // Maps resident page IDs to frame IDs
    replacer: Box<dyn Replacer>,          // Handles page replacement policy (e.g., clock)
    scratch: Box<PageBuf>,                // Disk reads land here before replacing a frame
}

/// Manages page caching and eviction over a fixed number of frames.
///
/// Every operation runs under a single lock covering the frame metadata, the page table and the
/// replacer, and the lock is held across disk I/O. Page content is reached through the
/// [`PageHandle`] returned by a pin and can be used without the pool lock until the matching
/// unpin. Callers must release content locks before calling back into the pool.
#[derive(Debug)]
pub struct BufferPoolManager {
    pool_size: usize,
    state: Mutex<PoolState>,
    disk: Arc<Mutex<dyn DiskIo>>, // Reads and writes pages on disk
}

impl PoolState {
    /// Pins `page_id` and returns the frame holding it.
    fn pin(&mut self, page_id: PageId, mode: PinMode<'_>, disk: &Mutex<dyn DiskIo>) -> Result<FrameId> {
        if let PinMode::MemCopy(content) = mode {
            if content.is_empty() {
                return errinput!("MemCopy pin of page {} requires content", page_id);
            }
            if content.len() > PAGE_SIZE {
                return errinput!(
                    "MemCopy content of {} bytes exceeds the page size of {}",
                    content.len(),
                    PAGE_SIZE
                );
            }
        }

        if let Some(&frame_id) = self.page_table.get(&page_id) {
            let frame = &mut self.frames[frame_id];
            // A hit never touches the content; MemCopy only applies to a miss.
            if matches!(mode, PinMode::MemCopy(_)) && frame.pin_count() > 0 {
                return errinput!("MemCopy pin of page {} which is already pinned", page_id);
            }
            let pin_cnt = frame.increment_pin_count();
            self.replacer.notify_pinned(frame_id);
            trace!("pin hit: page {} in frame {} (pin count {})", page_id, frame_id, pin_cnt);
            return Ok(frame_id);
        }

        // The replacer is only advanced once the write-back and the read have succeeded, so a
        // failed I/O leaves the victim, its mapping and every frame's replacement state as is.
        let frame_id = self.peek_victim()?;
        let written_back = self.flush_frame(frame_id, disk)?;
        if mode == PinMode::DiskRead {
            disk.lock()?.read_page(page_id, &mut self.scratch[..])?;
        }
        self.commit_victim(frame_id);

        match mode {
            PinMode::DiskRead => self.frames[frame_id].load(&self.scratch[..])?,
            PinMode::MemCopy(content) => self.frames[frame_id].load(content)?,
            PinMode::NoOp => {}
        }

        let frame = &mut self.frames[frame_id];
        let evicted = frame.page_id();
        frame.install(page_id);
        if let Some(old_page_id) = evicted {
            self.page_table.remove(&old_page_id);
            debug!(
                "evicted page {} from frame {} (written back: {})",
                old_page_id, frame_id, written_back
            );
        }
        self.page_table.insert(page_id, frame_id);
        self.replacer.notify_installed(frame_id);
        trace!("pin miss: page {} installed in frame {}", page_id, frame_id);
        Ok(frame_id)
    }

    /// Asks the replacer which frame with no pins it would give up, without advancing it.
    fn peek_victim(&self) -> Result<FrameId> {
        let frames = &self.frames;
        let frame_id = self
            .replacer
            .peek_victim(&|frame_id| frames.get(frame_id).is_some_and(|f| f.pin_count() == 0))
            .ok_or(Error::PoolExhausted)?;
        assert_eq!(
            self.frames[frame_id].pin_count(),
            0,
            "If a frame is picked by the replacer, its pin count must be 0."
        );
        Ok(frame_id)
    }

    /// Runs the replacer's sweep for real. Pin counts cannot change under the pool lock, so it
    /// lands on the frame `peek_victim` returned.
    fn commit_victim(&mut self, frame_id: FrameId) {
        let frames = &self.frames;
        let picked = self
            .replacer
            .pick_victim(&|frame_id| frames.get(frame_id).is_some_and(|f| f.pin_count() == 0));
        assert_eq!(picked, Some(frame_id), "Replacer sweep diverged from its peek.");
    }

    /// Writes the frame to disk if it holds a dirty page. Returns whether a write happened.
    fn flush_frame(&mut self, frame_id: FrameId, disk: &Mutex<dyn DiskIo>) -> Result<bool> {
        let frame = &mut self.frames[frame_id];
        let Some(page_id) = frame.page_id() else {
            return Ok(false);
        };
        if !frame.is_dirty() {
            return Ok(false);
        }
        {
            let data = frame.data().read()?;
            disk.lock()?.write_page(page_id, &data[..])?;
        }
        frame.clear_dirty();
        debug!("flushed page {} from frame {}", page_id, frame_id);
        Ok(true)
    }

    fn unpin(&mut self, page_id: PageId, is_dirty: bool) -> Result<()> {
        let frame_id = *self
            .page_table
            .get(&page_id)
            .ok_or(Error::PageNotResident(page_id))?;
        let frame = &mut self.frames[frame_id];

        // decrement pin count--must stay above zero
        let pin_cnt = frame.decrement_pin_count()?;
        frame.mark_dirty(is_dirty);

        if pin_cnt == 0 {
            self.replacer.notify_unpinned(frame_id);
        }
        trace!("unpin: page {} (pin count {}, dirty {})", page_id, pin_cnt, frame.is_dirty());
        Ok(())
    }

    fn free(&mut self, page_id: PageId, disk: &Mutex<dyn DiskIo>) -> Result<()> {
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            // can't free if the page is pinned
            if self.frames[frame_id].pin_count() > 0 {
                return Err(Error::PagePinned(page_id));
            }
        }

        disk.lock()?.deallocate_page(page_id)?;

        // The content is being discarded, so a dirty frame is not flushed.
        if let Some(frame_id) = self.page_table.remove(&page_id) {
            self.frames[frame_id].reset()?;
            self.replacer.notify_freed(frame_id);
            debug!("freed page {} and emptied frame {}", page_id, frame_id);
        } else {
            debug!("freed page {}", page_id);
        }
        Ok(())
    }

    fn unpinned_frame_count(&self) -> usize {
        self.frames.iter().filter(|f| f.pin_count() == 0).count()
    }

    fn frame_of(&self, page_id: PageId) -> Option<&PageFrame> {
        let frame_id = self.page_table.get(&page_id)?;
        Some(&self.frames[*frame_id])
    }
}

impl BufferPoolManager {
    /// Initializes the buffer pool with `pool_size` empty frames.
    pub fn new(
        pool_size: usize,
        disk: Arc<Mutex<dyn DiskIo>>,
        replacer: Box<dyn Replacer>,
    ) -> Self {
        let frames = (0..pool_size).map(PageFrame::new).collect();

        Self {
            pool_size,
            state: Mutex::new(PoolState {
                frames,
                page_table: HashMap::new(),
                replacer,
                scratch: Box::new([0; PAGE_SIZE]),
            }),
            disk,
        }
    }

    /// Builds a buffer pool over `disk` with the size and replacer named by `config`.
    pub fn from_config(config: &BufferPoolConfig, disk: Arc<Mutex<dyn DiskIo>>) -> Result<Self> {
        config.validate()?;
        let replacer = config.replacer.build(config.pool_size);
        Ok(Self::new(config.pool_size, disk, replacer))
    }

    /// Builds a buffer pool over a fresh database file at `config.data_file`.
    pub fn open(config: &BufferPoolConfig) -> Result<Self> {
        let Some(path) = &config.data_file else {
            return Err(Error::Config(
                "data_file is required to open a file-backed buffer pool".to_string(),
            ));
        };
        let disk = Arc::new(Mutex::new(DiskManager::new(path)?));
        Self::from_config(config, disk)
    }

    fn lock(&self) -> Result<MutexGuard<'_, PoolState>> {
        Ok(self.state.lock()?)
    }

    /// Pins a page and returns a handle to its content.
    ///
    /// If the page is resident this only increments its pin count. Otherwise a victim frame is
    /// chosen by the replacer, written back if dirty, and filled according to `mode`.
    pub fn pin(&self, page_id: PageId, mode: PinMode<'_>) -> Result<PageHandle> {
        let mut state = self.lock()?;
        let frame_id = state.pin(page_id, mode, &self.disk)?;
        Ok(PageHandle::new(page_id, &state.frames[frame_id]))
    }

    /// Releases one pin on a page. `is_dirty` is ORed into the page's dirty flag.
    pub fn unpin(&self, page_id: PageId, is_dirty: bool) -> Result<()> {
        self.lock()?.unpin(page_id, is_dirty)
    }

    /// Allocates `run_size` contiguous pages on disk and pins the first one with
    /// `initial_content`. Pages after the first are left to the caller.
    pub fn allocate(&self, run_size: u32, initial_content: &[u8]) -> Result<PageId> {
        Ok(self.allocate_pinned(run_size, initial_content)?.page_id())
    }

    fn allocate_pinned(&self, run_size: u32, initial_content: &[u8]) -> Result<PageHandle> {
        if run_size == 0 {
            return errinput!("Cannot allocate a run of zero pages");
        }
        if initial_content.is_empty() || initial_content.len() > PAGE_SIZE {
            return errinput!(
                "Initial content must be 1..={} bytes, got {}",
                PAGE_SIZE,
                initial_content.len()
            );
        }

        let mut state = self.lock()?;
        if state.unpinned_frame_count() == 0 {
            return Err(Error::PoolExhausted);
        }

        let first = self.disk.lock()?.allocate_run(run_size)?;
        match state.pin(first, PinMode::MemCopy(initial_content), &self.disk) {
            Ok(frame_id) => Ok(PageHandle::new(first, &state.frames[frame_id])),
            Err(e) => {
                // Give the run back so a failed allocation does not leak disk pages.
                let mut disk = self.disk.lock()?;
                for page_id in first..=first + (run_size - 1) {
                    if let Err(de) = disk.deallocate_page(page_id) {
                        warn!("could not roll back allocation of page {}: {}", page_id, de);
                    }
                }
                Err(e)
            }
        }
    }

    /// Deallocates a page on disk and drops it from the pool without writing it back.
    pub fn free(&self, page_id: PageId) -> Result<()> {
        self.lock()?.free(page_id, &self.disk)
    }

    /// Writes a resident page to disk if it is dirty.
    pub fn flush(&self, page_id: PageId) -> Result<()> {
        let mut state = self.lock()?;
        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(Error::PageNotResident(page_id))?;
        state.flush_frame(frame_id, &self.disk)?;
        Ok(())
    }

    /// Writes every dirty resident page to disk, visiting each frame once.
    pub fn flush_all(&self) -> Result<()> {
        let mut state = self.lock()?;
        let mut written = 0;
        for frame_id in 0..state.frames.len() {
            if state.flush_frame(frame_id, &self.disk)? {
                written += 1;
            }
        }
        debug!("flush_all wrote {} pages", written);
        Ok(())
    }

    /// Returns the total number of frames in the buffer pool.
    pub fn frame_count(&self) -> usize {
        self.pool_size
    }

    /// Returns the number of frames with a pin count of zero, empty frames included.
    pub fn unpinned_frame_count(&self) -> Result<usize> {
        Ok(self.lock()?.unpinned_frame_count())
    }

    /// Returns the number of frames holding a page.
    pub fn resident_count(&self) -> Result<usize> {
        Ok(self.lock()?.page_table.len())
    }

    pub fn contains(&self, page_id: PageId) -> Result<bool> {
        Ok(self.lock()?.page_table.contains_key(&page_id))
    }

    /// Returns the pin count of a page, or `None` if it is not in the buffer pool.
    pub fn pin_count(&self, page_id: PageId) -> Result<Option<u32>> {
        Ok(self.lock()?.frame_of(page_id).map(|f| f.pin_count()))
    }

    /// Returns the dirty flag of a page, or `None` if it is not in the buffer pool.
    pub fn is_dirty(&self, page_id: PageId) -> Result<Option<bool>> {
        Ok(self.lock()?.frame_of(page_id).map(|f| f.is_dirty()))
    }

    /// Returns the frame holding a page, or `None` if it is not in the buffer pool.
    pub fn frame_id_of(&self, page_id: PageId) -> Result<Option<FrameId>> {
        Ok(self.lock()?.page_table.get(&page_id).copied())
    }

    /// Returns the replacement state of a frame.
    pub fn frame_state(&self, frame_id: FrameId) -> Result<FrameState> {
        Ok(self.lock()?.replacer.frame_state(frame_id))
    }

    /// Pins a page and returns a guard that unpins it when dropped.
    pub fn pin_guard(&self, page_id: PageId, mode: PinMode<'_>) -> Result<PageGuard<'_>> {
        Ok(PageGuard::new(self, self.pin(page_id, mode)?))
    }

    /// Fetches a page from disk (or the pool) behind a guard.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PageGuard<'_>> {
        self.pin_guard(page_id, PinMode::DiskRead)
    }

    /// Allocates a single page holding `initial_content` and returns it behind a guard.
    /// The page is reported dirty when the guard drops, since its content is not on disk yet.
    pub fn create_page(&self, initial_content: &[u8]) -> Result<PageGuard<'_>> {
        let handle = self.allocate_pinned(1, initial_content)?;
        Ok(PageGuard::new_dirty(self, handle))
    }
}
