use crate::disk::DiskIo;
use crate::page::PAGE_SIZE;
use crate::typedef::PageId;
use crate::Result;
use fs2::FileExt;
use log::{debug, warn};
use pagepool_error::{errdata, errinput, Error};
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const EMPTY_BUFFER: &[u8] = &[0; PAGE_SIZE];

/// Stores pages in a single database file.
///
/// The file is truncated and locked exclusively for the lifetime of the manager. Page ids are
/// handed out in increasing order starting at 1; each page is mapped to a file offset, and
/// offsets of deallocated pages are reused before the file grows.
#[derive(Debug)]
pub struct DiskManager {
    file: File,
    path: PathBuf,
    /// The maximum capacity (in pages) that the file can hold before we resize it.
    page_capacity: usize,
    /// Tracks the highest page_id allocated so far.
    last_allocated_pid: PageId,
    /// Map from page_id -> file offset
    pages: HashMap<PageId, u64>,
    /// Free file offsets to reuse for future page allocations.
    free_slots: VecDeque<u64>,
    /// Number of page slots ever handed out; the next fresh offset is derived from it.
    used_slots: u64,
}

impl DiskManager {
    /// Creates a new disk manager for the database file at `path`.
    /// The file is truncated and locked exclusively at creation.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Open or create the file, truncating it
        let file = std::fs::OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::IO(format!("Unable to open file {}: {}", path.display(), e)))?;

        // Acquire an exclusive lock on the file at creation
        FileExt::lock_exclusive(&file)
            .map_err(|e| Error::IO(format!("Failed to acquire exclusive file lock: {}", e)))?;

        let mut dm = Self {
            file,
            path,
            page_capacity: 32, // Start with 32 as the default capacity
            last_allocated_pid: 0,
            pages: HashMap::new(),
            free_slots: VecDeque::new(),
            used_slots: 0,
        };

        // Initialize the file with enough space for `page_capacity + 1` pages
        dm.resize_file()?;

        Ok(dm)
    }

    /// Returns the number of allocated pages.
    pub fn allocated_pages(&self) -> usize {
        self.pages.len()
    }

    /// Returns the current size of the database file.
    pub fn get_db_file_size(&self) -> Result<u64> {
        self.file
            .metadata()
            .map(|meta| meta.len())
            .map_err(|e| Error::IO(format!("Failed to get file size: {}", e)))
    }

    fn offset_of(&self, page_id: PageId) -> Result<u64> {
        match self.pages.get(&page_id) {
            Some(&off) => Ok(off),
            None => errinput!("Page ID {} not found", page_id),
        }
    }

    /// Helper: For new pages, we either reuse a free offset from `free_slots` or append at the end.
    fn allocate_offset(&mut self) -> Result<u64> {
        // If we have a free offset from a previously deleted page, reuse it
        if let Some(off) = self.free_slots.pop_front() {
            return Ok(off);
        }

        if self.used_slots + 1 >= self.page_capacity as u64 {
            // resize (double capacity) if needed
            self.page_capacity *= 2;
            self.resize_file()?;
        }

        let offset = self.used_slots * PAGE_SIZE as u64;
        self.used_slots += 1;
        Ok(offset)
    }

    /// Maps `page_id` to a fresh slot and zeroes it on disk.
    fn allocate_page(&mut self, page_id: PageId) -> Result<()> {
        let offset = self.allocate_offset()?;
        self.pages.insert(page_id, offset);
        // Initialize the page with empty data
        self.write_page(page_id, EMPTY_BUFFER)
    }

    /// Returns the slots of pages `first..=last` that made it into the map. The ids are not
    /// handed out, since `last_allocated_pid` only moves once a whole run succeeds.
    fn release_partial_run(&mut self, first: PageId, last: PageId) {
        for pid in first..=last {
            if let Some(offset) = self.pages.remove(&pid) {
                self.free_slots.push_back(offset);
            }
        }
        warn!("rolled back partial allocation of pages {}..={}", first, last);
    }

    /// Resizes the underlying file to (page_capacity + 1) * PAGE_SIZE
    fn resize_file(&mut self) -> Result<()> {
        let size = (self.page_capacity as u64 + 1) * PAGE_SIZE as u64;
        self.file
            .set_len(size)
            .map_err(|e| Error::IO(format!("Failed to resize file: {}", e)))?;
        Ok(())
    }
}

impl DiskIo for DiskManager {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        if buf.len() != PAGE_SIZE {
            return errdata!("Read buffer must be exactly one page, got {} bytes", buf.len());
        }
        let offset = self.offset_of(page_id)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Write data to a page. Must not exceed PAGE_SIZE; shorter data leaves the tail untouched.
    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        if data.len() > PAGE_SIZE {
            return errdata!("Page data must fit in a page.");
        }
        let offset = self.offset_of(page_id)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.sync_all()?;
        Ok(())
    }

    fn allocate_run(&mut self, run_size: u32) -> Result<PageId> {
        if run_size == 0 {
            return errinput!("Cannot allocate a run of zero pages");
        }
        let first = self
            .last_allocated_pid
            .checked_add(1)
            .filter(|first| first.checked_add(run_size - 1).is_some())
            .ok_or_else(|| Error::InvalidData("Page id space exhausted".to_string()))?;

        let last = first + (run_size - 1);

        for pid in first..=last {
            if let Err(e) = self.allocate_page(pid) {
                self.release_partial_run(first, pid);
                return Err(e);
            }
        }
        self.last_allocated_pid = last;
        debug!("allocated pages {}..={}", first, last);
        Ok(first)
    }

    /// Deallocates a page and adds its offset to the free list.
    /// Returns an error if the page ID does not exist.
    fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        if let Some(offset) = self.pages.remove(&page_id) {
            self.free_slots.push_back(offset);
            Ok(())
        } else {
            errinput!("Page ID {} not found", page_id)
        }
    }
}

impl Drop for DiskManager {
    /// We unlock the file when the DiskManager is dropped.
    ///
    /// While the DiskManager is running it has exclusive access to the database file, so no
    /// other process can modify it concurrently.
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
