use std::collections::HashMap;

use bytes::Bytes;
use pagepool_error::{errdata, errinput, Error};

use crate::disk::DiskIo;
use crate::page::PAGE_SIZE;
use crate::typedef::PageId;
use crate::Result;

static ZERO_PAGE: [u8; PAGE_SIZE] = [0; PAGE_SIZE];

/// An in-memory disk. Pages are kept as immutable `Bytes` snapshots of their last write.
///
/// Counts every transfer and can be told to fail reads or writes, which makes it the disk of
/// choice for exercising the buffer pool's I/O paths.
#[derive(Debug, Default)]
pub struct MemoryDisk {
    pages: HashMap<PageId, Bytes>,
    last_allocated_pid: PageId,
    reads: usize,
    writes: HashMap<PageId, usize>,
    deallocations: usize,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemoryDisk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored content of a page, if it is allocated.
    pub fn page(&self, page_id: PageId) -> Option<Bytes> {
        self.pages.get(&page_id).cloned()
    }

    pub fn is_allocated(&self, page_id: PageId) -> bool {
        self.pages.contains_key(&page_id)
    }

    /// Number of successful page reads.
    pub fn read_count(&self) -> usize {
        self.reads
    }

    /// Number of successful page writes, across all pages.
    pub fn write_count(&self) -> usize {
        self.writes.values().sum()
    }

    /// Number of successful writes of one page.
    pub fn writes_of(&self, page_id: PageId) -> usize {
        self.writes.get(&page_id).copied().unwrap_or(0)
    }

    /// Number of successful deallocations.
    pub fn deallocation_count(&self) -> usize {
        self.deallocations
    }

    /// Makes every subsequent read fail with an IO error until reset.
    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Makes every subsequent write fail with an IO error until reset.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl DiskIo for MemoryDisk {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        if self.fail_reads {
            return Err(Error::IO(format!("injected read failure on page {}", page_id)));
        }
        if buf.len() != PAGE_SIZE {
            return errdata!("Read buffer must be exactly one page, got {} bytes", buf.len());
        }
        let Some(content) = self.pages.get(&page_id) else {
            return errinput!("Page ID {} not found", page_id);
        };
        buf.copy_from_slice(content);
        self.reads += 1;
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(Error::IO(format!("injected write failure on page {}", page_id)));
        }
        if data.len() > PAGE_SIZE {
            return errdata!("Page data must fit in a page.");
        }
        let Some(slot) = self.pages.get_mut(&page_id) else {
            return errinput!("Page ID {} not found", page_id);
        };
        let mut content = data.to_vec();
        content.resize(PAGE_SIZE, 0);
        *slot = Bytes::from(content);
        *self.writes.entry(page_id).or_insert(0) += 1;
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
            self.pages.insert(pid, Bytes::from_static(&ZERO_PAGE));
        }
        self.last_allocated_pid = last;
        Ok(first)
    }

    fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        if self.pages.remove(&page_id).is_none() {
            return errinput!("Page ID {} not found", page_id);
        }
        self.deallocations += 1;
        Ok(())
    }
}
