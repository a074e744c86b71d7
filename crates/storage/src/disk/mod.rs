use std::fmt::Debug;

use crate::{typedef::PageId, Result};

pub(crate) mod disk_manager;
pub(crate) mod memory;

pub use disk_manager::DiskManager;
pub use memory::MemoryDisk;

/// Page-granular disk access consumed by the buffer pool.
///
/// Implementations transfer whole pages and hand out page ids. Errors are returned to the
/// buffer pool unchanged; any retry policy belongs to the implementation.
pub trait DiskIo: Send + Debug {
    /// Fills `buf` with the on-disk content of `page_id`.
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()>;

    /// Persists `data` as the content of `page_id`.
    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()>;

    /// Reserves `run_size` contiguous page ids and returns the first one.
    fn allocate_run(&mut self, run_size: u32) -> Result<PageId>;

    /// Releases a page id for reuse.
    fn deallocate_page(&mut self, page_id: PageId) -> Result<()>;
}
