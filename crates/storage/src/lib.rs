//! A fixed-size page cache with clock (second-chance) replacement.
pub(crate) mod buffer_pool;
pub(crate) mod config;
pub(crate) mod disk;
pub(crate) mod frame;
pub(crate) mod frame_handle;
pub(crate) mod page;
pub(crate) mod replacer;
pub(crate) mod typedef;

pub use buffer_pool::{BufferPoolManager, PinMode};
pub use crate::config::{BufferPoolConfig, ReplacerKind};
pub use disk::{DiskIo, DiskManager, MemoryDisk};
pub use frame_handle::{PageGuard, PageHandle};
pub use page::{PageBuf, PAGE_SIZE};
pub use pagepool_error::{Error, Result};
pub use replacer::{ClockReplacer, FrameState, LruReplacer, Replacer};
pub use typedef::{FrameId, PageId};
