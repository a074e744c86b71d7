/// Identifier of a page on disk.
pub type PageId = u32;

/// Index of a frame in the buffer pool, in `0..pool_size`.
pub type FrameId = usize;
