pub const PAGE_SIZE: usize = 4096;

/// The content of one page, as held by a frame or transferred to and from disk.
pub type PageBuf = [u8; PAGE_SIZE];
