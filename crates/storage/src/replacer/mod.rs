pub(crate) mod clock_replacer;
pub(crate) mod lru_replacer;
pub(crate) mod replacer;

pub use clock_replacer::ClockReplacer;
pub use lru_replacer::LruReplacer;
pub use replacer::{FrameState, Replacer};
