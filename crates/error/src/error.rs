pub type Result<T> = std::result::Result<T, Error>;
impl<T> From<Error> for Result<T> {
    fn from(e: Error) -> Self {
        Err(e)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Invalid data, which typically includes decoding errors or unexpected internal values.
    InvalidData(String),
    /// Invalid caller input, such as a `MemCopy` pin without content.
    InvalidInput(String),
    /// An IO error has occurred in the disk layer.
    IO(String),
    /// Configuration could not be loaded or is out of range.
    Config(String),
    /// Every frame in the buffer pool is pinned; no victim can be chosen.
    PoolExhausted,
    /// The page is not resident in the buffer pool.
    PageNotResident(u32),
    /// The page is resident but its pin count is already zero.
    PageNotPinned(u32),
    /// The page cannot be freed because it is still pinned.
    PagePinned(u32),
}

impl std::error::Error for Error {}
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::IO(msg) => write!(f, "IO error: {}", msg),
            Error::Config(msg) => write!(f, "Config error: {}", msg),
            Error::PoolExhausted => write!(f, "Buffer pool exhausted: all frames are pinned"),
            Error::PageNotResident(page_id) => {
                write!(f, "Page {} is not resident in the buffer pool", page_id)
            }
            Error::PageNotPinned(page_id) => {
                write!(f, "Cannot unpin page {}: pin count is already zero", page_id)
            }
            Error::PagePinned(page_id) => {
                write!(f, "Cannot free page {}: Page is still pinned", page_id)
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IO(e.to_string())
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(e: std::num::TryFromIntError) -> Self {
        Error::InvalidData(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        // This occurs when a different thread panics while holding the pool or a frame lock.
        // Frame metadata may be half-updated at that point, so we panic here too.
        panic!("{e}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_page() {
        assert_eq!(
            Error::PagePinned(7).to_string(),
            "Cannot free page 7: Page is still pinned"
        );
        assert!(Error::PageNotResident(3).to_string().contains("Page 3"));
    }

    #[test]
    fn test_io_error_conversion_keeps_message() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err: Error = io.into();
        assert_eq!(err, Error::IO("disk on fire".to_string()));
    }

    #[test]
    fn test_error_into_result() {
        let result: Result<()> = Error::PoolExhausted.into();
        assert_eq!(result, Err(Error::PoolExhausted));
    }
}
