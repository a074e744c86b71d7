use std::path::PathBuf;

use pagepool_error::Error;
use serde::Deserialize;

use crate::replacer::{ClockReplacer, LruReplacer, Replacer};
use crate::Result;

/// Which replacement policy the buffer pool runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacerKind {
    #[default]
    Clock,
    Lru,
}

impl ReplacerKind {
    /// Builds a replacer of this kind over `num_frames` frames.
    pub fn build(self, num_frames: usize) -> Box<dyn Replacer> {
        match self {
            ReplacerKind::Clock => Box::new(ClockReplacer::new(num_frames)),
            ReplacerKind::Lru => Box::new(LruReplacer::new(num_frames)),
        }
    }
}

/// Buffer pool settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub pool_size: usize,
    /// Replacement policy.
    #[serde(default)]
    pub replacer: ReplacerKind,
    /// Database file for a file-backed disk manager. `None` means the embedder supplies a disk.
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 64,
            replacer: ReplacerKind::Clock,
            data_file: None,
        }
    }
}

impl BufferPoolConfig {
    /// Loads the configuration from defaults, then the optional `file`, then `PAGEPOOL_*`
    /// environment variables, later sources overriding earlier ones.
    pub fn load(file: Option<&str>) -> Result<Self> {
        let mut c = ::config::Config::builder()
            .set_default("pool_size", 64)?
            .set_default("replacer", "clock")?;
        if let Some(file) = file {
            c = c.add_source(::config::File::with_name(file));
        }
        let config: Self = c
            .add_source(::config::Environment::with_prefix("PAGEPOOL"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::Config("pool_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn test_load_defaults() {
        let config = BufferPoolConfig::load(None).unwrap();
        assert_eq!(config, BufferPoolConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "pool_size = 8").unwrap();
        writeln!(file, "replacer = \"lru\"").unwrap();
        writeln!(file, "data_file = \"/tmp/pagepool.db\"").unwrap();

        let config = BufferPoolConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.replacer, ReplacerKind::Lru);
        assert_eq!(config.data_file, Some(PathBuf::from("/tmp/pagepool.db")));
    }

    #[test]
    #[serial]
    fn test_environment_overrides_defaults() {
        std::env::set_var("PAGEPOOL_POOL_SIZE", "3");
        let config = BufferPoolConfig::load(None);
        std::env::remove_var("PAGEPOOL_POOL_SIZE");

        assert_eq!(config.unwrap().pool_size, 3);
    }

    #[test]
    #[serial]
    fn test_zero_pool_size_is_rejected() {
        std::env::set_var("PAGEPOOL_POOL_SIZE", "0");
        let config = BufferPoolConfig::load(None);
        std::env::remove_var("PAGEPOOL_POOL_SIZE");

        assert!(matches!(config, Err(Error::Config(_))));
    }

    #[test]
    fn test_replacer_kind_builds_matching_policy() {
        let replacer = ReplacerKind::Lru.build(4);
        assert!(format!("{:?}", replacer).starts_with("LruReplacer"));
        let replacer = ReplacerKind::Clock.build(4);
        assert!(format!("{:?}", replacer).starts_with("ClockReplacer"));
    }
}
