//! Reader configuration

/// How block payloads are decompressed and decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// Decode every block on the calling thread.
    Sequential,
    /// Decode blocks on a dedicated pool of `n` threads.
    Threads(usize),
    /// Decode blocks on the global rayon pool when there is more than one.
    #[default]
    Auto,
}

/// Configuration for [`TableReader`](crate::TableReader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Block decoding strategy (default: `Auto`).
    pub parallelism: Parallelism,
    /// Enforce Avro naming rules on the writer schema (default: false).
    /// Violations are logged instead when disabled.
    pub strict_schema: bool,
    /// Check the CRC32 trailer of snappy blocks (default: true).
    pub verify_snappy_checksum: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            parallelism: Parallelism::Auto,
            strict_schema: false,
            verify_snappy_checksum: true,
        }
    }
}

impl ReaderConfig {
    /// Create a new ReaderConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block decoding strategy.
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Decode all blocks on the calling thread.
    pub fn sequential(self) -> Self {
        self.with_parallelism(Parallelism::Sequential)
    }

    /// Enable or disable strict schema naming rules.
    pub fn with_strict_schema(mut self, strict: bool) -> Self {
        self.strict_schema = strict;
        self
    }

    /// Enable or disable snappy checksum verification.
    pub fn with_verify_snappy_checksum(mut self, verify: bool) -> Self {
        self.verify_snappy_checksum = verify;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::new();
        assert_eq!(config.parallelism, Parallelism::Auto);
        assert!(!config.strict_schema);
        assert!(config.verify_snappy_checksum);
    }

    #[test]
    fn test_builder_methods() {
        let config = ReaderConfig::new()
            .with_parallelism(Parallelism::Threads(3))
            .with_strict_schema(true)
            .with_verify_snappy_checksum(false);
        assert_eq!(config.parallelism, Parallelism::Threads(3));
        assert!(config.strict_schema);
        assert!(!config.verify_snappy_checksum);
        assert_eq!(config.sequential().parallelism, Parallelism::Sequential);
    }
}
