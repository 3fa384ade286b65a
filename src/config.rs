use thiserror::Error;

/// Configuration for a [`Queue`](crate::queue::Queue).
///
/// `Copy` and cheap to construct repeatedly; validated either via
/// [`QueueConfig::validate`] (returns [`ConfigError`]) or by `const fn new`,
/// which panics, mirroring the teacher's `Config::new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum items drained per bulk-dequeue call before returning control
    /// to the caller.
    pub batch_threshold: usize,
    /// Capacity of each producer's ring. Must be a power of two.
    pub initial_slot_capacity: usize,
    /// Whether to maintain [`crate::stats::Stats`] counters.
    pub enable_stats: bool,
    /// Whether dequeue operations are restricted to the registered consumer
    /// thread.
    pub single_consumer: bool,
}

/// Default batch size for bulk dequeue, matching `QueueTraits::BATCH_THRESHOLD`.
pub const DEFAULT_BATCH_THRESHOLD: usize = 32;
/// Default per-producer ring capacity, matching `QueueTraits::INITIAL_LOCAL_QUEUE_SIZE`.
pub const DEFAULT_SLOT_CAPACITY: usize = 256;

impl QueueConfig {
    /// Builds a config, panicking on invalid values.
    ///
    /// # Panics
    ///
    /// Panics if `initial_slot_capacity` is not a power of two, or if
    /// `batch_threshold` is zero.
    #[must_use]
    pub const fn new(
        batch_threshold: usize,
        initial_slot_capacity: usize,
        enable_stats: bool,
        single_consumer: bool,
    ) -> Self {
        assert!(batch_threshold > 0, "batch_threshold must be non-zero");
        assert!(
            initial_slot_capacity > 0 && initial_slot_capacity.is_power_of_two(),
            "initial_slot_capacity must be a non-zero power of two"
        );
        Self {
            batch_threshold,
            initial_slot_capacity,
            enable_stats,
            single_consumer,
        }
    }

    /// Validates the config, returning a [`ConfigError`] instead of panicking.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.batch_threshold == 0 {
            return Err(ConfigError::ZeroBatchThreshold);
        }
        if self.initial_slot_capacity == 0 || !self.initial_slot_capacity.is_power_of_two() {
            return Err(ConfigError::CapacityNotPowerOfTwo {
                got: self.initial_slot_capacity,
            });
        }
        Ok(self)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
            initial_slot_capacity: DEFAULT_SLOT_CAPACITY,
            enable_stats: false,
            single_consumer: false,
        }
    }
}

/// Errors produced when constructing or validating a [`QueueConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("initial_slot_capacity must be a power of two, got {got}")]
    CapacityNotPowerOfTwo { got: usize },
    #[error("batch_threshold must be non-zero")]
    ZeroBatchThreshold,
}
