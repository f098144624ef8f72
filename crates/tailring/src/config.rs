use std::time::Duration;
use thiserror::Error;

/// Default number of parallel ingestion workers.
pub const DEFAULT_WORKER_COUNT: usize = 4;
/// Default number of reusable slots in the batch ring.
pub const DEFAULT_RING_CAPACITY: usize = 16;
/// Default number of lines a worker processes before advancing to its next slot.
pub const DEFAULT_BATCH_SIZE: usize = 20_000;

/// Invalid ring configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("worker count must be positive")]
    NoWorkers,
    #[error("ring capacity must be positive")]
    NoSlots,
    #[error("batch size must be positive")]
    EmptyBatch,
    /// Every worker needs at least one slot of its own.
    #[error("worker count {workers} exceeds ring capacity {capacity}")]
    TooManyWorkers { workers: usize, capacity: usize },
    /// Slot sequences of different workers would overlap.
    #[error("ring capacity {capacity} is not a multiple of worker count {workers}")]
    UnevenSlots { workers: usize, capacity: usize },
}

/// Configuration for the batch ring and its ingestion workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingConfig {
    /// Number of parallel ingestion workers
    pub worker_count: usize,
    /// Number of slots in the ring (fixed for its lifetime)
    pub capacity: usize,
    /// Lines per batch before a worker moves to its next slot
    pub batch_size: usize,
    /// Upper bound on a single park while waiting for a slot to drain
    pub poll_interval: Duration,
    /// Report the anomaly set of the last, partially filled batch on stream end
    pub report_partial_batch: bool,
}

impl RingConfig {
    /// Creates a configuration with the default poll interval and partial-batch reporting on.
    pub const fn new(worker_count: usize, capacity: usize, batch_size: usize) -> Self {
        Self {
            worker_count,
            capacity,
            batch_size,
            poll_interval: Duration::from_millis(10),
            report_partial_batch: true,
        }
    }

    /// Sets the worker count.
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Sets the ring capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the bounded park interval used by backpressure waits.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enables or disables reporting of the final partial batch.
    pub fn with_partial_batch_report(mut self, enabled: bool) -> Self {
        self.report_partial_batch = enabled;
        self
    }

    /// Checks that the ring can host every worker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.capacity == 0 {
            return Err(ConfigError::NoSlots);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::EmptyBatch);
        }
        if self.worker_count > self.capacity {
            return Err(ConfigError::TooManyWorkers {
                workers: self.worker_count,
                capacity: self.capacity,
            });
        }
        if self.capacity % self.worker_count != 0 {
            return Err(ConfigError::UnevenSlots {
                workers: self.worker_count,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WORKER_COUNT, DEFAULT_RING_CAPACITY, DEFAULT_BATCH_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RingConfig::default();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.capacity, 16);
        assert!(config.report_partial_batch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_degenerate_shapes() {
        assert_eq!(
            RingConfig::new(0, 16, 10).validate(),
            Err(ConfigError::NoWorkers)
        );
        assert_eq!(RingConfig::new(4, 0, 10).validate(), Err(ConfigError::NoSlots));
        assert_eq!(
            RingConfig::new(4, 16, 0).validate(),
            Err(ConfigError::EmptyBatch)
        );
        assert_eq!(
            RingConfig::new(5, 4, 10).validate(),
            Err(ConfigError::TooManyWorkers {
                workers: 5,
                capacity: 4
            })
        );
        assert_eq!(
            RingConfig::new(3, 16, 10).validate(),
            Err(ConfigError::UnevenSlots {
                workers: 3,
                capacity: 16
            })
        );
    }

    #[test]
    fn test_builders() {
        let config = RingConfig::default()
            .with_worker_count(2)
            .with_capacity(8)
            .with_batch_size(3)
            .with_poll_interval(Duration::from_millis(1))
            .with_partial_batch_report(false);
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.capacity, 8);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert!(!config.report_partial_batch);
    }
}
