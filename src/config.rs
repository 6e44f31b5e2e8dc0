use crate::buffer::OverflowPolicy;
use crate::error::{PipelineError, Result};
use std::time::Duration;

/// Default interval between buffering-stage flushes
pub const DEFAULT_BUFFER_DELAY: Duration = Duration::from_secs(15);

/// Default ring store capacity of the buffering stage
pub const DEFAULT_BUFFER_SIZE: usize = 24;

/// Tunables for the buffering stage, fixed before the pipeline is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// How often the ring store is drained downstream
    pub buffer_delay: Duration,
    /// Ring store capacity
    pub buffer_size: usize,
    /// What a full ring store does with the next value
    pub overflow_policy: OverflowPolicy,
}

impl PipelineConfig {
    pub fn new(buffer_delay: Duration, buffer_size: usize) -> Self {
        Self {
            buffer_delay,
            buffer_size,
            overflow_policy: OverflowPolicy::default(),
        }
    }

    pub fn with_buffer_delay(mut self, delay: Duration) -> Self {
        self.buffer_delay = delay;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Reject values no buffering stage can run with
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(PipelineError::InvalidCapacity);
        }
        if self.buffer_delay.is_zero() {
            return Err(PipelineError::InvalidDelay);
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_DELAY, DEFAULT_BUFFER_SIZE)
    }
}
