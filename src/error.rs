use thiserror::Error;

/// Result type for numeric pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while building or running a pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No stages in pipeline
    #[error("Cannot run pipeline with no stages")]
    NoStages,

    /// Ring store capacity must be positive
    #[error("Ring store capacity must be greater than zero")]
    InvalidCapacity,

    /// Flush interval must be positive
    #[error("Buffer delay must be greater than zero")]
    InvalidDelay,

    /// Log destination not one of none/console/file
    #[error("Unsupported destination for log output: {0:?}")]
    UnsupportedLogDestination(String),

    /// A line of input that is not an integer
    #[error("invalid input: please enter a number")]
    InvalidInput,

    /// Worker thread could not be spawned or joined
    #[error("Thread error: {0}")]
    ThreadError(String),

    /// Workers still running after the shutdown deadline
    #[error("Pipeline shutdown timed out with {pending} worker(s) still running")]
    ShutdownTimeout { pending: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O failure in a collaborator (log file, terminal)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True for errors that must abort startup before any stage runs
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PipelineError::NoStages
                | PipelineError::InvalidCapacity
                | PipelineError::InvalidDelay
                | PipelineError::UnsupportedLogDestination(_)
                | PipelineError::ConfigError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_classification() {
        assert!(PipelineError::InvalidCapacity.is_config_error());
        assert!(PipelineError::UnsupportedLogDestination("qwerty".into()).is_config_error());
        assert!(!PipelineError::ThreadError("boom".into()).is_config_error());
        assert!(!PipelineError::ShutdownTimeout { pending: 1 }.is_config_error());
    }

    #[test]
    fn test_error_messages() {
        let err = PipelineError::UnsupportedLogDestination(String::new());
        assert_eq!(err.to_string(), "Unsupported destination for log output: \"\"");

        let err = PipelineError::ShutdownTimeout { pending: 2 };
        assert!(err.to_string().contains("2 worker(s)"));
    }
}
