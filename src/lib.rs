//! A cancellable, multi-stage stream pipeline for integers.
//!
//! Each stage runs on its own thread and hands values to the next stage over
//! a zero-capacity crossbeam channel. One shared [`CancellationToken`] stops
//! every stage, wakes every blocked send and receive, and closes every
//! output stream exactly once.
//!
//! # Features
//!
//! - Stable filter stages (non-negatives, nonzero multiples of three, or any predicate)
//! - A buffering stage that batches values in a fixed-capacity ring store and
//!   flushes them on a timer
//! - Configurable ring overflow policy (overwrite oldest or reject new)
//! - Per-stage counters and a completion barrier with timeout
//!
//! # Example
//!
//! ```no_run
//! use numeric_pipeline::{CancellationToken, Pipeline, PipelineConfig};
//! use numeric_pipeline::stage::stream;
//! use std::time::Duration;
//!
//! let cancel = CancellationToken::new();
//! let (tx, source) = stream();
//! let running = Pipeline::standard(PipelineConfig::default()).run(&cancel, source)?;
//!
//! std::thread::spawn(move || {
//!     for v in [5, -2, 33, 3, 9] {
//!         let _ = tx.send(v);
//!     }
//! });
//!
//! for value in running.output().iter() {
//!     println!("processed: {}", value);
//! }
//! running.wait_timeout(Duration::from_secs(1))?;
//! # Ok::<(), numeric_pipeline::PipelineError>(())
//! ```

pub mod buffer;
pub mod buffering;
pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod stage;

// Re-exports for convenience
pub use buffer::{OverflowPolicy, RingStore};
pub use buffering::BufferingStage;
pub use cancel::CancellationToken;
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use logging::{init_logging, LogTarget, LoggingGuard};
pub use metrics::{MetricsSnapshot, StageMetrics};
pub use pipeline::{Pipeline, RunningPipeline};
pub use stage::{spawn_worker, FilterStage, Stage, StageContext, StageHandle, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
