//! Time-windowed buffering stage.
//!
//! The worker pushes every arriving value into a [`RingStore`] without ever
//! waiting on downstream, and on each tick of a `buffer_delay` timer drains
//! the whole store downstream in FIFO order before it resumes reading.
//!
//! Exit paths:
//! - cancellation: stop at once, buffered values are discarded;
//! - upstream closed: stop reading, deliver what is buffered on the next
//!   tick, then close the output;
//! - downstream gone: stop.

use crate::buffer::RingStore;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::stage::{spawn_worker, stream, Stage, StageContext, StageHandle, Value};
use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use tracing::debug;

/// Stage that decouples arrival cadence from emission cadence
#[derive(Debug)]
pub struct BufferingStage {
    name: String,
    config: PipelineConfig,
    store: Option<RingStore<Value>>,
}

impl BufferingStage {
    /// Create a buffering stage; the ring store is allocated by `prepare`
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            name: "buffering".to_string(),
            config,
            store: None,
        }
    }
}

impl Stage for BufferingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn prepare(&mut self) -> Result<()> {
        if self.store.is_none() {
            self.config.validate()?;
            self.store = Some(RingStore::new(
                self.config.buffer_size,
                self.config.overflow_policy,
            )?);
        }
        Ok(())
    }

    fn start(
        mut self: Box<Self>,
        ctx: StageContext,
        input: Receiver<Value>,
    ) -> Result<StageHandle> {
        self.prepare()?;
        let BufferingStage { name, config, store } = *self;
        let Some(store) = store else {
            return Err(PipelineError::ConfigError(format!(
                "{} started without a ring store",
                name
            )));
        };

        let (tx, output) = stream();
        let label = name.clone();
        let ticker = channel::tick(config.buffer_delay);

        let worker = spawn_worker(&label, ctx, move |ctx| {
            let metrics = ctx.metrics();
            let closed = channel::never();
            let mut upstream_open = true;

            loop {
                if ctx.is_stopped() {
                    break;
                }
                let source = if upstream_open { &input } else { &closed };

                select! {
                    recv(source) -> msg => match msg {
                        Ok(value) => {
                            metrics.record_received();
                            debug!("[{}] received value: {}", name, value);
                            if let Some(lost) = store.push(value) {
                                metrics.record_overflowed();
                                debug!("[{}] value {} discarded", name, lost);
                            }
                        }
                        Err(_) => {
                            upstream_open = false;
                            if store.is_empty() {
                                break;
                            }
                            debug!(
                                "[{}] input closed, {} value(s) left for the last flush",
                                name,
                                store.len()
                            );
                        }
                    },
                    recv(ticker) -> _ => {
                        if !flush(ctx, &store, &tx, &name) || !upstream_open {
                            break;
                        }
                    },
                    recv(ctx.cancel_token().done()) -> _ => break,
                    recv(ctx.aborted()) -> _ => break,
                }
            }

            if !store.is_empty() {
                debug!("[{}] dropping {} buffered value(s) on shutdown", name, store.len());
            }
            debug!("[{}] worker stopped", name);
        })?;

        Ok(StageHandle { output, worker })
    }
}

/// Drain the store downstream; `false` means the worker must stop
fn flush(ctx: &StageContext, store: &RingStore<Value>, tx: &Sender<Value>, name: &str) -> bool {
    let metrics = ctx.metrics();
    while let Some(value) = store.pop() {
        if !ctx.send(tx, value) {
            return false;
        }
        metrics.record_passed();
        debug!("[{}] value {} passed further", name, value);
    }
    metrics.record_flush();
    true
}
