use crate::cancel::CancellationToken;
use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Element type flowing through every stage
pub type Value = i64;

/// Trait for a processing stage in the pipeline
pub trait Stage: Send + 'static {
    /// Get a human-readable name for this stage, used in log lines
    fn name(&self) -> &str;

    /// Allocate whatever the worker needs.
    ///
    /// The pipeline prepares every stage before launching any worker, so a
    /// failure here leaves nothing running.
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    /// Launch the stage's single worker and return its output stream.
    ///
    /// Must not block. The worker closes the output when it exits, whatever
    /// the reason.
    fn start(self: Box<Self>, ctx: StageContext, input: Receiver<Value>) -> Result<StageHandle>;
}

/// Output side of a started stage
#[derive(Debug)]
pub struct StageHandle {
    pub output: Receiver<Value>,
    pub worker: JoinHandle<()>,
}

/// Shared state handed to a stage worker: the cancellation signal, the
/// run's abort signal, the stage's metrics, and its slot in the pipeline's
/// completion barrier
#[derive(Debug, Clone)]
pub struct StageContext {
    cancel: CancellationToken,
    abort: CancellationToken,
    metrics: StageMetrics,
    _completion: Option<Sender<()>>,
}

impl StageContext {
    /// Create a context bound to `cancel` with fresh metrics
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            abort: CancellationToken::new(),
            metrics: StageMetrics::new(),
            _completion: None,
        }
    }

    /// Bind the context to the run-local token that tears down a pipeline
    /// whose startup failed part way
    pub(crate) fn with_abort(mut self, abort: CancellationToken) -> Self {
        self.abort = abort;
        self
    }

    pub(crate) fn with_completion(mut self, completion: Sender<()>) -> Self {
        self._completion = Some(completion);
        self
    }

    pub(crate) fn with_metrics(mut self, metrics: StageMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get the shared cancellation token
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Get the metrics of this stage
    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Whether the worker must stop: the pipeline was cancelled or its
    /// startup was aborted
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.abort.is_cancelled()
    }

    /// Receiver that becomes ready once the run is aborted; select on it
    /// next to [`CancellationToken::done`]
    pub fn aborted(&self) -> &Receiver<()> {
        self.abort.done()
    }

    /// Receive the next input value.
    ///
    /// Returns `None` once the input is closed or the pipeline is cancelled.
    pub fn recv(&self, input: &Receiver<Value>) -> Option<Value> {
        if self.is_stopped() {
            return None;
        }
        select! {
            recv(input) -> msg => msg.ok(),
            recv(self.cancel.done()) -> _ => None,
            recv(self.abort.done()) -> _ => None,
        }
    }

    /// Send a value downstream.
    ///
    /// Returns `false` if cancellation won the race or the receiver is gone;
    /// the worker should exit in either case.
    pub fn send(&self, output: &Sender<Value>, value: Value) -> bool {
        if self.is_stopped() {
            return false;
        }
        select! {
            send(output, value) -> res => res.is_ok(),
            recv(self.cancel.done()) -> _ => false,
            recv(self.abort.done()) -> _ => false,
        }
    }
}

/// Send `value` unless `cancel` fires first; `false` if it was not delivered
pub fn send_or_cancel(cancel: &CancellationToken, output: &Sender<Value>, value: Value) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    select! {
        send(output, value) -> res => res.is_ok(),
        recv(cancel.done()) -> _ => false,
    }
}

/// Create the zero-capacity rendezvous channel used between stages
pub fn stream() -> (Sender<Value>, Receiver<Value>) {
    channel::bounded(0)
}

/// Spawn a named worker thread that owns `ctx` for its whole lifetime.
///
/// Dropping `ctx` at the end of the thread releases the worker's slot in
/// the completion barrier, including when `body` panics.
pub fn spawn_worker<F>(name: &str, ctx: StageContext, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce(&StageContext) + Send + 'static,
{
    thread::Builder::new()
        .name(format!("stage-{}", name))
        .spawn(move || {
            body(&ctx);
        })
        .map_err(|e| PipelineError::ThreadError(format!("failed to spawn {}: {}", name, e)))
}

/// Passes values `v >= 0`
pub fn is_non_negative(value: Value) -> bool {
    value >= 0
}

/// Passes nonzero multiples of three
pub fn is_nonzero_multiple_of_three(value: Value) -> bool {
    value != 0 && value % 3 == 0
}

/// A stateless stage that passes through items matching a predicate, in order
#[derive(Debug)]
pub struct FilterStage<F>
where
    F: Fn(Value) -> bool + Send + 'static,
{
    name: String,
    predicate: F,
}

impl<F> FilterStage<F>
where
    F: Fn(Value) -> bool + Send + 'static,
{
    /// Create a new filter stage
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl FilterStage<fn(Value) -> bool> {
    /// Drops negative values
    pub fn non_negative() -> Self {
        Self::new("reject_negatives", is_non_negative)
    }

    /// Keeps only nonzero multiples of three
    pub fn multiples_of_three() -> Self {
        Self::new("multiples_of_three", is_nonzero_multiple_of_three)
    }
}

impl<F> Stage for FilterStage<F>
where
    F: Fn(Value) -> bool + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn start(self: Box<Self>, ctx: StageContext, input: Receiver<Value>) -> Result<StageHandle> {
        let FilterStage { name, predicate } = *self;
        let (tx, output) = stream();
        let label = name.clone();

        let worker = spawn_worker(&label, ctx, move |ctx| {
            let metrics = ctx.metrics();
            while let Some(value) = ctx.recv(&input) {
                metrics.record_received();
                debug!("[{}] received value: {}", name, value);

                if predicate(value) {
                    if !ctx.send(&tx, value) {
                        break;
                    }
                    metrics.record_passed();
                    debug!("[{}] value {} passed further", name, value);
                } else {
                    metrics.record_discarded();
                    debug!("[{}] value {} discarded", name, value);
                }
            }
            debug!("[{}] worker stopped", name);
        })?;

        Ok(StageHandle { output, worker })
    }
}
