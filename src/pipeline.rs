use crate::buffering::BufferingStage;
use crate::cancel::CancellationToken;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use crate::stage::{FilterStage, Stage, StageContext, Value};
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// An ordered list of stages, composed left to right by [`Pipeline::run`].
///
/// Stages are only started by `run`, which consumes the pipeline: a
/// pipeline is built once and run once.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        debug!("Created new pipeline");
        Self { stages: Vec::new() }
    }

    /// The filtering and buffering chain run by the command-line binary:
    /// multiples of three, then non-negatives, then buffering.
    pub fn standard(config: PipelineConfig) -> Self {
        Self::new()
            .with_stage(FilterStage::multiples_of_three())
            .with_stage(FilterStage::non_negative())
            .with_stage(BufferingStage::new(config))
    }

    /// Append a stage to the end of the pipeline
    pub fn add_stage<S: Stage>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        debug!("New stage added (stages={})", self.stages.len());
        self
    }

    /// Builder-style variant of [`Pipeline::add_stage`]
    pub fn with_stage<S: Stage>(mut self, stage: S) -> Self {
        self.add_stage(stage);
        self
    }

    /// Get the number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in composition order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Start every stage, feeding each stage's output into the next.
    ///
    /// All stages are prepared before the first worker is launched, so a
    /// configuration or allocation error leaves nothing running. If a later
    /// stage fails to start, the stages already running are aborted and
    /// joined before the error is returned. The returned handle owns the
    /// final output stream.
    pub fn run(
        mut self,
        cancel: &CancellationToken,
        source: Receiver<Value>,
    ) -> Result<RunningPipeline> {
        if self.stages.is_empty() {
            return Err(PipelineError::NoStages);
        }

        for stage in self.stages.iter_mut() {
            stage.prepare()?;
        }

        let abort = CancellationToken::new();
        let (completion_tx, completion_rx) = channel::bounded::<()>(0);
        let mut stages = Vec::with_capacity(self.stages.len());
        let mut stream = source;

        for stage in self.stages.drain(..) {
            let name = stage.name().to_string();
            let metrics = StageMetrics::new();
            let ctx = StageContext::new(cancel.clone())
                .with_abort(abort.clone())
                .with_metrics(metrics.clone())
                .with_completion(completion_tx.clone());

            let handle = match stage.start(ctx, stream) {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("Stage {} failed to start, aborting the pipeline: {}", name, e);
                    abort.cancel();
                    for started in stages {
                        let RunningStage { name, worker, .. } = started;
                        if worker.join().is_err() {
                            warn!("Stage {} panicked during abort", name);
                        }
                    }
                    return Err(e);
                }
            };
            stream = handle.output;
            stages.push(RunningStage {
                name,
                metrics,
                worker: handle.worker,
            });
        }
        drop(completion_tx);

        info!("Start the pipeline");
        Ok(RunningPipeline {
            output: stream,
            stages,
            completion: completion_rx,
            cancel: cancel.clone(),
        })
    }
}

struct RunningStage {
    name: String,
    metrics: StageMetrics,
    worker: JoinHandle<()>,
}

/// A running pipeline that can be drained, monitored and shut down
pub struct RunningPipeline {
    output: Receiver<Value>,
    stages: Vec<RunningStage>,
    completion: Receiver<()>,
    cancel: CancellationToken,
}

impl RunningPipeline {
    /// The final output stream; it closes once the last stage exits
    pub fn output(&self) -> &Receiver<Value> {
        &self.output
    }

    /// Get the number of running stages
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Get metrics for a stage
    pub fn stage_metrics(&self, index: usize) -> Option<&StageMetrics> {
        self.stages.get(index).map(|s| &s.metrics)
    }

    /// Number of stage workers that have not exited yet
    pub fn pending_workers(&self) -> usize {
        self.stages.iter().filter(|s| !s.worker.is_finished()).count()
    }

    /// Get a summary of all metrics
    pub fn metrics_summary(&self) -> String {
        let mut summary = String::from("Pipeline Metrics Summary:\n");
        for (i, stage) in self.stages.iter().enumerate() {
            summary.push_str(&format!(
                "  Stage {} ({}): {}\n",
                i,
                stage.name,
                stage.metrics.snapshot().format()
            ));
        }
        summary
    }

    /// Block until every stage worker has exited
    pub fn wait(self) -> Result<()> {
        let _ = self.completion.recv();
        self.join()
    }

    /// Wait for every stage worker to exit, giving up after `timeout`
    pub fn wait_timeout(self, timeout: Duration) -> Result<()> {
        match self.completion.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                let pending = self.pending_workers();
                warn!(pending = pending, "Pipeline workers still running after {:?}", timeout);
                Err(PipelineError::ShutdownTimeout { pending })
            }
            _ => self.join(),
        }
    }

    /// Cancel the pipeline and wait for its workers to stop
    pub fn shutdown(self, timeout: Duration) -> Result<()> {
        self.cancel.cancel();
        self.wait_timeout(timeout)
    }

    fn join(self) -> Result<()> {
        let mut panicked = Vec::new();
        for stage in self.stages {
            if stage.worker.join().is_err() {
                panicked.push(stage.name);
            }
        }

        if panicked.is_empty() {
            debug!("All pipeline workers stopped");
            Ok(())
        } else {
            Err(PipelineError::ThreadError(format!(
                "stage worker(s) panicked: {}",
                panicked.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::stream;

    #[test]
    fn test_no_stages_error() {
        let (_tx, source) = stream();
        let result = Pipeline::new().run(&CancellationToken::new(), source);
        assert!(matches!(result, Err(PipelineError::NoStages)));
    }

    #[test]
    fn test_stage_order_preserved() {
        let pipeline = Pipeline::standard(PipelineConfig::default());
        assert_eq!(pipeline.len(), 3);
        assert_eq!(
            pipeline.stage_names(),
            vec!["multiples_of_three", "reject_negatives", "buffering"]
        );
    }

    #[test]
    fn test_add_stage_chains() {
        let mut pipeline = Pipeline::new();
        pipeline
            .add_stage(FilterStage::non_negative())
            .add_stage(FilterStage::multiples_of_three());
        assert_eq!(pipeline.stage_names(), vec!["reject_negatives", "multiples_of_three"]);
    }

    #[test]
    fn test_invalid_config_starts_nothing() {
        let config = PipelineConfig::default().with_buffer_size(0);
        let (_tx, source) = stream();
        let result = Pipeline::standard(config).run(&CancellationToken::new(), source);
        assert!(matches!(result, Err(PipelineError::InvalidCapacity)));
    }

    #[test]
    fn test_shutdown_joins_idle_workers() {
        let cancel = CancellationToken::new();
        let (_tx, source) = stream();
        let running = Pipeline::new()
            .with_stage(FilterStage::non_negative())
            .with_stage(FilterStage::multiples_of_three())
            .run(&cancel, source)
            .unwrap();

        assert_eq!(running.stage_count(), 2);
        running.shutdown(Duration::from_secs(2)).unwrap();
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_wait_timeout_reports_pending_workers() {
        let (_tx, source) = stream();
        let running = Pipeline::new()
            .with_stage(FilterStage::non_negative())
            .run(&CancellationToken::new(), source)
            .unwrap();

        let result = running.wait_timeout(Duration::from_millis(50));
        assert!(matches!(result, Err(PipelineError::ShutdownTimeout { pending: 1 })));
    }

    #[test]
    fn test_metrics_summary_lists_stages() {
        let cancel = CancellationToken::new();
        let (_tx, source) = stream();
        let running = Pipeline::new()
            .with_stage(FilterStage::non_negative())
            .run(&cancel, source)
            .unwrap();

        let summary = running.metrics_summary();
        assert!(summary.contains("Stage 0 (reject_negatives): Received: 0"));
        running.shutdown(Duration::from_secs(2)).unwrap();
    }
}
