//! numeric-pipeline - filter integers typed at the terminal
//!
//! Reads one integer per line, keeps nonzero multiples of three that are not
//! negative, and prints them in batches every `--delay`.

use clap::{Parser, ValueEnum};
use numeric_pipeline::config::DEFAULT_BUFFER_SIZE;
use numeric_pipeline::{
    init_logging, sink, source, CancellationToken, LogTarget, OverflowPolicy, Pipeline,
    PipelineConfig, PipelineError, Result,
};
use std::io::{self, BufReader};
use std::process;
use std::time::Duration;
use tracing::info;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OverflowArg {
    /// Evict the oldest buffered value when the buffer is full
    OverwriteOldest,
    /// Drop the incoming value when the buffer is full
    RejectNew,
}

impl From<OverflowArg> for OverflowPolicy {
    fn from(arg: OverflowArg) -> Self {
        match arg {
            OverflowArg::OverwriteOldest => OverflowPolicy::OverwriteOldest,
            OverflowArg::RejectNew => OverflowPolicy::RejectNew,
        }
    }
}

#[derive(Parser)]
#[command(name = "numeric-pipeline")]
#[command(about = "Filter and batch integers read from the terminal", long_about = None)]
struct Args {
    /// Interval between buffer flushes (e.g. 15s, 500ms)
    #[arg(long, default_value = "15s", value_parser = humantime::parse_duration)]
    delay: Duration,

    /// Buffer capacity
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    size: usize,

    /// Destination for log output: none, console or file
    #[arg(long, default_value = "none")]
    log: String,

    /// What a full buffer does with the next value
    #[arg(long, value_enum, default_value = "overwrite-oldest")]
    overflow: OverflowArg,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    // Everything that can be misconfigured is checked before a stage starts.
    let target: LogTarget = args.log.parse()?;
    let config =
        PipelineConfig::new(args.delay, args.size).with_overflow_policy(args.overflow.into());
    config.validate()?;
    let _logging_guard = init_logging(target)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            cancel.cancel();
        })
        .map_err(|e| PipelineError::ConfigError(format!("Failed to set signal handler: {}", e)))?;
    }

    let pipeline = Pipeline::standard(config);
    let (data_source, _reader) =
        source::read_numbers(BufReader::new(io::stdin()), io::stdout(), cancel.clone())?;
    let running = pipeline.run(&cancel, data_source)?;

    println!("Press Ctrl+C to exit...");
    println!(
        "buffer size: {}, delay: {}",
        config.buffer_size,
        humantime::format_duration(config.buffer_delay)
    );

    let rendered = sink::display(running.output(), &cancel, &mut io::stdout())?;

    info!("{}", running.metrics_summary().trim_end());
    info!(rendered = rendered, "Display stopped");
    running.shutdown(SHUTDOWN_TIMEOUT)?;

    println!("\nBye!");
    Ok(())
}
