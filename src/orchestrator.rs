use crate::config::RunConfig;
use crate::metrics::counters::RateCounters;
use crate::output::OutputWriter;
use crate::payload::RandomPool;
use crate::reporter::{RateReporter, ReportSummary};
use crate::roles::producer::run_producer;
use crate::sink::SinkConnector;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub producers: usize,
    pub records: u64,
    pub bytes: u64,
    pub elapsed: Duration,
    pub report: ReportSummary,
}

impl RunSummary {
    pub fn mib_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / (1024.0 * 1024.0) / secs
        } else {
            0.0
        }
    }
}

/// Start `config.producers` producers against `connector`, report rates while
/// they run and return once every one of them has finished.
///
/// The first producer failure ends the run: the remaining producers are
/// aborted (their child processes are killed) and the error is returned.
pub async fn run(
    config: RunConfig,
    connector: Arc<dyn SinkConnector>,
    output: OutputWriter,
) -> Result<RunSummary> {
    config.validate()?;

    let pool_size = config.pool_size;
    let seed = config.seed;
    let pool = tokio::task::spawn_blocking(move || match seed {
        Some(seed) => RandomPool::with_seed(pool_size, seed),
        None => RandomPool::generate(pool_size, &mut rand::rng()),
    })
    .await
    .context("generating random pool")?;
    let pool = Arc::new(pool);
    info!(bytes = pool.len(), "random pool ready");

    let counters = Arc::new(RateCounters::new());
    let producer_config = Arc::new(config.producer.clone());
    let reporter = RateReporter::new(Arc::clone(&counters), config.report_interval)
        .with_smoothing(config.smoothing)
        .with_output(output)
        .spawn();

    info!(
        producers = config.producers,
        topic = %producer_config.topic,
        sink = %connector.describe(),
        "starting producers"
    );
    let started = Instant::now();
    let mut producers = JoinSet::new();
    for worker in 0..config.producers {
        let sink = connector
            .open(worker)
            .await
            .with_context(|| format!("starting producer {}", worker))?;
        producers.spawn(run_producer(
            worker,
            Arc::clone(&producer_config),
            Arc::clone(&pool),
            Arc::clone(&counters),
            sink,
        ));
    }

    let mut finished = 0usize;
    while let Some(joined) = producers.join_next().await {
        let result = joined.context("producer task panicked")?;
        if let Err(e) = result {
            error!(error = %e, "producer failed, aborting run");
            producers.abort_all();
            reporter.stop().await;
            return Err(e.into());
        }
        finished += 1;
    }

    let report = reporter.stop().await;
    let totals = counters.totals();
    Ok(RunSummary {
        producers: finished,
        records: totals.records,
        bytes: totals.bytes,
        elapsed: started.elapsed(),
        report,
    })
}
