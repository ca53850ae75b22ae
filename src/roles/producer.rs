use crate::config::ProducerConfig;
use crate::metrics::counters::RateCounters;
use crate::payload::{PoolError, RandomPool};
use crate::rate::RateController;
use crate::sink::{RecordSink, SinkError, SinkOutput};
use crate::wire;
use bytes::BytesMut;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, info};

/// Records written between voluntary yields to the scheduler.
const YIELD_EVERY: u64 = 1024;

#[derive(thiserror::Error, Debug)]
pub enum ProducerError {
    #[error("producer {worker}: {source}")]
    Pool {
        worker: usize,
        #[source]
        source: PoolError,
    },
    #[error("producer {worker}: {source}")]
    Sink {
        worker: usize,
        #[source]
        source: SinkError,
    },
}

#[derive(Debug, Clone)]
pub struct ProducerSummary {
    pub worker: usize,
    pub records: u64,
    pub bytes: u64,
    pub output: SinkOutput,
}

/// Drive one sink until the record limit is reached, then close it and wait
/// for the consumer to exit.
pub async fn run_producer(
    worker: usize,
    config: Arc<ProducerConfig>,
    pool: Arc<RandomPool>,
    counters: Arc<RateCounters>,
    mut sink: Box<dyn RecordSink>,
) -> Result<ProducerSummary, ProducerError> {
    let limit = config.record_limit();
    if config.is_unbounded() {
        info!(worker, "producer started (unbounded)");
    } else {
        info!(worker, records = limit, "producer started");
    }

    let mut rng = StdRng::from_rng(&mut rand::rng());
    let mut pacer = RateController::for_rate(config.rate);
    let record_bytes = config.record_bytes();
    let mut frame = BytesMut::with_capacity(wire::framed_len(config.key_size, config.value_size));
    let mut written = 0u64;

    while written < limit {
        if let Some(p) = pacer.as_mut() {
            p.wait_for_next().await;
        }

        frame.clear();
        let key = pool
            .view(config.key_size, &mut rng)
            .map_err(|source| ProducerError::Pool { worker, source })?;
        let value = pool
            .view(config.value_size, &mut rng)
            .map_err(|source| ProducerError::Pool { worker, source })?;
        wire::encode_record(&mut frame, key, value);

        if let Err(e) = sink.write(&frame).await {
            // A dead child shows up as a broken pipe; its exit status says more.
            let source = match sink.finish().await {
                Err(exit) if exit.is_exit() => exit,
                _ => e,
            };
            return Err(ProducerError::Sink { worker, source });
        }
        counters.add(1, record_bytes);
        written += 1;

        if written % YIELD_EVERY == 0 {
            tokio::task::yield_now().await;
        }
    }

    debug!(worker, written, "closing producer input");
    let output = sink
        .finish()
        .await
        .map_err(|source| ProducerError::Sink { worker, source })?;
    info!(worker, records = written, "producer finished");
    Ok(ProducerSummary {
        worker,
        records: written,
        bytes: written * record_bytes,
        output,
    })
}
