use crate::metrics::counters::{CounterSample, RateCounters};
use crate::metrics::smoothing::ExpAvg;
use crate::output::OutputWriter;
use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

const MIB: f64 = 1024.0 * 1024.0;

/// Throughput observed over one reporting interval.
#[derive(Debug, Clone, Serialize)]
pub struct RateSample {
    pub timestamp: DateTime<Utc>,
    pub interval_secs: f64,
    pub records: u64,
    pub bytes: u64,
    pub mib_per_sec: f64,
    pub krecords_per_sec: f64,
    pub smoothed: bool,
}

impl RateSample {
    /// Raw rates for what was drained over `elapsed`.
    pub fn from_counts(counts: CounterSample, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let (mib_per_sec, krecords_per_sec) = if secs > 0.0 {
            (
                counts.bytes as f64 / MIB / secs,
                counts.records as f64 / 1000.0 / secs,
            )
        } else {
            (0.0, 0.0)
        };
        Self {
            timestamp: Utc::now(),
            interval_secs: secs,
            records: counts.records,
            bytes: counts.bytes,
            mib_per_sec,
            krecords_per_sec,
            smoothed: false,
        }
    }

    pub fn records_per_sec(&self) -> f64 {
        self.krecords_per_sec * 1000.0
    }

    pub fn to_line(&self) -> String {
        format!(
            "{:.2} MiB/s; {:.2}k records/s",
            self.mib_per_sec, self.krecords_per_sec
        )
    }

    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{:.3},{},{},{:.4},{:.4},{}",
            self.timestamp.to_rfc3339(),
            self.interval_secs,
            self.records,
            self.bytes,
            self.mib_per_sec,
            self.krecords_per_sec,
            self.smoothed
        )
    }

    pub fn csv_header() -> &'static str {
        "timestamp,interval_secs,records,bytes,mib_per_sec,krecords_per_sec,smoothed"
    }
}

/// Per-run view over all ticks, returned when the reporter is stopped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportSummary {
    pub ticks: u64,
    pub records_per_sec_p50: u64,
    pub records_per_sec_p95: u64,
    pub records_per_sec_max: u64,
}

/// Turns drained counters into samples and remembers the distribution.
struct ReportState {
    mib: Option<ExpAvg>,
    krec: Option<ExpAvg>,
    hist: Option<Histogram<u64>>,
    ticks: u64,
}

impl ReportState {
    fn new(smoothing: Option<Duration>) -> Self {
        Self {
            mib: smoothing.map(ExpAvg::new),
            krec: smoothing.map(ExpAvg::new),
            hist: Histogram::new(3).ok(),
            ticks: 0,
        }
    }

    fn observe(&mut self, counts: CounterSample, elapsed: Duration) -> RateSample {
        let mut sample = RateSample::from_counts(counts, elapsed);
        self.ticks += 1;
        if let Some(h) = self.hist.as_mut() {
            let _ = h.record(sample.records_per_sec().round() as u64);
        }
        if let (Some(mib), Some(krec)) = (self.mib.as_mut(), self.krec.as_mut()) {
            sample.mib_per_sec = mib.update(sample.mib_per_sec, elapsed);
            sample.krecords_per_sec = krec.update(sample.krecords_per_sec, elapsed);
            sample.smoothed = true;
        }
        sample
    }

    fn summary(&self) -> ReportSummary {
        match &self.hist {
            Some(h) if self.ticks > 0 => ReportSummary {
                ticks: self.ticks,
                records_per_sec_p50: h.value_at_quantile(0.5),
                records_per_sec_p95: h.value_at_quantile(0.95),
                records_per_sec_max: h.max(),
            },
            _ => ReportSummary {
                ticks: self.ticks,
                ..Default::default()
            },
        }
    }
}

/// Periodically drains [`RateCounters`] and writes one rate sample per tick.
pub struct RateReporter {
    counters: Arc<RateCounters>,
    interval: Duration,
    smoothing: Option<Duration>,
    output: OutputWriter,
}

impl RateReporter {
    pub fn new(counters: Arc<RateCounters>, interval: Duration) -> Self {
        Self {
            counters,
            interval,
            smoothing: None,
            output: OutputWriter::Text,
        }
    }

    pub fn with_smoothing(mut self, tau: Option<Duration>) -> Self {
        self.smoothing = tau;
        self
    }

    pub fn with_output(mut self, output: OutputWriter) -> Self {
        self.output = output;
        self
    }

    pub fn spawn(self) -> ReporterHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(stop_rx));
        ReporterHandle {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    async fn run(mut self, mut stop: oneshot::Receiver<()>) -> ReportSummary {
        let start = Instant::now();
        let mut ticker = interval_at(start + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = start;
        let mut state = ReportState::new(self.smoothing);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let sample = state.observe(self.counters.drain(), now - last);
                    last = now;
                    if let Err(e) = self.output.write_sample(&sample).await {
                        warn!(error = %e, "failed to write rate sample");
                    }
                }
                _ = &mut stop => break,
            }
        }
        debug!(ticks = state.ticks, "rate reporter stopped");
        state.summary()
    }
}

/// Owns the reporter task. Dropping the handle aborts the task.
pub struct ReporterHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<ReportSummary>>,
}

impl ReporterHandle {
    /// Stop ticking and collect the summary.
    pub async fn stop(mut self) -> ReportSummary {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        match self.task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => ReportSummary::default(),
        }
    }
}

impl Drop for ReporterHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
