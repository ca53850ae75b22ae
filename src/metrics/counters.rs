use std::sync::atomic::{AtomicU64, Ordering};

/// Throughput counters shared by every producer and drained by the reporter.
///
/// The since-tick pair is read and reset with a single `swap` each, so an
/// increment lands in exactly one tick. Cumulative totals are never reset.
#[derive(Debug, Default)]
pub struct RateCounters {
    records_since_tick: AtomicU64,
    bytes_since_tick: AtomicU64,
    total_records: AtomicU64,
    total_bytes: AtomicU64,
}

/// What was accumulated between two drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSample {
    pub records: u64,
    pub bytes: u64,
}

impl RateCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, records: u64, bytes: u64) {
        self.records_since_tick.fetch_add(records, Ordering::Relaxed);
        self.bytes_since_tick.fetch_add(bytes, Ordering::Relaxed);
        self.total_records.fetch_add(records, Ordering::Relaxed);
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Swap the since-tick counters to zero and return what they held.
    pub fn drain(&self) -> CounterSample {
        CounterSample {
            records: self.records_since_tick.swap(0, Ordering::AcqRel),
            bytes: self.bytes_since_tick.swap(0, Ordering::AcqRel),
        }
    }

    /// Peek at the since-tick counters without resetting them.
    pub fn pending(&self) -> CounterSample {
        CounterSample {
            records: self.records_since_tick.load(Ordering::Acquire),
            bytes: self.bytes_since_tick.load(Ordering::Acquire),
        }
    }

    pub fn totals(&self) -> CounterSample {
        CounterSample {
            records: self.total_records.load(Ordering::Acquire),
            bytes: self.total_bytes.load(Ordering::Acquire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn concurrent_adds_are_not_lost() {
        let counters = Arc::new(RateCounters::new());
        let workers = 8u64;
        let per_worker = 10_000u64;
        let bytes_each = 340u64;

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let c = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..per_worker {
                        c.add(1, bytes_each);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let sample = counters.drain();
        assert_eq!(sample.records, workers * per_worker);
        assert_eq!(sample.bytes, workers * per_worker * bytes_each);
        assert_eq!(counters.pending(), CounterSample::default());
        assert_eq!(counters.drain(), CounterSample::default());
        assert_eq!(counters.totals().records, workers * per_worker);
    }

    #[test]
    fn drain_while_adding_counts_everything_once() {
        let counters = Arc::new(RateCounters::new());
        let writer = {
            let c = Arc::clone(&counters);
            std::thread::spawn(move || {
                for _ in 0..50_000 {
                    c.add(1, 2);
                }
            })
        };
        let mut seen = CounterSample::default();
        while !writer.is_finished() {
            let s = counters.drain();
            seen.records += s.records;
            seen.bytes += s.bytes;
        }
        writer.join().unwrap();
        let s = counters.drain();
        seen.records += s.records;
        seen.bytes += s.bytes;
        assert_eq!(seen, CounterSample { records: 50_000, bytes: 100_000 });
    }
}
