use std::time::Duration;
use tokio::time::{Instant, sleep_until};

/// Paces a producer to a fixed number of records per second.
///
/// Deadlines are scheduled from the previous deadline rather than from "now",
/// so short stalls are caught up instead of permanently lowering the rate.
pub struct RateController {
    interval: Duration,
    next: Option<Instant>,
}

impl RateController {
    pub fn new(records_per_second: f64) -> Self {
        let interval = Duration::from_nanos((1_000_000_000.0 / records_per_second) as u64);
        Self {
            interval,
            next: None,
        }
    }

    /// `None` when `rate` is absent or not positive.
    pub fn for_rate(rate: Option<f64>) -> Option<Self> {
        match rate {
            Some(r) if r > 0.0 && r.is_finite() => Some(Self::new(r)),
            _ => None,
        }
    }

    /// Wait until the next record may be written.
    pub async fn wait_for_next(&mut self) {
        let now = Instant::now();
        let deadline = match self.next {
            Some(d) if d > now => {
                sleep_until(d).await;
                d
            }
            // Fell more than one interval behind: reset instead of bursting.
            Some(d) if now.duration_since(d) > self.interval => now,
            Some(d) => d,
            None => now,
        };
        self.next = Some(deadline + self.interval);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
