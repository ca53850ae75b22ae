use std::time::Duration;

/// Moving exponential average with time constant `tau`.
///
/// Each update weights the new value by `1 - e^(-dt/tau)`, so irregular tick
/// spacing is accounted for.
#[derive(Debug, Clone)]
pub struct ExpAvg {
    tau: Duration,
    value: Option<f64>,
}

/// `alpha * value + (1 - alpha) * old_value` with `alpha = 1 - e^(-dt/tau)`.
pub fn moving_exp_avg(value: f64, old_value: f64, dt: f64, tau: f64) -> f64 {
    let alpha = 1.0 - (-dt / tau).exp();
    alpha * value + (1.0 - alpha) * old_value
}

impl ExpAvg {
    pub fn new(tau: Duration) -> Self {
        Self { tau, value: None }
    }

    /// Fold in a sample observed `dt` after the previous one. The first sample
    /// seeds the average as-is.
    pub fn update(&mut self, sample: f64, dt: Duration) -> f64 {
        let next = match self.value {
            None => sample,
            Some(_) if self.tau.is_zero() => sample,
            Some(old) => moving_exp_avg(sample, old, dt.as_secs_f64(), self.tau.as_secs_f64()),
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}
