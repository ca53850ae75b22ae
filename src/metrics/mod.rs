pub mod counters;
pub mod smoothing;
