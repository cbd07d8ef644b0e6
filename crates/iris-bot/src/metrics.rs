use std::time::Instant;

use prometheus::{Counter, Histogram, HistogramOpts, Opts, Registry};

/// Shared latency bucket boundaries for all stage histograms, in
/// milliseconds: fine resolution below one millisecond, coarse up to the
/// 900 ms outlier cap.
pub fn latency_buckets() -> Vec<f64> {
    let mut buckets = vec![0.0];
    buckets.extend((1..10).map(|i| f64::from(i) / 10.0));
    buckets.extend((1..=10).map(f64::from));
    buckets.extend((2..=10).map(|i| f64::from(i) * 10.0));
    buckets.extend((2..=9).map(|i| f64::from(i) * 100.0));
    buckets
}

/// Register a monotonic counter. Registration happens once per instance at
/// state construction; a name collision is a defect surfaced as `Err`.
pub fn register_counter(
    registry: &Registry,
    name: &str,
    help: &str,
) -> Result<Counter, prometheus::Error> {
    let counter = Counter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Register a stage latency histogram with the shared bucket set.
pub fn register_stage_histogram(
    registry: &Registry,
    name: &str,
    help: &str,
) -> Result<Histogram, prometheus::Error> {
    let histogram = Histogram::with_opts(HistogramOpts::new(name, help).buckets(latency_buckets()))?;
    registry.register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

/// Run `work` and record its wall time in `histogram`, in milliseconds.
///
/// Exactly one observation per call, recorded after `work` returns, whatever
/// value it produced. Stages wrap their body in this instead of relying on
/// drop order for timing.
pub fn measure<T>(histogram: &Histogram, work: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = work();
    histogram.observe(start.elapsed().as_secs_f64() * 1e3);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_set_is_the_fixed_37_bound_ladder() {
        let buckets = latency_buckets();
        assert_eq!(buckets.len(), 37);
        assert_eq!(buckets[0], 0.0);
        assert_eq!(buckets[1], 0.1);
        assert_eq!(buckets[9], 0.9);
        assert_eq!(buckets[10], 1.0);
        assert_eq!(buckets[19], 10.0);
        assert_eq!(buckets[20], 20.0);
        assert_eq!(buckets[28], 100.0);
        assert_eq!(buckets[36], 900.0);
        assert!(buckets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn measure_records_one_observation_and_passes_value_through() {
        let registry = Registry::new();
        let hist = register_stage_histogram(&registry, "stage_times_millis", "test").unwrap();
        let value = measure(&hist, || 41 + 1);
        assert_eq!(value, 42);
        assert_eq!(hist.get_sample_count(), 1);
    }

    #[test]
    fn measure_records_even_when_work_yields_nothing() {
        let registry = Registry::new();
        let hist = register_stage_histogram(&registry, "noop_times_millis", "test").unwrap();
        measure(&hist, || {});
        measure(&hist, || {});
        assert_eq!(hist.get_sample_count(), 2);
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let registry = Registry::new();
        register_counter(&registry, "frames", "Frames seen.").unwrap();
        assert!(register_counter(&registry, "frames", "Frames seen.").is_err());
    }
}
