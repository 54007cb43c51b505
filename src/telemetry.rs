use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};
use std::collections::HashSet;

pub struct Metrics {
    frames_submitted: IntCounterVec,
    ticks_skipped: IntCounter,
    submission_failures: IntCounterVec,
    prediction_duration: HistogramVec,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let frames_submitted = IntCounterVec::new(
            Opts::new("frames_submitted_total", "Total number of frames sent for prediction"),
            &["variant"],
        )?;

        let ticks_skipped = IntCounter::new(
            "ticks_skipped_total",
            "Timer ticks dropped because a submission was still in flight",
        )?;

        let submission_failures = IntCounterVec::new(
            Opts::new(
                "submission_failures_total",
                "Capture or prediction failures by kind",
            ),
            &["variant", "kind"],
        )?;

        let boundaries = generate_boundaries((15, 30, 60, 500, 1000));

        let prediction_duration = HistogramVec::new(
            HistogramOpts::new(
                "prediction_duration_ms",
                "Duration of capture and prediction round trips in milliseconds",
            )
            .buckets(boundaries),
            &["variant"],
        )?;

        registry.register(Box::new(frames_submitted.clone()))?;
        registry.register(Box::new(ticks_skipped.clone()))?;
        registry.register(Box::new(submission_failures.clone()))?;
        registry.register(Box::new(prediction_duration.clone()))?;

        Ok(Metrics {
            frames_submitted,
            ticks_skipped,
            submission_failures,
            prediction_duration,
            registry,
        })
    }

    pub fn record_submission(&self, variant: &str) {
        self.frames_submitted.with_label_values(&[variant]).inc();
    }

    pub fn record_skipped_tick(&self) {
        self.ticks_skipped.inc();
    }

    pub fn record_failure(&self, variant: &str, kind: &str) {
        self.submission_failures
            .with_label_values(&[variant, kind])
            .inc();
    }

    pub fn record_prediction_duration(&self, duration_ms: u64, variant: &str) {
        self.prediction_duration
            .with_label_values(&[variant])
            .observe(duration_ms as f64);
    }

    #[cfg(test)]
    pub(crate) fn skipped_ticks(&self) -> u64 {
        self.ticks_skipped.get()
    }

    #[cfg(test)]
    pub(crate) fn submissions(&self, variant: &str) -> u64 {
        self.frames_submitted.with_label_values(&[variant]).get()
    }
}

fn generate_boundaries(parts: (i32, i32, i32, i32, i32)) -> Vec<f64> {
    let first_step: usize = 10;
    let middle_step: usize = 2;
    let end_step: usize = 20;
    let tail_step: usize = 100;
    let first_part = (parts.0..=parts.1).step_by(first_step);
    let middle_part = (parts.1..=parts.2).step_by(middle_step);
    let end_part = (parts.2..=parts.3).step_by(end_step);
    let tail_part = (parts.3..=parts.4).step_by(tail_step);

    let mut seen = HashSet::new();
    first_part
        .chain(middle_part)
        .chain(end_part)
        .chain(tail_part)
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}
