//! Reload pipeline metrics using OpenTelemetry.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::time::Instant;

/// Metrics collector for the reload pipeline.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_props::metrics::ReloadMetrics;
/// use opentelemetry::global;
///
/// let meter = global::meter("hotswap-props");
/// let metrics = ReloadMetrics::new(meter);
///
/// let timer = metrics.start_publish("/app/props");
/// // ... publish the batch ...
/// metrics.record_publish(timer, 3);
/// ```
#[derive(Clone)]
pub struct ReloadMetrics {
    batches_received: Counter<u64>,
    blank_payloads: Counter<u64>,
    notifications_published: Counter<u64>,
    conversion_failures: Counter<u64>,
    resolution_failures: Counter<u64>,
    active_watches: Gauge<i64>,
    publish_duration: Histogram<f64>,
}

impl ReloadMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let batches_received = meter
            .u64_counter("hotswap_props.batches.received")
            .with_description("Number of property batches received from watched paths")
            .build();

        let blank_payloads = meter
            .u64_counter("hotswap_props.payloads.blank")
            .with_description("Number of absent or empty payloads ignored")
            .build();

        let notifications_published = meter
            .u64_counter("hotswap_props.notifications.published")
            .with_description("Number of change notifications published")
            .build();

        let conversion_failures = meter
            .u64_counter("hotswap_props.conversion.failures")
            .with_description("Number of values that could not be converted for a target")
            .build();

        let resolution_failures = meter
            .u64_counter("hotswap_props.resolution.failures")
            .with_description("Number of subscriptions that could not be resolved")
            .build();

        let active_watches = meter
            .i64_gauge("hotswap_props.watches.active")
            .with_description("Number of active store watches")
            .build();

        let publish_duration = meter
            .f64_histogram("hotswap_props.publish.duration")
            .with_description("Duration of batch publish operations in seconds")
            .with_unit("s")
            .build();

        Self {
            batches_received,
            blank_payloads,
            notifications_published,
            conversion_failures,
            resolution_failures,
            active_watches,
            publish_duration,
        }
    }

    /// Count a received batch and start the publish timer.
    pub fn start_publish(&self, path: &str) -> Instant {
        self.batches_received
            .add(1, &[KeyValue::new("path", path.to_string())]);
        Instant::now()
    }

    /// Record a completed publish and the number of notifications it fired.
    pub fn record_publish(&self, start: Instant, notifications: usize) {
        self.publish_duration
            .record(start.elapsed().as_secs_f64(), &[]);
        self.notifications_published.add(notifications as u64, &[]);
    }

    /// Record an absent or empty payload.
    pub fn record_blank_payload(&self, path: &str) {
        self.blank_payloads
            .add(1, &[KeyValue::new("path", path.to_string())]);
    }

    /// Record conversion failures reported while applying a change.
    pub fn record_conversion_failures(&self, count: usize) {
        self.conversion_failures.add(count as u64, &[]);
    }

    /// Record a subscription that failed to resolve.
    pub fn record_resolution_failure(&self) {
        self.resolution_failures.add(1, &[]);
    }

    /// Update the number of active watches.
    pub fn update_active_watches(&self, count: usize) {
        self.active_watches.record(count as i64, &[]);
    }
}
