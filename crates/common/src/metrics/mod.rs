//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all CourseHub metrics
pub const METRICS_PREFIX: &str = "coursehub";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 150ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.075,  // 75ms
    0.100,  // 100ms
    0.150,  // 150ms - P99 target
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Content metrics
    describe_counter!(
        format!("{}_discussions_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total discussions created"
    );

    describe_counter!(
        format!("{}_comments_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total comments created"
    );

    // Moderation metrics
    describe_counter!(
        format!("{}_moderation_reviews_total", METRICS_PREFIX),
        Unit::Count,
        "Total moderation review decisions"
    );

    describe_counter!(
        format!("{}_comment_reports_total", METRICS_PREFIX),
        Unit::Count,
        "Total comment reports"
    );

    // Engagement metrics
    describe_counter!(
        format!("{}_likes_toggled_total", METRICS_PREFIX),
        Unit::Count,
        "Total like toggles"
    );

    // Counter reconciliation metrics
    describe_counter!(
        format!("{}_counter_refresh_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Failed best-effort counter refreshes"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record a discussion creation
pub fn record_discussion_created() {
    counter!(format!("{}_discussions_created_total", METRICS_PREFIX)).increment(1);
}

/// Helper to record a comment creation
pub fn record_comment_created(root: bool) {
    let kind = if root { "root" } else { "reply" };
    counter!(
        format!("{}_comments_created_total", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Helper to record a moderation review decision
pub fn record_review(entity: &str, decision: &str) {
    counter!(
        format!("{}_moderation_reviews_total", METRICS_PREFIX),
        "entity" => entity.to_string(),
        "decision" => decision.to_string()
    )
    .increment(1);
}

/// Helper to record a comment report
pub fn record_report() {
    counter!(format!("{}_comment_reports_total", METRICS_PREFIX)).increment(1);
}

/// Helper to record a like toggle
pub fn record_like(entity: &str, liked: bool) {
    let action = if liked { "like" } else { "unlike" };
    counter!(
        format!("{}_likes_toggled_total", METRICS_PREFIX),
        "entity" => entity.to_string(),
        "action" => action.to_string()
    )
    .increment(1);
}

/// Helper to record a failed best-effort counter refresh
pub fn record_counter_refresh_failure(counter_name: &str) {
    counter!(
        format!("{}_counter_refresh_failures_total", METRICS_PREFIX),
        "counter" => counter_name.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        // Verify buckets are sorted and contain SLO targets
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        // P50 target (50ms) should be in buckets
        assert!(LATENCY_BUCKETS.contains(&0.050));
        // P99 target (150ms) should be in buckets
        assert!(LATENCY_BUCKETS.contains(&0.150));
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/v1/discussions");
        std::thread::sleep(std::time::Duration::from_millis(10));
        metrics.finish(200);
        // Just verify it runs without panic
    }
}
