//! Per-endpoint request statistics.
//!
//! Counts, error counts, in-flight gauges and latency sum/min/max per key,
//! all guarded by one reader/writer lock. Readers get an owned snapshot.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;

#[derive(Debug, Clone)]
struct EndpointStats {
    total: u64,
    errors: u64,
    in_flight: i64,
    latency_sum_ms: f64,
    latency_min_ms: f64,
    latency_max_ms: f64,
}

impl Default for EndpointStats {
    fn default() -> Self {
        Self {
            total: 0,
            errors: 0,
            in_flight: 0,
            latency_sum_ms: 0.0,
            latency_min_ms: f64::MAX,
            latency_max_ms: 0.0,
        }
    }
}

/// Point-in-time stats for one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSnapshot {
    pub total_requests: u64,
    pub errors: u64,
    pub in_flight: i64,
    pub avg_latency_ms: f64,
    /// 0 until the first completion.
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
}

/// Concurrent-safe request metrics keyed by endpoint.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    endpoints: RwLock<HashMap<String, EndpointStats>>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_started(&self, key: &str) {
        let mut endpoints = self.endpoints.write();
        endpoints.entry(key.to_string()).or_default().in_flight += 1;
    }

    /// Record a finished request. Status codes >= 400 count as errors.
    pub fn request_completed(&self, key: &str, duration_ms: f64, status_code: u16) {
        let mut endpoints = self.endpoints.write();
        let stats = endpoints.entry(key.to_string()).or_default();

        stats.in_flight -= 1;
        stats.total += 1;
        if status_code >= 400 {
            stats.errors += 1;
        }
        stats.latency_sum_ms += duration_ms;
        if duration_ms < stats.latency_min_ms {
            stats.latency_min_ms = duration_ms;
        }
        if duration_ms > stats.latency_max_ms {
            stats.latency_max_ms = duration_ms;
        }
    }

    /// Start timing a request; finish it with [`RequestTimer::finish`].
    pub fn start_request(self: &Arc<Self>, key: impl Into<String>) -> RequestTimer {
        let key = key.into();
        self.request_started(&key);
        RequestTimer {
            aggregator: Arc::clone(self),
            key,
            started: Instant::now(),
            finished: false,
        }
    }

    /// Owned copy of every key's stats, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, EndpointSnapshot> {
        let endpoints = self.endpoints.read();
        endpoints
            .iter()
            .map(|(key, s)| {
                let (avg, min) = if s.total > 0 {
                    (s.latency_sum_ms / s.total as f64, s.latency_min_ms)
                } else {
                    (0.0, 0.0)
                };
                let snap = EndpointSnapshot {
                    total_requests: s.total,
                    errors: s.errors,
                    in_flight: s.in_flight,
                    avg_latency_ms: avg,
                    min_latency_ms: min,
                    max_latency_ms: s.latency_max_ms,
                };
                (key.clone(), snap)
            })
            .collect()
    }
}

/// Completes its request on `finish`; if dropped unfinished it records status 500.
#[derive(Debug)]
pub struct RequestTimer {
    aggregator: Arc<MetricsAggregator>,
    key: String,
    started: Instant,
    finished: bool,
}

impl RequestTimer {
    pub fn finish(mut self, status_code: u16) {
        self.complete(status_code);
    }

    fn complete(&mut self, status_code: u16) {
        if self.finished {
            return;
        }
        self.finished = true;
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        self.aggregator.request_completed(&self.key, elapsed_ms, status_code);
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        self.complete(500);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_math() {
        let m = MetricsAggregator::new();
        for (ms, status) in [(10.0, 200), (30.0, 404), (20.0, 200)] {
            m.request_started("/entries");
            m.request_completed("/entries", ms, status);
        }
        m.request_started("/entries");

        let snap = m.snapshot();
        let s = &snap["/entries"];
        assert_eq!(s.total_requests, 3);
        assert_eq!(s.errors, 1);
        assert_eq!(s.in_flight, 1);
        assert_eq!(s.avg_latency_ms, 20.0);
        assert_eq!(s.min_latency_ms, 10.0);
        assert_eq!(s.max_latency_ms, 30.0);
    }

    #[test]
    fn test_in_flight_only_key_reports_zero_latency() {
        let m = MetricsAggregator::new();
        m.request_started("/ping");

        let s = &m.snapshot()["/ping"];
        assert_eq!(s.total_requests, 0);
        assert_eq!(s.in_flight, 1);
        assert_eq!(s.min_latency_ms, 0.0);
        assert_eq!(s.avg_latency_ms, 0.0);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let m = MetricsAggregator::new();
        m.request_started("/a");
        m.request_completed("/a", 5.0, 200);

        let before = m.snapshot();
        m.request_started("/a");
        m.request_completed("/a", 5.0, 500);

        assert_eq!(before["/a"].total_requests, 1);
        assert_eq!(m.snapshot()["/a"].total_requests, 2);
    }

    #[test]
    fn test_dropped_timer_records_server_error() {
        let m = Arc::new(MetricsAggregator::new());
        {
            let _timer = m.start_request("/slow");
            assert_eq!(m.snapshot()["/slow"].in_flight, 1);
        }
        m.start_request("/slow").finish(201);

        let s = &m.snapshot()["/slow"];
        assert_eq!(s.total_requests, 2);
        assert_eq!(s.errors, 1);
        assert_eq!(s.in_flight, 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let m = MetricsAggregator::new();
        m.request_started("/a");
        m.request_completed("/a", 1.5, 200);

        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["/a"]["total_requests"], 1);
        assert_eq!(json["/a"]["avg_latency_ms"], 1.5);
    }
}
