use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Request counters for the HTTP service.
#[derive(Debug, Default)]
pub struct ServingStats {
    requests: AtomicU64,
    inferences: AtomicU64,
    samples_ingested: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    latency_us_sum: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub inferences: u64,
    pub samples_ingested: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub avg_inference_ms: f64,
}

impl ServingStats {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inference(&self, elapsed: std::time::Duration) {
        self.inferences.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.latency_us_sum.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn record_samples(&self, n: u64) {
        self.samples_ingested.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_client_error(&self) {
        self.client_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_server_error(&self) {
        self.server_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let inferences = self.inferences.load(Ordering::Relaxed);
        let sum = self.latency_us_sum.load(Ordering::Relaxed);
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            inferences,
            samples_ingested: self.samples_ingested.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            avg_inference_ms: if inferences > 0 {
                (sum as f64 / inferences as f64) / 1000.0
            } else {
                0.0
            },
        }
    }
}
