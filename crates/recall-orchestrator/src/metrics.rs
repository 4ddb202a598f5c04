use std::collections::VecDeque;

use serde::Serialize;

/// Fixed-capacity ring buffer of latency samples in milliseconds.
#[derive(Debug, Clone)]
pub struct LatencyBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl LatencyBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, dropping the oldest one when full.
    pub fn record(&mut self, ms: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(ms);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Arithmetic mean, 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Percentile `p` in `[0, 100]` with linear interpolation between the
    /// closest ranks, 0 when empty.
    pub fn percentile(&self, p: f64) -> f64 {
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        if sorted.is_empty() {
            return 0.0;
        }
        sorted.sort_by(f64::total_cmp);

        let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
    }
}

/// Latency and throughput counters for the orchestrator.
#[derive(Debug, Clone)]
pub struct Metrics {
    retrieval: LatencyBuffer,
    generation: LatencyBuffer,
    total_asks: u64,
    total_ingests: u64,
}

impl Metrics {
    pub fn new(buffer_size: usize) -> Self {
        tracing::debug!(buffer_size, "initialized metrics");
        Self {
            retrieval: LatencyBuffer::new(buffer_size),
            generation: LatencyBuffer::new(buffer_size),
            total_asks: 0,
            total_ingests: 0,
        }
    }

    pub fn record_retrieval(&mut self, ms: f64) {
        self.retrieval.record(ms);
    }

    pub fn record_generation(&mut self, ms: f64) {
        self.generation.record(ms);
    }

    pub fn record_ask(&mut self) {
        self.total_asks += 1;
    }

    pub fn record_ingest(&mut self) {
        self.total_ingests += 1;
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            avg_retrieval_latency_ms: round2(self.retrieval.mean()),
            avg_generation_latency_ms: round2(self.generation.mean()),
            p95_retrieval_latency_ms: round2(self.retrieval.percentile(95.0)),
            p95_generation_latency_ms: round2(self.generation.percentile(95.0)),
            total_asks: self.total_asks,
            total_ingests: self.total_ingests,
            buffer_size: self.retrieval.capacity(),
            current_buffer_entries: self.retrieval.len() + self.generation.len(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Point-in-time view of [`Metrics`]; latencies rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub avg_retrieval_latency_ms: f64,
    pub avg_generation_latency_ms: f64,
    pub p95_retrieval_latency_ms: f64,
    pub p95_generation_latency_ms: f64,
    pub total_asks: u64,
    pub total_ingests: u64,
    pub buffer_size: usize,
    /// Samples held across both buffers.
    pub current_buffer_entries: usize,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
