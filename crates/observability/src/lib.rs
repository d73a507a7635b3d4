use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    runs_total: AtomicU64,
    runs_succeeded: AtomicU64,
    geo_not_found_total: AtomicU64,
    model_failures_total: AtomicU64,
    malformed_responses_total: AtomicU64,
    busy_rejections_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub runs_total: u64,
    pub runs_succeeded: u64,
    pub geo_not_found_total: u64,
    pub model_failures_total: u64,
    pub malformed_responses_total: u64,
    pub busy_rejections_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_run(&self) {
        self.runs_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_success(&self) {
        self.runs_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_geo_not_found(&self) {
        self.geo_not_found_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_model_failure(&self) {
        self.model_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_malformed_response(&self) {
        self.malformed_responses_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_busy_rejection(&self) {
        self.busy_rejections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let runs = self.runs_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            runs_total: runs,
            runs_succeeded: self.runs_succeeded.load(Ordering::Relaxed),
            geo_not_found_total: self.geo_not_found_total.load(Ordering::Relaxed),
            model_failures_total: self.model_failures_total.load(Ordering::Relaxed),
            malformed_responses_total: self.malformed_responses_total.load(Ordering::Relaxed),
            busy_rejections_total: self.busy_rejections_total.load(Ordering::Relaxed),
            avg_latency_millis: if runs == 0 {
                0.0
            } else {
                latency as f64 / runs as f64
            },
        }
    }
}

/// Where JSON log lines go. Servers log to stdout; the CLI keeps stdout for
/// its own output and logs to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    Stdout,
    Stderr,
}

const VOYAGE_CRATES: [&str; 5] = [
    "voyage_agents",
    "voyage_geo",
    "voyage_model",
    "voyage_storage",
    "voyage_core",
];

/// `VOYAGE_LOG` wins over `RUST_LOG`; without either, the service and the
/// voyage crates log at info.
pub fn init_tracing(service_name: &str, sink: LogSink) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env("VOYAGE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(default_filter(service_name)));

        let writer = match sink {
            LogSink::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogSink::Stderr => BoxMakeWriter::new(std::io::stderr),
        };

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_current_span(true)
            .with_span_list(false)
            .init();
    });
}

fn default_filter(service_name: &str) -> String {
    std::iter::once(service_name)
        .chain(VOYAGE_CRATES)
        .map(|target| format!("{target}=info"))
        .collect::<Vec<_>>()
        .join(",")
}
