//! Metric instrument factories for dbprobe.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"dbprobe"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for dbprobe instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("dbprobe")
}

/// Counter: health probes run.
/// Labels: `status` ("healthy" | "unhealthy"), `code`.
pub fn health_probes() -> Counter<u64> {
    meter()
        .u64_counter("dbprobe.health.probes")
        .with_description("Number of database health probes")
        .build()
}

/// Counter: database client initialization attempts.
/// Labels: `backend`, `result` ("ok" | "fallback" | "error").
pub fn client_initializations() -> Counter<u64> {
    meter()
        .u64_counter("dbprobe.client.initializations")
        .with_description("Number of database client initialization attempts")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("dbprobe.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
