//! Health probe span helpers.

use tracing::Span;

/// Start a span for one health probe.
///
/// `health.status` and `health.code` are declared empty and filled in by
/// [`record_probe_outcome`].
pub fn start_probe_span(environment: &str) -> Span {
    tracing::info_span!(
        "health.probe",
        "health.environment" = environment,
        "health.status" = tracing::field::Empty,
        "health.code" = tracing::field::Empty,
    )
}

/// Record the probe outcome on its span.
pub fn record_probe_outcome(span: &Span, status: &str, code: &str) {
    span.record("health.status", status);
    span.record("health.code", code);
    span.in_scope(|| {
        tracing::debug!(status = status, code = code, "probe_complete");
    });
}
