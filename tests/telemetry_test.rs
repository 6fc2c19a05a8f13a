//! Integration tests for telemetry initialization and span helpers.

use dbprobe::telemetry::TelemetryConfig;

#[test]
fn telemetry_initializes_without_endpoint() {
    // Note: tracing subscriber can only be set once per process.
    // Using try_init() in the implementation avoids panics if another
    // test already initialized a subscriber.
    let config = TelemetryConfig {
        endpoint: None,
        service_name: "dbprobe-test".to_string(),
        log_level: "info".to_string(),
        verbose_db_logs: false,
    };
    // This may return Err if a global subscriber was already set by
    // another test in this process; that is acceptable.
    if let Ok(guard) = dbprobe::telemetry::init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn default_filter_quiets_sqlx_outside_development() {
    let quiet = TelemetryConfig {
        endpoint: None,
        service_name: "dbprobe-test".to_string(),
        log_level: "info".to_string(),
        verbose_db_logs: false,
    };
    assert_eq!(quiet.default_filter(), "info,sqlx=error");

    let verbose = TelemetryConfig {
        verbose_db_logs: true,
        log_level: "debug".to_string(),
        ..quiet
    };
    assert_eq!(verbose.default_filter(), "debug,sqlx=debug");
}

#[test]
fn probe_span_records_outcome() {
    let span = dbprobe::telemetry::probe::start_probe_span("test");
    dbprobe::telemetry::probe::record_probe_outcome(&span, "unhealthy", "CONNECTION_TIMEOUT");
}

#[test]
fn development_config_turns_on_sqlx_logs() {
    let mut config = dbprobe::config::Config {
        environment: "development".to_string(),
        otel_endpoint: Some("http://localhost:4317".to_string()),
        log_level: "warn".to_string(),
        health_tables: vec!["users".to_string()],
        bind_addr: "127.0.0.1:3000".parse().unwrap(),
    };

    let telemetry = TelemetryConfig::from_config(&config, "dbprobe");
    assert_eq!(telemetry.service_name, "dbprobe");
    assert_eq!(telemetry.endpoint.as_deref(), Some("http://localhost:4317"));
    assert_eq!(telemetry.default_filter(), "warn,sqlx=debug");

    config.environment = "production".to_string();
    assert_eq!(
        TelemetryConfig::from_config(&config, "dbprobe").default_filter(),
        "warn,sqlx=error"
    );
}
