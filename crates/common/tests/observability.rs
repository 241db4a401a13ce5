use metrics_exporter_prometheus::PrometheusBuilder;

// Integration test: goes through the public `common::observability` surface.

#[test]
fn tracing_error_events_counter_increments_on_error_event() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    metrics::with_local_recorder(&recorder, || {
        let (dispatch, otel_guard) = common::observability::build_dispatch("test-scorer", "info");
        assert!(otel_guard.is_none() || std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok());

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::error!(wallet = "0xabc", "ingestion failed");
            tracing::info!("not counted");
        });
    });

    let rendered = handle.render();
    assert!(
        rendered.contains("tracing_error_events 1"),
        "expected one tracing_error_events in rendered metrics, got:\n{rendered}"
    );
}
