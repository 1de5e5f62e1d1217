//! Prometheus metrics for the Lodge server.
//!
//! Exposes counters for the image lifecycle (uploads, finalizes, cleanups,
//! orphan sweeps) and document rendering.
//!
//! The `/metrics` endpoint is unauthenticated. Restrict it at the network
//! level when the server is reachable from outside.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use lodge_core::ImageUploadState;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Image lifecycle metrics
pub static IMAGE_UPLOADS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "lodge_image_uploads_total",
        "Total number of images stored in the temp area",
    )
    .expect("metric creation failed")
});

pub static IMAGE_UPLOAD_BYTES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "lodge_image_upload_bytes_total",
        "Total bytes stored in the temp area",
    )
    .expect("metric creation failed")
});

pub static IMAGE_UPLOADS_REJECTED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lodge_image_uploads_rejected_total",
            "Uploads rejected before any write, by reason",
        ),
        &["reason"],
    )
    .expect("metric creation failed")
});

pub static IMAGE_TRANSITIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lodge_image_transitions_total",
            "Upload state transitions by target state",
        ),
        &["state"],
    )
    .expect("metric creation failed")
});

pub static FINALIZE_OUTCOMES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lodge_finalize_total",
            "Finalize calls by outcome",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static FINALIZE_ROLLBACKS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "lodge_finalize_rollbacks_total",
        "Finalize calls whose permanent write was undone",
    )
    .expect("metric creation failed")
});

pub static FINALIZE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "lodge_finalize_duration_seconds",
            "Time taken to finalize a temp upload",
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
    )
    .expect("metric creation failed")
});

pub static ORPHANS_SWEPT: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "lodge_orphans_swept_total",
        "Unreferenced permanent images deleted by sweeps",
    )
    .expect("metric creation failed")
});

// Document metrics
pub static DOCUMENTS_RENDERED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lodge_documents_rendered_total",
            "Documents rendered by kind and result",
        ),
        &["kind", "result"],
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(IMAGE_UPLOADS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(IMAGE_UPLOAD_BYTES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(IMAGE_UPLOADS_REJECTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(IMAGE_TRANSITIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FINALIZE_OUTCOMES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FINALIZE_ROLLBACKS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FINALIZE_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ORPHANS_SWEPT.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(DOCUMENTS_RENDERED.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record an upload entering a new lifecycle state.
pub fn record_transition(state: ImageUploadState) {
    IMAGE_TRANSITIONS.with_label_values(&[state.as_str()]).inc();
}

/// Record a finalize outcome (`ok` or the error code).
pub fn record_finalize(outcome: &str) {
    FINALIZE_OUTCOMES.with_label_values(&[outcome]).inc();
}

/// Record an upload rejected before it was stored.
pub fn record_upload_rejected(reason: &str) {
    IMAGE_UPLOADS_REJECTED.with_label_values(&[reason]).inc();
}

/// Record a rendered (or failed) document.
pub fn record_document(kind: &str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    DOCUMENTS_RENDERED.with_label_values(&[kind, result]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        register_metrics();
        register_metrics();
    }

    #[test]
    fn test_transitions_are_labelled_by_state() {
        let before = IMAGE_TRANSITIONS
            .with_label_values(&[ImageUploadState::Abandoned.as_str()])
            .get();
        record_transition(ImageUploadState::Abandoned);
        let after = IMAGE_TRANSITIONS
            .with_label_values(&[ImageUploadState::Abandoned.as_str()])
            .get();
        assert_eq!(after, before + 1);
    }
}
