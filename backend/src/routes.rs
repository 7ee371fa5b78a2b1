use axum::{
    routing::{get, post},
    Extension, Router,
};
use axum_prometheus::PrometheusMetricLayer;

use crate::context::AppContext;
use crate::{billing, generation, history, webhooks};

async fn root() -> &'static str {
    "Repurpose API"
}

pub fn api_routes() -> Router {
    Router::new()
        .route("/api/generate", post(generation::generate))
        .route("/api/history", get(history::list_history))
        .route("/api/stripe/checkout", post(billing::billing_create_checkout))
        .route("/api/stripe/webhook", post(webhooks::stripe_webhook))
}

/// Full application router bound to one context.
pub fn app(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(root))
        .merge(api_routes())
        .layer(Extension(ctx))
}

/// Adds `/metrics`. The Prometheus recorder is process-global, so call this once.
pub fn with_metrics(router: Router) -> Router {
    let (prometheus_layer, metrics_handle) = PrometheusMetricLayer::pair();
    router
        .route(
            "/metrics",
            get(move || async move { metrics_handle.render() }),
        )
        .layer(prometheus_layer)
}
