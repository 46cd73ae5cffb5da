use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Record request count and latency per method/path/status.
///
/// Uses the matched route template when available so path parameters do not
/// explode label cardinality.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    metrics::counter!(
        crate::names::HTTP_REQUESTS_TOTAL,
        "method" => method.clone(), "path" => path.clone(), "status" => status.clone(),
    )
    .increment(1);
    metrics::histogram!(
        crate::names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method, "path" => path, "status" => status,
    )
    .record(elapsed);

    response
}
