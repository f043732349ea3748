//! Request correlation and error-envelope completion.

use axum::Json;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use common::{ErrorBody, REQUEST_ID_HEADER, RequestId};

/// Resolves the request's correlation id and attaches it everywhere.
///
/// The inbound `X-Request-Id` is kept when present, otherwise a UUID is
/// generated. The id is written back into the request headers (so the trace
/// span picks it up), stored in the request extensions, and echoed on the
/// response. Error responses get `path` and `correlationId` filled in.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::from_header(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    )
    .unwrap_or_else(RequestId::generate);
    let header = HeaderValue::from_str(request_id.as_str()).ok();

    if let Some(value) = &header {
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }
    let path = request.uri().path().to_string();
    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;
    metrics::counter!(
        "http_responses_total",
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);

    if let Some(mut body) = response.extensions_mut().remove::<ErrorBody>() {
        body.path = Some(path);
        body.correlation_id = Some(request_id.to_string());
        response = (response.status(), Json(body)).into_response();
    }
    if let Some(value) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
