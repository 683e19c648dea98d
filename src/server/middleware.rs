use axum::{ extract::Request, http::HeaderValue, middleware::Next, response::Response };
use log::info;
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// One log line per request, tagged with a fresh id that is echoed back to
/// the caller.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let mut response = next.run(req).await;

    info!(
        "[{}] {} {} {} {:?}",
        request_id,
        method,
        path,
        response.status().as_u16(),
        start.elapsed()
    );
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
