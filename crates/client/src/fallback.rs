//! Synthetic responses returned when neither network nor cache can answer.

use reqwest::StatusCode;
use serde_json::json;

use crate::message::Response;

/// Neutral grey tile served in place of an unreachable image.
const IMAGE_PLACEHOLDER: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200">"#,
    r##"<rect width="200" height="200" fill="#e5e7eb"/>"##,
    r##"<text x="100" y="105" font-family="sans-serif" font-size="14" fill="#9ca3af" text-anchor="middle">Offline</text>"##,
    "</svg>"
);

const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1"><title>Offline</title></head>
<body>
<main>
<h1>You are offline</h1>
<p>This page is not available offline. Check your connection and try again.</p>
</main>
</body>
</html>
"#;

/// 503 JSON body for api requests.
pub fn network_error(url: &str) -> Response {
    let body = json!({
        "error": "network_unavailable",
        "message": "The network is unavailable and no fresh cached response exists.",
        "url": url,
    });
    Response::new(StatusCode::SERVICE_UNAVAILABLE, body.to_string()).with_content_type("application/json")
}

pub fn image_placeholder() -> Response {
    Response::new(StatusCode::OK, IMAGE_PLACEHOLDER).with_content_type("image/svg+xml")
}

/// Built-in page used when no offline page or app shell is cached.
pub fn offline_page() -> Response {
    Response::new(StatusCode::SERVICE_UNAVAILABLE, OFFLINE_PAGE).with_content_type("text/html; charset=utf-8")
}

/// 202 body telling the caller a write was queued for replay.
pub fn queued(id: i64) -> Response {
    Response::new(StatusCode::ACCEPTED, json!({ "queued": true, "id": id }).to_string())
        .with_content_type("application/json")
}
