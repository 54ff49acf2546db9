//! Wiremock stand-ins for the auth provider and the video provider.

use crate::keys::jwks_json;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the auth provider publishes its signing keys on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Serve `keys` as the JWKS document on [`JWKS_PATH`].
pub async fn mount_jwks(server: &MockServer, keys: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(keys)))
        .mount(server)
        .await;
}

/// JWKS URL of a mock auth provider.
pub fn jwks_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), JWKS_PATH)
}

/// Provider-shaped body for `GET /video/call/{type}/{id}`.
pub fn call_response_json(call_type: &str, id: &str) -> Value {
    json!({
        "call": {
            "id": id,
            "cid": format!("{}:{}", call_type, id),
            "type": call_type,
            "created_at": "2024-01-15T10:00:00Z"
        },
        "members": [],
        "duration": "1.23ms"
    })
}

/// Video provider knows a call `id` of `call_type`.
///
/// Only matches requests carrying `api_key` and a JWT in `Authorization`.
pub async fn mount_call(server: &MockServer, api_key: &str, call_type: &str, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/video/call/{}/{}", call_type, id)))
        .and(query_param("api_key", api_key))
        .and(header("stream-auth-type", "jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(call_response_json(call_type, id)))
        .mount(server)
        .await;
}

/// Video provider has no call `id` of `call_type`.
pub async fn mount_call_missing(server: &MockServer, call_type: &str, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/video/call/{}/{}", call_type, id)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": 16,
            "message": "GetCall failed with error: \"Can't find call with id\"",
            "StatusCode": 404
        })))
        .mount(server)
        .await;
}

/// Video provider fails every call lookup with `status`.
pub async fn mount_call_error(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(wiremock::matchers::path_regex(r"^/video/call/.*"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
