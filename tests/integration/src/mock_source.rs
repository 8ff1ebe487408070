//! Mock open-data API for integration testing
//!
//! Wraps a wiremock server that answers like a paginated JSON-LD source.

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock data source
pub struct MockSource {
    pub server: MockServer,
}

impl MockSource {
    /// Start a new mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the API root, with trailing slash
    pub fn base_url(&self) -> String {
        format!("{}/api/v2/", self.server.uri())
    }

    /// Number of requests received for `endpoint`
    pub async fn calls(&self, endpoint: &str) -> usize {
        let full = format!("/api/v2/{endpoint}");
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == full)
            .count()
    }

    /// Answer `endpoint` with a JSON body
    pub async fn mock_json(&self, endpoint: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/{endpoint}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(body)
                    .append_header("Content-Type", "application/ld+json"),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer `endpoint` with a JSON body only when `key=value` is in the query
    pub async fn mock_json_for_query(&self, endpoint: &str, key: &str, value: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/{endpoint}")))
            .and(query_param(key, value))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer `endpoint` with a bare status and text body
    pub async fn mock_status(&self, endpoint: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/{endpoint}")))
            .respond_with(ResponseTemplate::new(status).set_body_string("error"))
            .mount(&self.server)
            .await;
    }

    /// Answer `endpoint` with `status` for the first `times` requests only
    pub async fn mock_status_times(&self, endpoint: &str, status: u16, times: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/{endpoint}")))
            .respond_with(ResponseTemplate::new(status).set_body_string("error"))
            .up_to_n_times(times)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Answer `endpoint` with a JSON body after a delay
    pub async fn mock_delayed(&self, endpoint: &str, body: Value, delay: Duration) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/{endpoint}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    /// Answer `endpoint` with a raw body
    pub async fn mock_raw(&self, endpoint: &str, body: impl Into<String>) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/{endpoint}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.into()))
            .mount(&self.server)
            .await;
    }
}

/// A JSON-LD style listing envelope
pub fn listing(ids: &[&str]) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": format!("person/{id}"), "type": "Person", "label": id}))
        .collect();
    json!({"@context": [{"data": "@graph"}], "data": data})
}
