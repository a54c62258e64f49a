//! Mock HTTP server setup for integration tests

#![allow(dead_code)]

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use std::time::Duration;
use unreal_speech::{PollConfig, SpeechClient};

pub const API_KEY: &str = "test-key";

/// Test fixture that owns a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Client pointed at the mock server, polling every `interval_ms`.
    pub fn client(&self, interval_ms: u64) -> SpeechClient {
        SpeechClient::builder()
            .api_key(API_KEY)
            .base_url(&self.base_url)
            .poll_config(PollConfig::new(Duration::from_millis(interval_ms), 10))
            .build()
            .expect("client should build")
    }

    pub async fn mock_create(&mut self, task_id: &str) -> Mock {
        self.server
            .mock("POST", "/synthesisTasks")
            .match_header("authorization", format!("Bearer {}", API_KEY).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(task_body(task_id, "scheduled", None))
            .create_async()
            .await
    }

    /// Status reply served exactly `hits` times.
    pub async fn mock_status(
        &mut self,
        task_id: &str,
        status: &str,
        output_uri: Option<&str>,
        hits: usize,
    ) -> Mock {
        self.server
            .mock("GET", format!("/synthesisTasks/{}", task_id).as_str())
            .match_header("authorization", format!("Bearer {}", API_KEY).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(task_body(task_id, status, output_uri))
            .expect(hits)
            .create_async()
            .await
    }

    pub async fn mock_error(&mut self, method: &str, path: &str, status: usize, hits: usize) -> Mock {
        self.server
            .mock(method, path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"error"}"#)
            .expect(hits)
            .create_async()
            .await
    }

    pub async fn mock_json(&mut self, path: &str, body: Matcher, reply: &str) -> Mock {
        self.server
            .mock("POST", path)
            .match_body(body)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply)
            .create_async()
            .await
    }
}

pub fn task_body(task_id: &str, status: &str, output_uri: Option<&str>) -> String {
    let mut task = json!({
        "TaskId": task_id,
        "TaskStatus": status,
        "CreationTime": "2024-05-01T12:00:00Z",
        "RequestCharacters": 5,
        "VoiceId": "Scarlett",
    });
    if let Some(uri) = output_uri {
        task["OutputUri"] = json!(uri);
    }
    json!({ "SynthesisTask": task }).to_string()
}
