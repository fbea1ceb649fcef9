//! Gemini `generateContent` classifier

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use super::{build_prompt, ClassificationBatch, Classifier};
use crate::config::ClassifierConfig;
use crate::error::{Result, ZotsortError};
use crate::map_response_err;
use crate::remote::RetryPolicy;

const SERVICE: &str = "gemini";

pub struct GeminiClassifier {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
    retry: RetryPolicy,
}

impl GeminiClassifier {
    pub fn new(config: &ClassifierConfig, retry: RetryPolicy) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build();
        Self {
            agent,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            retry,
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

/// Request body asking for a JSON answer
fn request_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": { "responseMimeType": "application/json" }
    })
}

/// Concatenated text parts of the first candidate
fn response_text(response: &Value) -> Result<String> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            let reason = response
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .map_or_else(|| "no candidates".to_string(), |r| format!("blocked: {}", r));
            map_response_err!(SERVICE, reason)
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(map_response_err!(SERVICE, "empty candidate text"));
    }
    Ok(text)
}

fn map_ureq_error(err: ureq::Error) -> ZotsortError {
    match err {
        ureq::Error::Status(status, response) => {
            let retry_after = response
                .header("Retry-After")
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.into_string().unwrap_or_default();
            ZotsortError::remote_status(SERVICE, status, body).with_retry_after(retry_after)
        }
        ureq::Error::Transport(transport) => ZotsortError::remote_transport(SERVICE, transport),
    }
}

impl Classifier for GeminiClassifier {
    fn classify(&self, batch: &ClassificationBatch, taxonomy: &[String]) -> Result<String> {
        let body = request_body(&build_prompt(batch, taxonomy));
        let url = self.url();

        let response: Value = self.retry.run("classify batch", |_| {
            self.agent
                .post(&url)
                .set("x-goog-api-key", &self.api_key)
                .send_json(body.clone())
                .map_err(map_ureq_error)?
                .into_json()
                .map_err(|e| map_response_err!(SERVICE, e))
        })?;

        let text = response_text(&response)?;
        debug!(batch = batch.index, papers = batch.len(), chars = text.len(), "classifier replied");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Paper;
    use crate::remote::Item;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_request_body_shape() {
        let body = request_body("hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"0\":" }, { "text": " \"A\"}" }] } }]
        });
        assert_eq!(response_text(&response).unwrap(), "{\"0\": \"A\"}");
    }

    #[test]
    fn test_response_text_errors() {
        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = response_text(&blocked).unwrap_err();
        assert!(err.to_string().contains("blocked: SAFETY"));
        assert!(!err.is_transient());

        let empty = json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] });
        assert!(response_text(&empty).is_err());
    }

    #[test]
    fn test_url_from_config() {
        let config = ClassifierConfig {
            endpoint: "https://example.test/v1beta/".into(),
            model: "gemini-2.5-flash-lite".into(),
            ..Default::default()
        };
        let classifier = GeminiClassifier::new(&config, RetryPolicy::none());
        assert_eq!(
            classifier.url(),
            "https://example.test/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_classify_sends_key_in_header() {
        let mock_server = MockServer::start().await;
        let reply = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"0\": \"Hydrology/Methods\"}" }] } }]
        });

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/models/test-model:generateContent"))
            .and(matchers::header("x-goog-api-key", "secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = ClassifierConfig {
            endpoint: mock_server.uri(),
            model: "test-model".into(),
            api_key: "secret-key".into(),
            ..Default::default()
        };
        let classifier = GeminiClassifier::new(&config, RetryPolicy::none());
        let batch = ClassificationBatch {
            index: 0,
            papers: vec![Paper::new(
                Item {
                    key: "P1".into(),
                    item_type: "journalArticle".into(),
                    title: "Flash drought onset".into(),
                    ..Default::default()
                },
                vec!["soil moisture".into()],
            )],
        };
        let taxonomy = vec!["Hydrology/Methods".to_string()];

        let text = tokio::task::spawn_blocking(move || classifier.classify(&batch, &taxonomy))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text, "{\"0\": \"Hydrology/Methods\"}");

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.query_pairs().all(|(name, _)| name != "key"));
        assert!(!requests[0].url.as_str().contains("secret-key"));

        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Flash drought onset"));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_classify_retries_server_errors() {
        let mock_server = MockServer::start().await;
        let reply = json!({ "candidates": [{ "content": { "parts": [{ "text": "{}" }] } }] });

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = ClassifierConfig {
            endpoint: mock_server.uri(),
            api_key: "secret-key".into(),
            ..Default::default()
        };
        let retry = RetryPolicy::new(2, std::time::Duration::ZERO, std::time::Duration::ZERO);
        let classifier = GeminiClassifier::new(&config, retry);
        let batch = ClassificationBatch {
            index: 3,
            papers: Vec::new(),
        };

        let text = tokio::task::spawn_blocking(move || classifier.classify(&batch, &[]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text, "{}");
    }
}
