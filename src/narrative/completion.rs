// src/narrative/completion.rs
//! Narrative from an OpenAI-compatible chat completion endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{NarrativeError, NarrativeGenerator, NarrativeOptions};
use crate::aggregate::Analysis;
use crate::config::NarrativeConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// System and user messages for one narrative request. Caller instructions
/// replace the configured ones; knowledge snippets are listed after them.
pub fn build_prompt(
    analysis: &Analysis,
    options: &NarrativeOptions,
    default_instructions: &str,
) -> Result<Vec<ChatMessage>, NarrativeError> {
    let mut system = options
        .instructions
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default_instructions)
        .to_string();

    let snippets: Vec<&str> = options
        .knowledge
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if !snippets.is_empty() {
        system.push_str("\n\nReference notes:");
        for s in snippets {
            system.push_str("\n- ");
            system.push_str(s);
        }
    }

    let digest = serde_json::to_string_pretty(&analysis.digest())
        .map_err(|e| NarrativeError::InvalidResponse(format!("encoding analysis: {e}")))?;

    Ok(vec![
        ChatMessage::new("system", system),
        ChatMessage::new(
            "user",
            format!("Write the strategy summary for this CSP event analysis:\n{digest}"),
        ),
    ])
}

pub struct CompletionNarrative {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    instructions: String,
}

impl CompletionNarrative {
    /// Fails with `NotConfigured` when the API key variable is unset.
    pub fn from_config(cfg: &NarrativeConfig) -> Result<Self, NarrativeError> {
        let key = cfg
            .api_key()
            .ok_or_else(|| NarrativeError::NotConfigured(format!("set {} env var", cfg.api_key_env)))?;
        Self::with_api_key(cfg, key)
    }

    pub fn with_api_key(cfg: &NarrativeConfig, api_key: String) -> Result<Self, NarrativeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.clone(),
            model: cfg.model.clone(),
            api_key,
            temperature: cfg.temperature,
            instructions: cfg.instructions.clone(),
        })
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

#[async_trait]
impl NarrativeGenerator for CompletionNarrative {
    fn name(&self) -> &str {
        "completion"
    }

    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn generate(
        &self,
        analysis: &Analysis,
        options: &NarrativeOptions,
    ) -> Result<String, NarrativeError> {
        let request = ChatRequest {
            model: &self.model,
            messages: build_prompt(analysis, options, &self.instructions)?,
            temperature: self.temperature,
        };

        debug!(url = %self.completions_url(), "sending chat completion request");
        let response = self
            .http
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Request(format!("HTTP {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| NarrativeError::InvalidResponse(format!("failed to parse response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(NarrativeError::Empty);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::analyze;
    use crate::carrier::CarrierDirectory;
    use crate::ownership::OwnershipVocabulary;
    use crate::process::parse_rows;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn analysis() -> Analysis {
        let tx = parse_rows("carrier,cost,origin_city,dest_city\nABCD,100,Dallas,Houston\n");
        analyze(
            &tx,
            &[],
            &CarrierDirectory::default(),
            &OwnershipVocabulary::default(),
        )
        .unwrap()
    }

    fn config(base_url: &str) -> NarrativeConfig {
        NarrativeConfig {
            base_url: base_url.to_string(),
            model: "test-model".into(),
            timeout_secs: 5,
            ..NarrativeConfig::default()
        }
    }

    #[test]
    fn test_prompt_uses_default_instructions() {
        let msgs = build_prompt(&analysis(), &NarrativeOptions::default(), "Be brief.").unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert_eq!(msgs[0].content, "Be brief.");
        assert!(msgs[1].content.contains("\"shipment_count\": 1"));
        assert!(msgs[1].content.contains("Dallas → Houston"));
    }

    #[test]
    fn test_prompt_instructions_override_and_knowledge_appended() {
        let options = NarrativeOptions {
            instructions: Some("Focus on lanes.".into()),
            knowledge: vec!["Dallas is a hub.".into(), "  ".into()],
        };
        let msgs = build_prompt(&analysis(), &options, "Be brief.").unwrap();
        assert_eq!(
            msgs[0].content,
            "Focus on lanes.\n\nReference notes:\n- Dallas is a hub."
        );
    }

    #[tokio::test]
    async fn test_generate_returns_completion_text() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "  Spend is concentrated.  "},
                "finish_reason": "stop"
            }]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let narrator = CompletionNarrative::with_api_key(&config(&server.uri()), "sk-test".into()).unwrap();
        let text = narrator
            .generate(&analysis(), &NarrativeOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "Spend is concentrated.");
    }

    #[tokio::test]
    async fn test_generate_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let narrator = CompletionNarrative::with_api_key(&config(&server.uri()), "sk-test".into()).unwrap();
        let err = narrator
            .generate(&analysis(), &NarrativeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NarrativeError::Request(ref m) if m.contains("500")));
    }

    #[tokio::test]
    async fn test_generate_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let narrator = CompletionNarrative::with_api_key(&config(&server.uri()), "sk-test".into()).unwrap();
        let err = narrator
            .generate(&analysis(), &NarrativeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NarrativeError::Empty));
    }
}
