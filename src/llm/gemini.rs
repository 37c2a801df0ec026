use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{FunctionCall, FunctionDeclaration, LlmClient, LlmError, ModelReply, Turn, TurnRole};
use crate::config::LlmConfig;

/// `generateContent` client for the Google generative-language REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool<'a>>>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct Tool<'a> {
    function_declarations: &'a [FunctionDeclaration],
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
    #[serde(rename = "functionCall", alias = "function_call")]
    function_call: Option<FunctionCall>,
}

impl GeminiClient {
    pub fn new(cfg: &LlmConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call(&self, request: &GeminiRequest<'_>) -> Result<ModelReply, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "gemini request failed");
                LlmError::Transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "gemini returned error");
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let reply = parse_reply(&body)?;
        debug!(
            text_len = reply.text.len(),
            calls = reply.function_calls.len(),
            "gemini reply"
        );
        Ok(reply)
    }
}

fn content_for(turn: &Turn) -> Content {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Model => "model",
    };
    Content {
        role: Some(role),
        parts: vec![TextPart {
            text: turn.text.clone(),
        }],
    }
}

/// Flattens the first candidate into concatenated text plus function calls.
fn parse_reply(body: &str) -> Result<ModelReply, LlmError> {
    let parsed: GeminiResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Malformed(e.to_string()))?;
    let candidate = parsed.candidates.into_iter().next().ok_or(LlmError::Empty)?;

    let mut reply = ModelReply::default();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(call) = part.function_call {
            reply.function_calls.push(call);
        }
        if let Some(text) = part.text {
            reply.text.push_str(&text);
        }
    }
    Ok(reply)
}

#[async_trait]
impl LlmClient for GeminiClient {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GeminiRequest {
            contents: vec![content_for(&Turn::user(prompt))],
            system_instruction: None,
            tools: None,
        };
        Ok(self.call(&request).await?.text)
    }

    #[instrument(skip_all, fields(model = %self.model, turns = turns.len()))]
    async fn generate_with_tools(
        &self,
        system: &str,
        turns: &[Turn],
        tools: &[FunctionDeclaration],
    ) -> Result<ModelReply, LlmError> {
        let request = GeminiRequest {
            contents: turns.iter().map(content_for).collect(),
            system_instruction: Some(Content {
                role: None,
                parts: vec![TextPart {
                    text: system.to_string(),
                }],
            }),
            tools: (!tools.is_empty()).then(|| {
                vec![Tool {
                    function_declarations: tools,
                }]
            }),
        };
        self.call(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_reply_collects_text_and_calls_in_order() {
        let body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Swapping your toast. " },
                        { "functionCall": { "name": "remove_food_item", "args": { "food_id": "abc" } } },
                        { "text": "Done." }
                    ]
                }
            }]
        })
        .to_string();

        let reply = parse_reply(&body).expect("parse");
        assert_eq!(reply.text, "Swapping your toast. Done.");
        assert_eq!(reply.function_calls.len(), 1);
        assert_eq!(reply.function_calls[0].name, "remove_food_item");
        assert_eq!(reply.function_calls[0].args["food_id"], "abc");
    }

    #[test]
    fn parse_reply_without_candidates_is_empty_error() {
        let err = parse_reply(r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, LlmError::Empty));
    }

    #[test]
    fn parse_reply_rejects_non_json() {
        let err = parse_reply("<html>").unwrap_err();
        assert!(matches!(err, LlmError::Malformed(_)));
    }

    #[test]
    fn request_carries_system_instruction_and_tools() {
        let tools = vec![FunctionDeclaration {
            name: "noop".into(),
            description: "does nothing".into(),
            parameters: json!({ "type": "OBJECT", "properties": {} }),
        }];
        let request = GeminiRequest {
            contents: vec![content_for(&Turn::user("hi")), content_for(&Turn::model("hello"))],
            system_instruction: Some(Content {
                role: None,
                parts: vec![TextPart { text: "be brief".into() }],
            }),
            tools: Some(vec![Tool {
                function_declarations: &tools,
            }]),
        };

        let v = serde_json::to_value(&request).expect("serialize");
        assert_eq!(v["contents"][0]["role"], "user");
        assert_eq!(v["contents"][1]["role"], "model");
        assert_eq!(v["system_instruction"]["parts"][0]["text"], "be brief");
        assert!(v["system_instruction"].get("role").is_none());
        assert_eq!(v["tools"][0]["function_declarations"][0]["name"], "noop");
    }
}
