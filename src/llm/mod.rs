use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod gemini;

pub use gemini::GeminiClient;

/// Errors raised while talking to the generative model.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("malformed model response: {0}")]
    Malformed(String),
    #[error("model returned no candidates")]
    Empty,
}

/// Who authored a conversation turn sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

#[derive(Debug, Clone)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// A function the model may ask us to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A function invocation emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Text and function calls from one model turn, in emission order.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: String,
    pub function_calls: Vec<FunctionCall>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Plain completion for a single prompt.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Completion with a system instruction, prior turns and callable tools.
    async fn generate_with_tools(
        &self,
        system: &str,
        turns: &[Turn],
        tools: &[FunctionDeclaration],
    ) -> Result<ModelReply, LlmError>;
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    /// Replays canned replies; records the prompts it was given.
    #[derive(Default)]
    pub struct ScriptedLlm {
        pub text: String,
        pub reply: ModelReply,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        pub fn with_text(text: &str) -> Self {
            Self {
                text: text.to_string(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            if let Ok(mut p) = self.prompts.lock() {
                p.push(prompt.to_string());
            }
            Ok(self.text.clone())
        }

        async fn generate_with_tools(
            &self,
            system: &str,
            _turns: &[Turn],
            _tools: &[FunctionDeclaration],
        ) -> Result<ModelReply, LlmError> {
            if let Ok(mut p) = self.prompts.lock() {
                p.push(system.to_string());
            }
            Ok(self.reply.clone())
        }
    }
}
