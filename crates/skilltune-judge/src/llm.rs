//! LLM-backed judge over an OpenAI-compatible chat completion endpoint

use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use serde::Deserialize;
use skilltune_types::{Confidence, Judgement, SkillDescriptor};
use tracing::{debug, info};

use crate::classifier::{JudgeError, Result, TextClassifier};

const SYSTEM_PROMPT: &str = "You decide whether an assistant skill should be invoked for a \
single user request. You see the skill's name and description and the request, nothing else. \
Invoke only when the request clearly falls within what the description covers. If the request \
could reasonably be served by two or more different tools, or the right move is to ask the user \
a clarifying question, do NOT invoke. Reply with a single JSON object and nothing else: \
{\"invoke\": true|false, \"confidence\": \"high\"|\"medium\"|\"low\", \"justification\": \
\"one sentence naming the description terms that matched, or why none did\"}";

/// LLM endpoint the judge talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgeProvider {
    OpenAI {
        model: String,
        api_key: Option<String>,
        base_url: Option<String>,
    },
    Ollama {
        model: String,
        base_url: String,
    },
}

impl JudgeProvider {
    pub fn openai(model: &str) -> Self {
        JudgeProvider::OpenAI {
            model: model.to_string(),
            api_key: None,
            base_url: None,
        }
    }

    pub fn ollama(model: &str, base_url: &str) -> Self {
        JudgeProvider::Ollama {
            model: model.to_string(),
            base_url: base_url.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        match self {
            JudgeProvider::OpenAI { model, .. } | JudgeProvider::Ollama { model, .. } => model,
        }
    }
}

/// Judge that asks a chat model for a structured decision
pub struct LlmClassifier {
    client: Client<OpenAIConfig>,
    model: String,
    label: String,
}

impl LlmClassifier {
    pub fn new(provider: JudgeProvider) -> Self {
        let label = match &provider {
            JudgeProvider::OpenAI { model, .. } => format!("openai:{model}"),
            JudgeProvider::Ollama { model, .. } => format!("ollama:{model}"),
        };

        let (config, model) = match provider {
            JudgeProvider::OpenAI {
                model,
                api_key,
                base_url,
            } => {
                let mut config = OpenAIConfig::new();
                if let Some(key) = api_key.filter(|k| !k.is_empty()) {
                    config = config.with_api_key(key);
                }
                if let Some(url) = base_url.filter(|u| !u.is_empty()) {
                    config = config.with_api_base(url);
                }
                (config, model)
            }
            JudgeProvider::Ollama { model, base_url } => {
                let config = OpenAIConfig::new().with_api_base(ollama_api_base(&base_url));
                (config, model)
            }
        };

        info!("LLM judge initialized with: {}", label);
        Self {
            client: Client::with_config(config),
            model,
            label,
        }
    }
}

#[async_trait]
impl TextClassifier for LlmClassifier {
    fn name(&self) -> &str {
        &self.label
    }

    async fn classify(&self, prompt_text: &str, descriptor: &SkillDescriptor) -> Result<Judgement> {
        let provider_err = |e: async_openai::error::OpenAIError| JudgeError::Provider(e.to_string());

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(provider_err)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_user_prompt(prompt_text, descriptor))
                .build()
                .map_err(provider_err)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(messages)
            .temperature(0.0)
            .build()
            .map_err(provider_err)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(provider_err)?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| JudgeError::InvalidResponse("model returned no content".into()))?;

        debug!("Judge '{}' raw response: {}", self.label, content);
        parse_judgement(&content)
    }
}

/// Ollama serves the OpenAI-compatible API under /v1
fn ollama_api_base(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

/// The single user message: descriptor plus request, no labels
pub fn build_user_prompt(prompt_text: &str, descriptor: &SkillDescriptor) -> String {
    format!(
        "Skill name: {}\nSkill description: {}\n\nUser request:\n{}\n\n\
         Should this skill be invoked for this request? Reply with the JSON object only.",
        descriptor.name, descriptor.description, prompt_text
    )
}

#[derive(Debug, Deserialize)]
struct RawJudgement {
    #[serde(alias = "invoked")]
    invoke: bool,
    confidence: String,
    #[serde(default)]
    justification: String,
}

/// Parse the model's JSON reply, tolerating code fences and surrounding prose
pub fn parse_judgement(raw: &str) -> Result<Judgement> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &raw[s..=e],
        _ => {
            return Err(JudgeError::InvalidResponse(format!(
                "no JSON object in response: {}",
                raw.trim()
            )))
        }
    };

    let parsed: RawJudgement =
        serde_json::from_str(json).map_err(|e| JudgeError::InvalidResponse(e.to_string()))?;

    let confidence = Confidence::parse(&parsed.confidence).ok_or_else(|| {
        JudgeError::InvalidResponse(format!("unknown confidence '{}'", parsed.confidence))
    })?;

    let justification = if parsed.justification.trim().is_empty() {
        "judge gave no justification".to_string()
    } else {
        parsed.justification.trim().to_string()
    };

    Ok(Judgement {
        invoked: parsed.invoke,
        confidence,
        justification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let j = parse_judgement(
            r#"{"invoke": true, "confidence": "high", "justification": "mentions threads"}"#,
        )
        .unwrap();
        assert!(j.invoked);
        assert_eq!(j.confidence, Confidence::High);
        assert_eq!(j.justification, "mentions threads");
    }

    #[test]
    fn test_parse_fenced_json_with_alias() {
        let raw = "Here you go:\n```json\n{\"invoked\": false, \"confidence\": \"LOW\"}\n```";
        let j = parse_judgement(raw).unwrap();
        assert!(!j.invoked);
        assert_eq!(j.confidence, Confidence::Low);
        assert_eq!(j.justification, "judge gave no justification");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_judgement("sure, invoke it"),
            Err(JudgeError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_judgement(r#"{"invoke": true, "confidence": "certain"}"#),
            Err(JudgeError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_user_prompt_carries_only_text_and_descriptor() {
        let descriptor = SkillDescriptor::new("tweet-writer", "Drafts tweets.");
        let prompt = build_user_prompt("draft a thread", &descriptor);
        assert!(prompt.contains("tweet-writer"));
        assert!(prompt.contains("Drafts tweets."));
        assert!(prompt.contains("draft a thread"));
        assert!(!prompt.contains("MUST_INVOKE"));
    }

    #[test]
    fn test_ollama_api_base() {
        assert_eq!(ollama_api_base("http://localhost:11434"), "http://localhost:11434/v1");
        assert_eq!(ollama_api_base("http://localhost:11434/v1/"), "http://localhost:11434/v1");
    }

    #[test]
    fn test_provider_model() {
        assert_eq!(JudgeProvider::openai("gpt-4o-mini").model(), "gpt-4o-mini");
        assert_eq!(
            JudgeProvider::ollama("llama3", "http://localhost:11434").model(),
            "llama3"
        );
    }
}
