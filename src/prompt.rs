//! Prompt generation: post copy in, ranked summary/prompt candidates out.
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::snippet;
use crate::llm::{ChatBackend, ChatMessage, ChatRequest, ChatResponse};
use crate::model::{GenerationOutcome, GenerationRequest, PromptPair};
use crate::parser::{parse_prompt_pairs, TARGET_PAIRS};
use crate::transport::error_message;

pub const DEFAULT_TEXT_MODEL: &str = "deepseek/deepseek-chat-v3-0324:free";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 400;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

const DEFAULT_COLORS: &str = "none specified";
const DEFAULT_STYLE: &str = "minimalist";
const DEFAULT_TONE: &str = "professional";

const TASK: &str = "You are a prompt engineer for text-to-image models.
For the post you are given, write EXACTLY 3 distinct summary/prompt pairs.
- Each summary is 3 to 7 words and concrete enough to picture on its own: name the subject, mood or style, not an abstract idea.
- Each prompt is a much longer, detailed visual description.
- The three prompts must differ in concept, composition or mood.
- Follow the brand colors and style below and keep the result minimal.
- The image must not contain any text, lettering or watermark.

Output ONLY the pairs in this exact format. No commentary, no explanation, no introduction:

Summary 1: <summary 1>
Prompt 1: <prompt 1>
Summary 2: <summary 2>
Prompt 2: <prompt 2>
Summary 3: <summary 3>
Prompt 3: <prompt 3>
";

/// Sampling knobs sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSettings {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_TEXT_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

pub fn system_prompt(request: &GenerationRequest) -> String {
    let colors = if request.brand_colors.is_empty() {
        DEFAULT_COLORS.to_string()
    } else {
        request.brand_colors.join(", ")
    };
    let style = non_blank(request.brand_style.as_deref()).unwrap_or(DEFAULT_STYLE);
    let tone = non_blank(request.tone.as_deref()).unwrap_or(DEFAULT_TONE);
    format!("{TASK}\nBrand colors: {colors}\nStyle: {style}\nTone: {tone}\n")
}

pub fn user_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!("Post: {}", request.post_content.trim());
    let tags: Vec<&str> = request
        .style_tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if !tags.is_empty() {
        prompt.push_str(&format!("\nStyle tags: {}", tags.join(", ")));
    }
    prompt.push_str("\nGenerate 3 distinct summary/prompt pairs as specified.");
    prompt
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Classify parsed pairs into an outcome. At most [`TARGET_PAIRS`] are kept.
pub fn classify(mut pairs: Vec<PromptPair>, raw_text: &str) -> GenerationOutcome {
    pairs.truncate(TARGET_PAIRS);
    match pairs.len() {
        0 => GenerationOutcome::Failure {
            reason: "could not extract any pairs".into(),
            raw_text: Some(raw_text.to_string()),
        },
        n if n < TARGET_PAIRS => GenerationOutcome::PartialSuccess {
            warning: format!("Only {n} pair(s) extracted; refine input or retry"),
            pairs,
        },
        _ => GenerationOutcome::Success { pairs },
    }
}

pub struct PromptGenerationClient {
    backend: Arc<dyn ChatBackend>,
    settings: PromptSettings,
}

impl PromptGenerationClient {
    pub fn new(backend: Arc<dyn ChatBackend>, settings: PromptSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &PromptSettings {
        &self.settings
    }

    pub fn build_chat_request(&self, request: &GenerationRequest) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt(request)),
                ChatMessage::user(user_prompt(request)),
            ],
            max_tokens: self.settings.max_output_tokens,
            temperature: self.settings.temperature,
        }
    }

    /// Ask the model for candidates. Never retries; every failure comes back
    /// as [`GenerationOutcome::Failure`].
    #[instrument(skip_all, fields(model = %self.settings.model))]
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        if request.post_content.trim().is_empty() {
            return GenerationOutcome::failure("missing post content");
        }

        let chat = self.build_chat_request(request);
        let raw = match self.backend.complete(&chat).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(?err, "chat completion failed");
                return GenerationOutcome::failure(err.to_string());
            }
        };

        if let Some(message) = error_message(&raw) {
            warn!(%message, "text backend reported an error");
            return GenerationOutcome::failure(message);
        }

        let decoded: ChatResponse = match serde_json::from_value(raw.clone()) {
            Ok(decoded) => decoded,
            Err(_) => {
                return GenerationOutcome::failure(format!(
                    "unexpected response shape: {}",
                    snippet(&raw.to_string())
                ))
            }
        };

        let Some(text) = decoded.answer_text() else {
            warn!(response = %raw, "no content returned");
            return GenerationOutcome::Failure {
                reason: "no content returned".into(),
                raw_text: Some(full_response(&raw)),
            };
        };
        debug!(raw_output = %text, "model output");

        let outcome = classify(parse_prompt_pairs(&text), &text);
        match &outcome {
            GenerationOutcome::Failure { .. } => warn!(raw_output = %text, "pair extraction failed"),
            GenerationOutcome::PartialSuccess { pairs, .. } => {
                warn!(pairs = pairs.len(), "partial pair extraction")
            }
            GenerationOutcome::Success { pairs } => info!(pairs = pairs.len(), "pairs extracted"),
        }
        outcome
    }
}

fn full_response(raw: &Value) -> String {
    serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string())
}
