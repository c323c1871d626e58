//! Engine facade: the two operations a front end calls.
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::{EngineError, VisualFailure};
use crate::image::{ImageProvider, ReplicateProvider, TogetherProvider, VisualGenerationOrchestrator};
use crate::llm::{ChatBackend, OpenRouterClient};
use crate::model::{BrandGuide, GeneratedImage, GenerationOutcome, GenerationRequest, ProviderKind};
use crate::prompt::PromptGenerationClient;

pub struct ContentEngine {
    prompts: PromptGenerationClient,
    visuals: VisualGenerationOrchestrator,
}

impl ContentEngine {
    pub fn new(prompts: PromptGenerationClient, visuals: VisualGenerationOrchestrator) -> Self {
        Self { prompts, visuals }
    }

    /// Wire the HTTP backends with credentials from `cfg`. Missing credentials
    /// are not an error here; they surface when the backend is first used.
    pub fn from_config(cfg: &Config) -> Result<Self, EngineError> {
        let backend: Arc<dyn ChatBackend> = Arc::new(OpenRouterClient::new(
            &cfg.text.api_base,
            cfg.text.api_key.clone(),
            cfg.text_timeout(),
        )?);
        let replicate: Arc<dyn ImageProvider> =
            Arc::new(ReplicateProvider::new(cfg.replicate_settings())?);
        let together: Arc<dyn ImageProvider> =
            Arc::new(TogetherProvider::new(cfg.together_settings())?);

        let prompts = PromptGenerationClient::new(backend, cfg.prompt_settings());
        let visuals = VisualGenerationOrchestrator::new(cfg.poller())
            .with_provider(replicate)
            .with_provider(together);
        info!(text_model = %cfg.text.model, "content engine ready");
        Ok(Self::new(prompts, visuals))
    }

    /// Tone precedence: `tone`, then the brand guide's tone, then the default.
    pub async fn generate_prompt_from_post(
        &self,
        post_content: &str,
        style_tags: &[String],
        brand_guide: Option<&BrandGuide>,
        tone: Option<&str>,
    ) -> GenerationOutcome {
        let mut request = GenerationRequest::new(post_content)
            .with_style_tags(style_tags)
            .with_tone(tone);
        if let Some(guide) = brand_guide {
            request = request.with_brand_guide(guide);
        }
        self.prompts.generate(&request).await
    }

    pub async fn generate_visual(
        &self,
        prompt: &str,
        provider: ProviderKind,
        model: &str,
        count: u32,
    ) -> Result<Vec<GeneratedImage>, VisualFailure> {
        self.visuals.generate(prompt, provider, model, count).await
    }
}
