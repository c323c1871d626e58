use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One (summary, prompt) record extracted from model output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptPair {
    pub summary: String,
    pub prompt: String,
}

/// Client-supplied brand data used to bias prompt text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrandGuide {
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub logo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

/// Input to the prompt generation client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub post_content: String,
    pub style_tags: Vec<String>,
    pub brand_colors: Vec<String>,
    pub brand_style: Option<String>,
    pub tone: Option<String>,
}

impl GenerationRequest {
    pub fn new(post_content: impl Into<String>) -> Self {
        Self {
            post_content: post_content.into(),
            ..Default::default()
        }
    }

    pub fn with_style_tags(mut self, tags: &[String]) -> Self {
        self.style_tags = tags.to_vec();
        self
    }

    /// Copy colours, style and tone from a brand guide. A tone already set on
    /// the request wins over the guide's tone.
    pub fn with_brand_guide(mut self, guide: &BrandGuide) -> Self {
        self.brand_colors = guide.colors.clone();
        self.brand_style = guide.style.clone();
        if self.tone.is_none() {
            self.tone = guide.tone.clone();
        }
        self
    }

    pub fn with_tone(mut self, tone: Option<&str>) -> Self {
        if let Some(tone) = tone.map(str::trim).filter(|t| !t.is_empty()) {
            self.tone = Some(tone.to_string());
        }
        self
    }
}

/// Result of a prompt generation call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Success {
        pairs: Vec<PromptPair>,
    },
    PartialSuccess {
        pairs: Vec<PromptPair>,
        warning: String,
    },
    Failure {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_text: Option<String>,
    },
}

impl GenerationOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        GenerationOutcome::Failure {
            reason: reason.into(),
            raw_text: None,
        }
    }

    pub fn pairs(&self) -> &[PromptPair] {
        match self {
            GenerationOutcome::Success { pairs } | GenerationOutcome::PartialSuccess { pairs, .. } => {
                pairs
            }
            GenerationOutcome::Failure { .. } => &[],
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, GenerationOutcome::Failure { .. })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Predict-and-poll backend (Replicate-shaped).
    Replicate,
    /// Synchronous batch backend (Together-shaped).
    Together,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Replicate => "replicate",
            ProviderKind::Together => "together",
        }
    }

    pub fn parse_kind(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replicate" => Some(ProviderKind::Replicate),
            "together" => Some(ProviderKind::Together),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Map a provider status string. Anything unrecognised is still in flight.
    pub fn parse_status(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "starting" | "pending" | "queued" => JobStatus::Pending,
            "succeeded" | "successful" | "completed" => JobStatus::Succeeded,
            "failed" | "canceled" | "cancelled" | "error" => JobStatus::Failed,
            _ => JobStatus::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// A rendered image, either hosted or inline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedImage {
    Url(String),
    Base64(String),
}

impl GeneratedImage {
    pub fn url(&self) -> Option<&str> {
        match self {
            GeneratedImage::Url(url) => Some(url),
            GeneratedImage::Base64(_) => None,
        }
    }
}

/// A submitted poll-style generation job. Only the poller mutates it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImageJob {
    pub id: String,
    pub provider: ProviderKind,
    pub model: String,
    pub status: JobStatus,
    pub output: Option<Vec<GeneratedImage>>,
    pub error: Option<String>,
    pub attempts: u32,
}

impl ImageJob {
    pub fn new(id: impl Into<String>, provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider,
            model: model.into(),
            status: JobStatus::Pending,
            output: None,
            error: None,
            attempts: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub company_name: String,
    pub job_title: String,
    pub linkedin: String,
    pub website: String,
    pub image: String,
    pub brand_guide: BrandGuide,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub client_id: String,
    pub owner_id: String,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
