pub mod config;
pub mod db;
pub mod error;
pub mod image;
pub mod llm;
pub mod model;
pub mod parser;
pub mod prompt;
pub mod service;
pub mod transport;

pub use error::{EngineError, FailureKind, VisualFailure};
pub use model::{GeneratedImage, GenerationOutcome, PromptPair, ProviderKind};
pub use service::ContentEngine;
