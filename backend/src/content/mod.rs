//! Collaborators at the edge of the generation pipeline: page text extraction and
//! the generative model. Neither is consulted by the entitlement core.

pub mod extract;
pub mod generate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub use extract::HttpTextExtractor;
pub use generate::GeminiGenerator;

pub const DEFAULT_TONE: &str = "Professional and engaging";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoScript {
    pub hook: String,
    pub body: String,
    pub cta: String,
}

/// key: generated-content -> the fixed set of repurposed formats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub summary: String,
    pub short_video_script: VideoScript,
    pub thread_posts: Vec<String>,
    pub professional_post: String,
    pub localized_article: String,
    /// Free output carries a watermark.
    pub watermark: bool,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("source responded with status {0}")]
    Status(u16),
    #[error("source is not text: {0}")]
    NotText(String),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no text")]
    EmptyResponse,
    #[error("model output is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// key: content-extract -> url to bounded plain text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, url: &Url) -> Result<String, FetchError>;
}

/// key: content-generate -> text to repurposed formats
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        text: &str,
        tone: &str,
        is_pro: bool,
    ) -> Result<GeneratedContent, GenerationError>;
}
