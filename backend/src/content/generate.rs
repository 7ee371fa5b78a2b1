use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ContentGenerator, GeneratedContent, GenerationError, VideoScript};

/// Prompt budget for the source text.
const PROMPT_SOURCE_CHARS: usize = 15_000;

/// key: content-generate-gemini -> generateContent client
#[derive(Clone)]
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[derive(Deserialize)]
struct ModelResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate(
        &self,
        text: &str,
        tone: &str,
        is_pro: bool,
    ) -> Result<GeneratedContent, GenerationError> {
        let body = json!({
            "contents": [{"parts": [{"text": build_prompt(text, tone)}]}],
            "generationConfig": {"responseMimeType": "application/json"},
        });
        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.api_base, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: ModelResponse = response.json().await?;
        let output: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();
        if output.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        parse_generated(&output, is_pro)
    }
}

fn build_prompt(text: &str, tone: &str) -> String {
    let source: String = text.chars().take(PROMPT_SOURCE_CHARS).collect();
    format!(
        r#"Repurpose the source text below for social media.
Tone: {tone}

Respond with a single JSON object with exactly these keys:
  "summary": concise markdown summary,
  "shortVideoScript": {{"hook": one sentence, "body": three or four sentences, "cta": call to action}},
  "threadPosts": array of five short posts,
  "professionalPost": a professional network post with line breaks,
  "localizedArticle": a Japanese markdown article summarizing the source, whatever its language

Source text:
{source}"#
    )
}

/// Parses model output, retrying once with code-fence markers removed.
pub fn parse_generated(raw: &str, is_pro: bool) -> Result<GeneratedContent, GenerationError> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(_) => serde_json::from_str(&strip_code_fences(raw)).map_err(GenerationError::Malformed)?,
    };

    let text = |pointer: &str, fallback: &str| {
        value
            .pointer(pointer)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    };
    let thread_posts = value
        .get("threadPosts")
        .and_then(Value::as_array)
        .map(|posts| {
            posts
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|posts| !posts.is_empty())
        .unwrap_or_else(|| vec!["Thread could not be generated.".to_string()]);

    Ok(GeneratedContent {
        summary: text("/summary", "Summary could not be generated."),
        short_video_script: VideoScript {
            hook: text("/shortVideoScript/hook", "Hook could not be generated."),
            body: text("/shortVideoScript/body", "Script could not be generated."),
            cta: text("/shortVideoScript/cta", "Call to action could not be generated."),
        },
        thread_posts,
        professional_post: text("/professionalPost", "Post could not be generated."),
        localized_article: text("/localizedArticle", "Article could not be generated."),
        watermark: !is_pro,
    })
}

fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}
