use std::time::Duration;

use httpmock::prelude::*;
use repurpose::content::{
    ContentGenerator, FetchError, GeminiGenerator, GenerationError, HttpTextExtractor,
    TextExtractor,
};
use serde_json::json;
use url::Url;

const TIMEOUT: Duration = Duration::from_secs(5);

fn page_url(server: &MockServer, path: &str) -> Url {
    Url::parse(&server.url(path)).unwrap()
}

#[tokio::test]
async fn extractor_returns_visible_text() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/post");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(
                "<html><body><nav>Menu</nav><article><h1>Launch</h1>\
                 <p>We shipped   it.</p></article><script>track()</script></body></html>",
            );
    });

    let text = HttpTextExtractor::new(1_000, TIMEOUT)
        .extract(&page_url(&server, "/post"))
        .await
        .unwrap();
    assert_eq!(text, "Launch We shipped it.");
}

#[tokio::test]
async fn extractor_truncates_to_max_chars() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/long");
        then.status(200)
            .header("content-type", "text/html")
            .body(format!("<p>{}</p>", "a".repeat(500)));
    });

    let text = HttpTextExtractor::new(100, TIMEOUT)
        .extract(&page_url(&server, "/long"))
        .await
        .unwrap();
    assert_eq!(text.chars().count(), 100);
}

#[tokio::test]
async fn extractor_rejects_failures_and_binary_bodies() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/missing");
        then.status(404);
    });
    server.mock(|when, then| {
        when.method(GET).path("/image");
        then.status(200)
            .header("content-type", "image/png")
            .body("not really a png");
    });

    let extractor = HttpTextExtractor::new(1_000, TIMEOUT);
    assert!(matches!(
        extractor.extract(&page_url(&server, "/missing")).await,
        Err(FetchError::Status(404))
    ));
    assert!(matches!(
        extractor.extract(&page_url(&server, "/image")).await,
        Err(FetchError::NotText(_))
    ));
}

fn model_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]
    })
}

fn generated_json() -> String {
    json!({
        "summary": "A summary",
        "shortVideoScript": {"hook": "Hook", "body": "Body", "cta": "Subscribe"},
        "threadPosts": ["one", "two"],
        "professionalPost": "Professional",
        "localizedArticle": "記事"
    })
    .to_string()
}

#[tokio::test]
async fn generator_calls_generate_content_with_key() {
    let server = MockServer::start_async().await;
    let model_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/test-model:generateContent")
            .query_param("key", "ai_key")
            .body_contains("Tone: witty");
        then.status(200).json_body(model_reply(&generated_json()));
    });

    let generator = GeminiGenerator::new(server.base_url(), "ai_key", "test-model", TIMEOUT);
    let content = generator
        .generate("Source text", "witty", false)
        .await
        .unwrap();
    model_mock.assert_async().await;
    assert_eq!(content.summary, "A summary");
    assert_eq!(content.short_video_script.cta, "Subscribe");
    assert_eq!(content.thread_posts, vec!["one", "two"]);
    assert!(content.watermark);
}

#[tokio::test]
async fn generator_accepts_fenced_output() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/test-model:generateContent");
        then.status(200)
            .json_body(model_reply(&format!("```json\n{}\n```", generated_json())));
    });

    let generator = GeminiGenerator::new(server.base_url(), "ai_key", "test-model", TIMEOUT);
    let content = generator.generate("Source", "casual", true).await.unwrap();
    assert_eq!(content.professional_post, "Professional");
    assert!(!content.watermark);
}

#[tokio::test]
async fn generator_surfaces_upstream_errors() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/failing:generateContent");
        then.status(500).body("quota exceeded");
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/empty:generateContent");
        then.status(200).json_body(json!({"candidates": []}));
    });

    let failing = GeminiGenerator::new(server.base_url(), "ai_key", "failing", TIMEOUT);
    assert!(matches!(
        failing.generate("Source", "casual", false).await,
        Err(GenerationError::Status { status: 500, .. })
    ));
    let empty = GeminiGenerator::new(server.base_url(), "ai_key", "empty", TIMEOUT);
    assert!(matches!(
        empty.generate("Source", "casual", false).await,
        Err(GenerationError::EmptyResponse)
    ));
}
