use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use scraper::{Html, Node, Selector};
use url::Url;

use super::{FetchError, TextExtractor};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Elements whose text never reaches the model.
const NON_CONTENT_TAGS: [&str; 7] = [
    "script", "style", "nav", "footer", "iframe", "svg", "noscript",
];

/// key: content-extract-http -> fetch and strip markup
#[derive(Clone)]
pub struct HttpTextExtractor {
    client: reqwest::Client,
    max_chars: usize,
}

impl HttpTextExtractor {
    pub fn new(max_chars: usize, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, max_chars }
    }
}

#[async_trait]
impl TextExtractor for HttpTextExtractor {
    async fn extract(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            if !is_textual(content_type) {
                return Err(FetchError::NotText(content_type.to_string()));
            }
        }
        let html = response.text().await?;
        Ok(html_to_text(&html, self.max_chars))
    }
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("text/") || mime.ends_with("+xml") || mime == "application/xml"
}

/// Visible page text with whitespace collapsed, at most `max_chars` characters.
///
/// Reads `<body>` when the parser finds one and the whole document otherwise.
pub fn html_to_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut text = String::new();
    for node in root.descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|element| NON_CONTENT_TAGS.contains(&element.name()))
                .unwrap_or(false)
        });
        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }

    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max_chars)
        .collect()
}
