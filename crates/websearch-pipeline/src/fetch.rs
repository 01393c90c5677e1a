use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;

use websearch_core::config::FetchSettings;
use websearch_core::error::{Error, Result};
use websearch_core::traits::PageFetcher;
use websearch_core::types::FetchedPage;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; WebsearchBot/1.0)";

/// Fetches a page over HTTP and extracts plain title/body text.
///
/// One pooled client serves all fetches; connection reuse matters
/// when the worker drains many URLs from the same domain.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_content_chars: usize,
    min_content_chars: usize,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| Error::Config(format!("failed to build fetch client: {e}")))?;
        Ok(Self {
            client,
            max_content_chars: settings.max_content_chars,
            min_content_chars: settings.min_content_chars,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let parsed = url::Url::parse(url).map_err(|e| Error::Fetch(format!("invalid url {url}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::Fetch(format!("unsupported scheme {} for {url}", parsed.scheme())));
        }

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("request to {url} failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{url} returned {status}")));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.is_empty()
            && !content_type.contains("text/html")
            && !content_type.contains("text/plain")
            && !content_type.contains("application/xhtml")
        {
            return Err(Error::Fetch(format!("skipping non-HTML content from {url}: {content_type}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("failed to read body of {url}: {e}")))?;

        let (title, mut text) = extract_page(&body);
        text.truncate_to_chars(self.max_content_chars);
        if text.chars().count() < self.min_content_chars {
            return Err(Error::Fetch(format!(
                "insufficient content from {url} ({} chars)",
                text.chars().count()
            )));
        }

        Ok(FetchedPage { title, text })
    }
}

/// Parses HTML into a `(title, body text)` pair. Runs synchronously so
/// the non-Send `scraper::Html` never lives across an await point.
fn extract_page(html: &str) -> (String, String) {
    let doc = Html::parse_document(html);

    let title_selector = scraper::Selector::parse("title").expect("static selector");
    let title = doc
        .select(&title_selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    // Collect text nodes, skipping script/style/noscript subtrees,
    // then collapse whitespace.
    let mut raw = String::new();
    for node in doc.tree.nodes() {
        if let Some(text) = node.value().as_text() {
            let skip = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| matches!(e.name(), "script" | "style" | "noscript" | "title")))
                .unwrap_or(false);
            if !skip {
                raw.push_str(text);
                raw.push(' ');
            }
        }
    }
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    (title, text)
}

trait TruncateChars {
    fn truncate_to_chars(&mut self, max: usize);
}

impl TruncateChars for String {
    fn truncate_to_chars(&mut self, max: usize) {
        if let Some((idx, _)) = self.char_indices().nth(max) {
            self.truncate(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_page_strips_markup_and_scripts() {
        let html = r#"
            <html><head><title> Sample Page </title>
            <style>body { color: red; }</style></head>
            <body><h1>Heading</h1><script>var x = 1;</script>
            <p>First   paragraph.</p><p>Second paragraph.</p></body></html>
        "#;
        let (title, text) = extract_page(html);
        assert_eq!(title, "Sample Page");
        assert_eq!(text, "Heading First paragraph. Second paragraph.");
        assert!(!text.contains("var x"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn extract_page_defaults_missing_title() {
        let (title, text) = extract_page("<html><body>just text</body></html>");
        assert_eq!(title, "Untitled");
        assert_eq!(text, "just text");
    }

    #[test]
    fn truncate_to_chars_respects_char_boundaries() {
        let mut s = "héllo wörld".to_string();
        s.truncate_to_chars(7);
        assert_eq!(s, "héllo w");
    }
}
