//! DuckDuckGo HTML搜索与网页抓取

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use std::sync::LazyLock;
use std::time::Duration;

use super::extract::{decode_entities, extract_main_text};
use super::{SearchHit, WebSource};
use crate::config::WebConfig;

static RESULT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#).unwrap()
});

static INLINE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// 基于DuckDuckGo HTML端点的网络检索实现
pub struct DuckDuckGoSource {
    client: reqwest::Client,
    config: WebConfig,
}

impl DuckDuckGoSource {
    pub fn new(config: &WebConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl WebSource for DuckDuckGoSource {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let url = format!(
            "{}?q={}",
            self.config.search_endpoint,
            urlencoding::encode(query)
        );
        tracing::debug!(query, %url, "searching");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Search request failed for '{}'", query))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Search returned HTTP {}", status));
        }

        let body = response
            .text()
            .await
            .context("Failed to read search response body")?;

        Ok(parse_search_results(&body, max_results))
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow!("Unsupported URL scheme: {}", url));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Fetch failed for {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP {} for {}", status, url));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !is_textual_content_type(&content_type) {
            return Err(anyhow!(
                "Unsupported content type '{}' for {}",
                content_type,
                url
            ));
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        if content_type.starts_with("text/plain") {
            return Ok(body.trim().to_string());
        }

        Ok(extract_main_text(&body, self.config.min_line_chars))
    }
}

/// 允许抓取的内容类型；缺失时按HTML处理
fn is_textual_content_type(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.starts_with("text/html")
        || content_type.starts_with("application/xhtml")
        || content_type.starts_with("text/plain")
}

/// 解析DuckDuckGo HTML结果页
pub fn parse_search_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = Vec::new();

    for caps in RESULT_LINK_RE.captures_iter(html) {
        if hits.len() >= max_results {
            break;
        }

        let Some(url) = resolve_result_url(&caps[1]) else {
            continue;
        };
        if hits.iter().any(|hit| hit.url == url) {
            continue;
        }

        let title = decode_entities(&INLINE_TAG_RE.replace_all(&caps[2], ""))
            .trim()
            .to_string();

        hits.push(SearchHit { url, title });
    }

    hits
}

/// 还原结果链接：解开 `uddg=` 跳转参数，补全协议，过滤广告
pub fn resolve_result_url(raw_href: &str) -> Option<String> {
    let href = decode_entities(raw_href);

    let target = match href.split_once("uddg=") {
        Some((_, encoded)) => {
            let encoded = encoded.split('&').next().unwrap_or(encoded);
            urlencoding::decode(encoded).ok()?.into_owned()
        }
        None => href,
    };

    let target = if let Some(rest) = target.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        target
    };

    if !target.starts_with("http://") && !target.starts_with("https://") {
        return None;
    }
    if target.contains("duckduckgo.com/y.js") {
        return None;
    }

    Some(target)
}
