//! 网络检索层：搜索、抓取与正文提取

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

pub mod duckduckgo;
pub mod extract;

pub use duckduckgo::DuckDuckGoSource;

/// 一条搜索结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
}

/// 搜索与抓取能力
#[async_trait]
pub trait WebSource: Send + Sync {
    /// 执行搜索，至多返回 `max_results` 条去重后的结果
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;

    /// 抓取网页并返回提取后的正文
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// 有界重试：最多尝试 `attempts` 次，第n次失败后等待 n * delay_ms
pub async fn with_retries<T, F, Fut>(
    label: &str,
    attempts: u32,
    delay_ms: u64,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::debug!(label, attempt, attempts, error = %err, "web call failed");
                if attempt >= attempts {
                    return Err(err);
                }
                tokio::time::sleep(Duration::from_millis(delay_ms * u64::from(attempt))).await;
            }
        }
    }
}
