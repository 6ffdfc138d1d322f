//! LLM客户端 - 为调研流程提供带超时、重试与兜底模型的统一调用接口

use anyhow::{Result, anyhow};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LLMConfig;
use crate::llm::LanguageModel;

mod providers;

pub use providers::{ProviderAgent, ProviderClient, RigLanguageModel};

/// LLM客户端
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    model: Arc<dyn LanguageModel>,
}

impl LLMClient {
    /// 根据配置创建基于rig的客户端
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let model = RigLanguageModel::new(config)?;
        Ok(Self::with_model(config.clone(), Arc::new(model)))
    }

    /// 使用指定的模型服务创建客户端
    pub fn with_model(config: LLMConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self { config, model }
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        println!("🔄 正在检查模型连接 ({})...", self.model.name());
        match self
            .prompt("You are a helpful assistant.", "Reply with the single word: ready")
            .await
        {
            Ok(_) => {
                println!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }

    /// 通用重试逻辑：每次尝试受超时约束，第n次失败后等待 n * retry_delay_ms
    async fn retry_with_backoff<T, F, Fut>(&self, model: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.retry_attempts.max(1);
        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!(
                    "request timed out after {}s",
                    self.config.timeout_seconds
                )),
            };

            match outcome {
                Ok(result) => return Ok(result),
                Err(err) => {
                    tracing::warn!(
                        provider = self.model.name(),
                        model,
                        attempt,
                        max_attempts,
                        error = %err,
                        "LLM call failed"
                    );
                    if attempt >= max_attempts {
                        return Err(err);
                    }
                    let delay = self.config.retry_delay_ms * u64::from(attempt);
                    tracing::debug!(delay_ms = delay, "retrying LLM call");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    /// 单轮对话：主力模型重试耗尽后切换到兜底模型
    pub async fn prompt(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let primary = self.config.model_primary.as_str();
        let primary_result = self
            .retry_with_backoff(primary, || {
                self.model.complete(primary, system_prompt, user_prompt)
            })
            .await;

        let primary_err = match primary_result {
            Ok(content) => return Ok(content),
            Err(err) => err,
        };

        let fallback = self.config.model_fallback.as_str();
        if fallback.is_empty() || fallback == primary {
            return Err(primary_err.context(format!(
                "model {} failed after {} attempts",
                primary, self.config.retry_attempts
            )));
        }

        tracing::warn!(
            primary_model = primary,
            fallback_model = fallback,
            error = %primary_err,
            "primary model exhausted, switching to fallback model"
        );
        eprintln!("⚠️ 主力模型 {} 调用失败，切换到兜底模型 {}", primary, fallback);

        self.retry_with_backoff(fallback, || {
            self.model.complete(fallback, system_prompt, user_prompt)
        })
        .await
        .map_err(|err| {
            err.context(format!(
                "both {} and fallback {} failed after retries",
                primary, fallback
            ))
        })
    }
}
