//! LLM访问层

use anyhow::Result;
use async_trait::async_trait;

pub mod client;

pub use client::LLMClient;

/// 文本进、文本出的模型服务
///
/// 生产环境由rig provider实现，测试中可注入脚本化的替身。
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 使用指定模型完成一次单轮对话
    async fn complete(&self, model: &str, system_prompt: &str, user_prompt: &str)
    -> Result<String>;

    /// provider名称，用于日志
    fn name(&self) -> &str;
}
