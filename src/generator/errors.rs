use thiserror::Error;

/// 流水线中不可降级的失败
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("research topic must not be empty")]
    EmptyTopic,

    #[error("model connection check failed: {0:#}")]
    ConnectionCheck(anyhow::Error),

    #[error("failed to obtain research vectors: {0:#}")]
    NoResearchVectors(anyhow::Error),
}
