use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::generator::events::EventSink;
use crate::llm::LLMClient;
use crate::web::{DuckDuckGoSource, WebSource};

#[derive(Clone)]
pub struct GeneratorContext {
    /// LLM调用器，用于与AI通信。
    pub llm_client: LLMClient,
    /// 网络检索
    pub web: Arc<dyn WebSource>,
    /// 配置
    pub config: Config,
    /// 进度事件发送端
    pub events: EventSink,
}

impl GeneratorContext {
    /// 使用生产环境的LLM与搜索后端创建上下文
    pub fn new(config: Config) -> Result<Self> {
        let llm_client = LLMClient::new(&config.llm)?;
        let web = Arc::new(DuckDuckGoSource::new(&config.web)?);
        Ok(Self::with_backends(config, llm_client, web))
    }

    /// 使用指定的后端创建上下文
    pub fn with_backends(config: Config, llm_client: LLMClient, web: Arc<dyn WebSource>) -> Self {
        Self {
            llm_client,
            web,
            config,
            events: EventSink::default(),
        }
    }

    /// 连接事件观察者
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }
}
