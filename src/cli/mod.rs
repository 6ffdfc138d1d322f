use crate::config::{Config, ExportFormat, LLMProvider};
use crate::i18n::TargetLanguage;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod live;

/// Pegasus - 由Rust与AI驱动的市场调研报告生成引擎
#[derive(Parser, Debug)]
#[command(name = "pegasus")]
#[command(
    about = "Headless market research engine. It plans research vectors with an LLM, mines the web for each vector and synthesizes a cited strategic report exported as Markdown or PDF."
)]
#[command(version)]
pub struct Args {
    /// 运行模式
    #[command(subcommand)]
    pub mode: Mode,

    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// LLM Provider (openai, deepseek, anthropic, ollama)
    #[arg(long, global = true)]
    pub llm_provider: Option<String>,

    /// LLM API KEY
    #[arg(long, global = true)]
    pub llm_api_key: Option<String>,

    /// LLM API基地址
    #[arg(long, global = true)]
    pub llm_api_base_url: Option<String>,

    /// 主力模型
    #[arg(long, global = true)]
    pub model_primary: Option<String>,

    /// 主力模型重试耗尽后使用的兜底模型
    #[arg(long, global = true)]
    pub model_fallback: Option<String>,

    /// 并发挖掘的向量数上限
    #[arg(long, global = true)]
    pub max_parallels: Option<usize>,

    /// 调研向量数量
    #[arg(long, global = true)]
    pub vectors: Option<usize>,

    /// 目标语言 (zh, en, ja, ko, de, fr, ru)
    #[arg(long, global = true)]
    pub target_language: Option<String>,

    /// 为每个向量生成Mermaid思维导图
    #[arg(long, global = true)]
    pub mindmaps: bool,

    /// 不生成市场图表数据
    #[arg(long, global = true)]
    pub no_charts: bool,

    /// 不输出调研向量附录
    #[arg(long, global = true)]
    pub no_appendix: bool,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// 无界面运行，仅输出进度
    Cli(RunArgs),
    /// 实时终端：逐条展示向量、来源、情报与章节
    Live(RunArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// 调研主题，例如 "AI semiconductor market overview"
    pub topic: String,

    /// 导出PDF而不是Markdown
    #[arg(long)]
    pub pdf: bool,

    /// 输出文件名（不含扩展名），默认 Pegasus_Report
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl Args {
    pub fn run_args(&self) -> &RunArgs {
        match &self.mode {
            Mode::Cli(run_args) | Mode::Live(run_args) => run_args,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.mode, Mode::Live(_))
    }

    /// 将CLI参数转换为配置
    pub fn into_config(&self) -> Result<Config> {
        // 显式配置文件 > 当前目录的pegasus.toml > 默认值
        let mut config = Config::load(self.config.as_deref())?;

        let run_args = self.run_args();
        config.topic = run_args.topic.trim().to_string();
        if run_args.pdf {
            config.export_format = ExportFormat::Pdf;
        }
        if let Some(out) = &run_args.out {
            config.output_path = out.clone();
        }

        // 覆盖LLM配置
        if let Some(provider_str) = &self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = &self.llm_api_base_url {
            config.llm.api_base_url = Some(llm_api_base_url.clone());
        }
        if let Some(llm_api_key) = &self.llm_api_key {
            config.llm.api_key = llm_api_key.clone();
        }
        if let Some(model_primary) = &self.model_primary {
            config.llm.model_primary = model_primary.clone();
        }
        if let Some(model_fallback) = &self.model_fallback {
            config.llm.model_fallback = model_fallback.clone();
        }
        if let Some(max_parallels) = self.max_parallels {
            config.llm.max_parallels = max_parallels;
        }

        // 调研参数
        if let Some(vectors) = self.vectors {
            config.research.num_vectors = vectors;
        }
        if self.mindmaps {
            config.research.include_mindmaps = true;
        }
        if self.no_charts {
            config.research.include_charts = false;
        }
        if self.no_appendix {
            config.report.include_appendix = false;
        }

        // 目标语言配置
        if let Some(target_language_str) = &self.target_language {
            if let Ok(target_language) = target_language_str.parse::<TargetLanguage>() {
                config.target_language = target_language;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的目标语言: {}，使用默认语言 (English)",
                    target_language_str
                );
            }
        }

        config.verbose = config.verbose || self.verbose;

        Ok(config)
    }
}
