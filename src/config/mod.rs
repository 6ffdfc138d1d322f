use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::i18n::TargetLanguage;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "pegasus.toml";

/// 章节指令中的预测区间占位符
pub const PROJECTION_HORIZON_PLACEHOLDER: &str = "__PROJECTION_HORIZON__";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    /// OpenAI兼容接口（Ollama Cloud亦走此协议）
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "anthropic")]
    Anthropic,
    /// 本地Ollama服务
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl LLMProvider {
    /// 未显式配置API基地址时使用的默认地址
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "https://ollama.com/v1",
            LLMProvider::DeepSeek => "https://api.deepseek.com",
            LLMProvider::Anthropic => "https://api.anthropic.com",
            LLMProvider::Ollama => "http://localhost:11434",
        }
    }
}

/// 报告导出格式
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[serde(rename = "markdown")]
    #[default]
    Markdown,
    #[serde(rename = "pdf")]
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 调研主题
    pub topic: String,

    /// 输出文件路径（不含扩展名）
    pub output_path: PathBuf,

    /// 导出格式
    pub export_format: ExportFormat,

    /// 目标语言
    pub target_language: TargetLanguage,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 调研参数
    pub research: ResearchConfig,

    /// 网络检索配置
    pub web: WebConfig,

    /// 报告结构配置
    pub report: ReportConfig,

    /// PDF渲染配置
    pub pdf: PdfConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址，为空时按provider取默认值
    pub api_base_url: Option<String>,

    /// 主力模型
    pub model_primary: String,

    /// 主力模型重试耗尽后使用的兜底模型
    pub model_fallback: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 每个模型的尝试次数
    pub retry_attempts: u32,

    /// 重试间隔基数（毫秒），第n次重试等待 n * retry_delay_ms
    pub retry_delay_ms: u64,

    /// 单次调用超时时间（秒）
    pub timeout_seconds: u64,

    /// 并发挖掘的调研向量数上限
    pub max_parallels: usize,

    /// 启动时检查模型连接
    pub check_connection: bool,
}

/// 调研参数
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ResearchConfig {
    /// 生成的调研向量数量
    pub num_vectors: usize,

    /// 每个向量检索的网页数量
    pub max_sources_per_vector: usize,

    /// 每个网页保留的最大字符数
    pub max_chars_per_source: usize,

    /// 传递给总合成阶段的最大上下文字符数
    pub max_master_context_chars: usize,

    /// 是否为每个向量生成Mermaid思维导图
    pub include_mindmaps: bool,

    /// 是否生成市场图表数据附录
    pub include_charts: bool,
}

/// 网络检索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WebConfig {
    /// 搜索端点（DuckDuckGo HTML接口）
    pub search_endpoint: String,

    pub user_agent: String,

    /// 单次请求超时时间（秒）
    pub timeout_seconds: u64,

    /// 搜索与抓取的尝试次数
    pub retry_attempts: u32,

    /// 重试间隔基数（毫秒）
    pub retry_delay_ms: u64,

    /// 是否接受无效证书
    pub accept_invalid_certs: bool,

    /// 正文提取时保留的最短行长度（以句号等结尾的行不受限制）
    pub min_line_chars: usize,
}

/// 报告章节定义
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SectionSpec {
    pub title: String,
    pub instruction: String,
}

impl SectionSpec {
    pub fn new(title: &str, instruction: &str) -> Self {
        Self {
            title: title.to_string(),
            instruction: instruction.to_string(),
        }
    }
}

/// 报告结构配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ReportConfig {
    /// 按顺序合成的章节
    pub sections: Vec<SectionSpec>,

    /// 是否附带调研向量与数据附录
    pub include_appendix: bool,
}

/// PDF渲染配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PdfConfig {
    /// 字体目录，为空时仅搜索候选目录
    pub font_dir: Option<PathBuf>,

    /// 字体族名称，对应 `<family>-Regular.ttf` 等文件
    pub font_family: String,

    /// 候选字体，按顺序尝试
    pub fallback_fonts: Vec<FontFiles>,

    /// 正文字号
    pub font_size: u8,
}

/// 一套字体的四个字重文件
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FontFiles {
    pub dir: PathBuf,
    pub regular: String,
    pub bold: String,
    pub italic: String,
    pub bold_italic: String,
}

impl FontFiles {
    /// genpdf的命名约定：`<family>-Regular.ttf`、`<family>-Bold.ttf` 等
    pub fn family(dir: impl Into<PathBuf>, family: &str) -> Self {
        Self {
            dir: dir.into(),
            regular: format!("{}-Regular.ttf", family),
            bold: format!("{}-Bold.ttf", family),
            italic: format!("{}-Italic.ttf", family),
            bold_italic: format!("{}-BoldItalic.ttf", family),
        }
    }

    /// DejaVu的命名：常规体无后缀，斜体为Oblique
    pub fn dejavu(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            regular: String::from("DejaVuSans.ttf"),
            bold: String::from("DejaVuSans-Bold.ttf"),
            italic: String::from("DejaVuSans-Oblique.ttf"),
            bold_italic: String::from("DejaVuSans-BoldOblique.ttf"),
        }
    }

    /// macOS自带Arial的命名
    pub fn arial(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            regular: String::from("Arial.ttf"),
            bold: String::from("Arial Bold.ttf"),
            italic: String::from("Arial Italic.ttf"),
            bold_italic: String::from("Arial Bold Italic.ttf"),
        }
    }

    pub fn regular_path(&self) -> PathBuf {
        self.dir.join(&self.regular)
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 按优先级加载配置：显式路径 > 当前目录的pegasus.toml > 默认值
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let default_config_path = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(DEFAULT_CONFIG_FILE);

        if default_config_path.exists() {
            Self::from_file(&default_config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// 最终输出文件路径（带扩展名）
    pub fn output_file(&self) -> PathBuf {
        let extension = self.export_format.extension();
        if self
            .output_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        {
            return self.output_path.clone();
        }

        let mut file_name = self.output_path.clone().into_os_string();
        file_name.push(".");
        file_name.push(extension);
        PathBuf::from(file_name)
    }

    /// 报告标题
    pub fn report_title(&self) -> String {
        self.target_language.report_title(&self.topic)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            topic: String::new(),
            output_path: PathBuf::from("Pegasus_Report"),
            export_format: ExportFormat::default(),
            target_language: TargetLanguage::default(),
            llm: LLMConfig::default(),
            research: ResearchConfig::default(),
            web: WebConfig::default(),
            report: ReportConfig::default(),
            pdf: PdfConfig::default(),
            verbose: false,
        }
    }
}

impl LLMConfig {
    /// 实际使用的API基地址
    pub fn base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        let api_key = std::env::var("PEGASUS_LLM_API_KEY")
            .or_else(|_| std::env::var("OLLAMA_API_KEY"))
            .unwrap_or_default();

        Self {
            provider: LLMProvider::default(),
            api_key,
            api_base_url: None,
            model_primary: String::from("gpt-oss:120b"),
            model_fallback: String::from("llama3.1"),
            max_tokens: 8192,
            temperature: 0.2,
            retry_attempts: 3,
            retry_delay_ms: 5000,
            timeout_seconds: 120,
            max_parallels: 3,
            check_connection: true,
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            num_vectors: 7,
            max_sources_per_vector: 3,
            max_chars_per_source: 2000,
            max_master_context_chars: 10000,
            include_mindmaps: false,
            include_charts: true,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            search_endpoint: String::from("https://html.duckduckgo.com/html/"),
            user_agent: String::from(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Pegasus/0.1",
            ),
            timeout_seconds: 10,
            retry_attempts: 2,
            retry_delay_ms: 1000,
            accept_invalid_certs: false,
            min_line_chars: 40,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sections: vec![
                SectionSpec::new(
                    "Executive Summary",
                    "Synthesize a high-level overview and market standing.",
                ),
                SectionSpec::new(
                    "SWOT Analysis",
                    "Provide a detailed Strengths, Weaknesses, Opportunities, and Threats breakdown.",
                ),
                SectionSpec::new(
                    "PESTLE Analysis",
                    "Analyze Political, Economic, Social, Technological, Legal, and Environmental factors.",
                ),
                SectionSpec::new(
                    "Porter's Five Forces",
                    "Assess industry competitiveness across supplier power, buyer power, substitutes, new entrants and rivalry.",
                ),
                SectionSpec::new(
                    "Moat & Defensibility",
                    "Evaluate long-term competitive advantages and how durable they are.",
                ),
                SectionSpec::new(
                    "Competitive Landscape",
                    "Analyze market share and direct competitor positioning.",
                ),
                SectionSpec::new(
                    "Strategic Outlook",
                    "Provide __PROJECTION_HORIZON__ projections and final recommendations.",
                ),
            ],
            include_appendix: true,
        }
    }
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            font_dir: None,
            font_family: String::from("LiberationSans"),
            fallback_fonts: vec![
                FontFiles::family("/usr/share/fonts/truetype/liberation", "LiberationSans"),
                FontFiles::family("/usr/share/fonts/liberation-sans", "LiberationSans"),
                FontFiles::dejavu("/usr/share/fonts/truetype/dejavu"),
                FontFiles::dejavu("/usr/share/fonts/dejavu"),
                FontFiles::arial("/System/Library/Fonts/Supplemental"),
                FontFiles::arial("/Library/Fonts"),
            ],
            font_size: 10,
        }
    }
}
