use serde::{Deserialize, Serialize};

/// 报告目标语言
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum TargetLanguage {
    #[serde(rename = "en")]
    #[default]
    English,
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "ru")]
    Russian,
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetLanguage::English => write!(f, "en"),
            TargetLanguage::Chinese => write!(f, "zh"),
            TargetLanguage::Japanese => write!(f, "ja"),
            TargetLanguage::Korean => write!(f, "ko"),
            TargetLanguage::German => write!(f, "de"),
            TargetLanguage::French => write!(f, "fr"),
            TargetLanguage::Russian => write!(f, "ru"),
        }
    }
}

impl std::str::FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" | "英文" => Ok(TargetLanguage::English),
            "zh" | "chinese" | "中文" => Ok(TargetLanguage::Chinese),
            "ja" | "japanese" | "日本語" | "日文" => Ok(TargetLanguage::Japanese),
            "ko" | "korean" | "한국어" | "韩文" => Ok(TargetLanguage::Korean),
            "de" | "german" | "deutsch" | "德文" => Ok(TargetLanguage::German),
            "fr" | "french" | "français" | "法文" => Ok(TargetLanguage::French),
            "ru" | "russian" | "русский" | "俄文" => Ok(TargetLanguage::Russian),
            _ => Err(format!("Unknown target language: {}", s)),
        }
    }
}

impl TargetLanguage {
    /// 获取语言的描述性名称
    pub fn display_name(&self) -> &'static str {
        match self {
            TargetLanguage::English => "English",
            TargetLanguage::Chinese => "中文",
            TargetLanguage::Japanese => "日本語",
            TargetLanguage::Korean => "한국어",
            TargetLanguage::German => "Deutsch",
            TargetLanguage::French => "Français",
            TargetLanguage::Russian => "Русский",
        }
    }

    /// 获取报告撰写语言的提示词指令
    pub fn prompt_instruction(&self) -> &'static str {
        match self {
            TargetLanguage::English => {
                "Write this section in English, keeping the language precise and professional."
            }
            TargetLanguage::Chinese => "请使用中文撰写本章节，确保表达准确、专业。",
            TargetLanguage::Japanese => {
                "このセクションは日本語で、正確かつ専門的な表現で執筆してください。"
            }
            TargetLanguage::Korean => {
                "이 섹션은 한국어로, 정확하고 전문적인 표현으로 작성해 주세요."
            }
            TargetLanguage::German => {
                "Verfassen Sie diesen Abschnitt auf Deutsch, präzise und professionell formuliert."
            }
            TargetLanguage::French => {
                "Rédigez cette section en français, avec un langage précis et professionnel."
            }
            TargetLanguage::Russian => {
                "Напишите этот раздел на русском языке, точно и профессионально."
            }
        }
    }

    /// 报告标题前缀
    pub fn report_title_prefix(&self) -> &'static str {
        match self {
            TargetLanguage::English => "Pegasus Intelligence Report",
            TargetLanguage::Chinese => "Pegasus 情报报告",
            TargetLanguage::Japanese => "Pegasus インテリジェンスレポート",
            TargetLanguage::Korean => "Pegasus 인텔리전스 보고서",
            TargetLanguage::German => "Pegasus Analysebericht",
            TargetLanguage::French => "Rapport de renseignement Pegasus",
            TargetLanguage::Russian => "Аналитический отчёт Pegasus",
        }
    }

    /// 生成完整的报告标题
    pub fn report_title(&self, topic: &str) -> String {
        format!("{}: {}", self.report_title_prefix(), topic)
    }
}
