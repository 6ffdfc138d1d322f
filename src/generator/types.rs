//! 调研流程中流转的数据类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 调研向量：一个聚焦的子查询
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchVector {
    /// 从1开始的序号
    pub index: usize,
    pub query: String,
}

impl ResearchVector {
    pub fn new(index: usize, query: impl Into<String>) -> Self {
        Self {
            index,
            query: query.into(),
        }
    }
}

/// 引用来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub url: String,
    pub title: String,
    /// 提取并截断后的正文片段
    pub snippet: String,
}

/// 向量摘要的生成状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryStatus {
    /// LLM基于检索到的来源完成了摘要
    Synthesized,
    /// 检索或摘要失败，使用占位文本
    Placeholder,
}

/// 单个向量的调研结论
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSummary {
    pub vector: ResearchVector,
    pub summary: String,
    pub citations: Vec<SourceCitation>,
    pub status: SummaryStatus,
    /// Mermaid思维导图
    pub mindmap: Option<String>,
}

impl VectorSummary {
    pub fn placeholder(
        vector: ResearchVector,
        citations: Vec<SourceCitation>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            vector,
            summary: reason.into(),
            citations,
            status: SummaryStatus::Placeholder,
            mindmap: None,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        self.status == SummaryStatus::Synthesized
    }
}

/// 报告章节
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub content: String,
    /// 生成失败时为true，content为占位文本
    pub degraded: bool,
}

/// 市场规模预测序列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketProjection {
    pub years: Vec<i32>,
    pub values: Vec<f64>,
}

/// 图表数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketChartData {
    #[serde(default)]
    pub market_projection: MarketProjection,
    /// 区域占比（百分比）
    #[serde(default)]
    pub regional_split: BTreeMap<String, f64>,
    #[serde(default)]
    pub swot: BTreeMap<String, f64>,
    #[serde(default)]
    pub pestle: BTreeMap<String, f64>,
    #[serde(default)]
    pub moat: BTreeMap<String, f64>,
}

impl MarketChartData {
    pub fn is_empty(&self) -> bool {
        self.market_projection.years.is_empty()
            && self.regional_split.is_empty()
            && self.swot.is_empty()
            && self.pestle.is_empty()
            && self.moat.is_empty()
    }

    /// 渲染为Markdown表格
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();

        if !self.market_projection.years.is_empty() {
            out.push_str("### Market Projection\n\n| Year | Value |\n| --- | --- |\n");
            for (year, value) in self
                .market_projection
                .years
                .iter()
                .zip(self.market_projection.values.iter())
            {
                out.push_str(&format!("| {} | {} |\n", year, format_number(*value)));
            }
            out.push('\n');
        }

        let tables = [
            ("Regional Split", "Share (%)", &self.regional_split),
            ("SWOT Index", "Score (1-10)", &self.swot),
            ("PESTLE Exposure", "Score (1-10)", &self.pestle),
            ("Moat Strength", "Score (1-10)", &self.moat),
        ];
        for (title, unit, values) in tables {
            if values.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "### {}\n\n| Factor | {} |\n| --- | --- |\n",
                title, unit
            ));
            for (label, value) in values {
                out.push_str(&format!("| {} | {} |\n", label, format_number(*value)));
            }
            out.push('\n');
        }

        out
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

/// 最终报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalReport {
    pub title: String,
    pub topic: String,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
    pub vectors: Vec<VectorSummary>,
    pub chart_data: Option<MarketChartData>,
    /// 是否输出调研向量附录
    pub include_appendix: bool,
}

impl FinalReport {
    /// 渲染完整的Markdown文档
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n\n", self.title);
        out.push_str(&format!(
            "*Generated by Pegasus on {} for \"{}\"*\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M UTC"),
            self.topic
        ));

        for section in &self.sections {
            out.push_str(&format!("## {}\n\n{}\n\n", section.title, section.content.trim()));
        }

        if self.include_appendix && !self.vectors.is_empty() {
            out.push_str("## Appendix: Research Vectors\n\n");
            for summary in &self.vectors {
                out.push_str(&format!(
                    "### {}. {}\n\n{}\n\n",
                    summary.vector.index,
                    summary.vector.query,
                    summary.summary.trim()
                ));

                if !summary.citations.is_empty() {
                    out.push_str("**Sources**\n\n");
                    for (i, citation) in summary.citations.iter().enumerate() {
                        let label = if citation.title.is_empty() {
                            citation.url.as_str()
                        } else {
                            citation.title.as_str()
                        };
                        out.push_str(&format!("{}. [{}]({})\n", i + 1, label, citation.url));
                    }
                    out.push('\n');
                }

                if let Some(mindmap) = &summary.mindmap {
                    out.push_str(&format!("```mermaid\n{}\n```\n\n", mindmap.trim()));
                }
            }
        }

        if let Some(chart_data) = self.chart_data.as_ref().filter(|data| !data.is_empty()) {
            out.push_str("## Appendix: Market Data\n\n");
            out.push_str(&chart_data.to_markdown());
        }

        out
    }

    /// 生成失败的章节数
    pub fn degraded_sections(&self) -> usize {
        self.sections.iter().filter(|s| s.degraded).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_report() -> FinalReport {
        let vector = ResearchVector::new(1, "EV battery supply chain");
        FinalReport {
            title: "Pegasus Intelligence Report: EV Batteries".to_string(),
            topic: "EV Batteries".to_string(),
            generated_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap(),
            sections: vec![
                ReportSection {
                    title: "Executive Summary".to_string(),
                    content: "Demand is growing [1].".to_string(),
                    degraded: false,
                },
                ReportSection {
                    title: "SWOT Analysis".to_string(),
                    content: "*Section generation failed: timeout*".to_string(),
                    degraded: true,
                },
            ],
            vectors: vec![VectorSummary {
                vector,
                summary: "Lithium prices fell [1].".to_string(),
                citations: vec![SourceCitation {
                    url: "https://example.com/lithium".to_string(),
                    title: "Lithium outlook".to_string(),
                    snippet: "Lithium prices fell".to_string(),
                }],
                status: SummaryStatus::Synthesized,
                mindmap: Some("mindmap\n  (EV)".to_string()),
            }],
            chart_data: None,
            include_appendix: true,
        }
    }

    #[test]
    fn test_to_markdown_layout() {
        let markdown = sample_report().to_markdown();

        assert!(markdown.starts_with("# Pegasus Intelligence Report: EV Batteries\n\n"));
        assert!(markdown.contains("2025-03-01 12:30 UTC"));
        assert!(markdown.contains("## Executive Summary\n\nDemand is growing [1].\n\n"));
        assert!(markdown.contains("## SWOT Analysis\n\n*Section generation failed: timeout*"));
        assert!(markdown.contains("### 1. EV battery supply chain"));
        assert!(markdown.contains("1. [Lithium outlook](https://example.com/lithium)"));
        assert!(markdown.contains("```mermaid\nmindmap\n  (EV)\n```"));
        assert!(!markdown.contains("Market Data"));
    }

    #[test]
    fn test_to_markdown_without_appendix() {
        let report = FinalReport {
            include_appendix: false,
            ..sample_report()
        };
        let markdown = report.to_markdown();

        assert!(!markdown.contains("Research Vectors"));
        assert!(markdown.contains("## SWOT Analysis"));
    }

    #[test]
    fn test_degraded_sections() {
        assert_eq!(sample_report().degraded_sections(), 1);
    }

    #[test]
    fn test_chart_data_tables() {
        let mut chart = MarketChartData::default();
        chart.market_projection = MarketProjection {
            years: vec![2025, 2026],
            values: vec![500.0, 512.6],
        };
        chart.swot.insert("Strengths".to_string(), 8.0);

        let markdown = chart.to_markdown();

        assert!(markdown.contains("| 2025 | 500 |"));
        assert!(markdown.contains("| 2026 | 512.6 |"));
        assert!(markdown.contains("### SWOT Index"));
        assert!(markdown.contains("| Strengths | 8 |"));
        assert!(!markdown.contains("Regional Split"));
    }

    #[test]
    fn test_chart_appendix_rendered() {
        let mut chart = MarketChartData::default();
        chart.regional_split.insert("USA".to_string(), 38.0);
        let report = FinalReport {
            chart_data: Some(chart),
            ..sample_report()
        };

        let markdown = report.to_markdown();
        assert!(markdown.contains("## Appendix: Market Data"));
        assert!(markdown.contains("| USA | 38 |"));
    }
}
