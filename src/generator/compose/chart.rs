//! 市场图表数据抽取

use anyhow::{Context, Result, anyhow};
use chrono::Datelike;

use crate::generator::context::GeneratorContext;
use crate::generator::events::ResearchEvent;
use crate::generator::types::{MarketChartData, VectorSummary};

use super::build_master_context;

/// 图表抽取使用的上下文上限
pub const CHART_CONTEXT_CHARS: usize = 12_000;

const DATA_SYSTEM_PROMPT: &str =
    "You are a quantitative market analyst. You output strict JSON and nothing else.";

pub fn build_chart_prompt(research_data: &str, current_year: i32) -> String {
    let years: Vec<String> = (current_year - 1..=current_year + 5)
        .map(|year| year.to_string())
        .collect();

    format!(
        r#"From the following research data, generate visualization data.

Return STRICT JSON ONLY in this exact format:

{{
  "market_projection": {{
    "years": [{}],
    "values": [500, 505, 512.6, 522.8, 536.9, 553.0, 575.1]
  }},
  "regional_split": {{ "USA": 38, "China": 32, "EU": 18, "Rest of World": 12 }},
  "swot": {{ "Strengths": 8, "Weaknesses": 4, "Opportunities": 9, "Threats": 6 }},
  "pestle": {{ "Political": 6, "Economic": 8, "Social": 5, "Technological": 9, "Legal": 6, "Environmental": 4 }},
  "moat": {{ "Cost Advantage": 7, "Switching Costs": 6, "Network Effects": 5, "IP / Patents": 8, "Brand Power": 6 }}
}}

Rules:
- All scores must be integers from 1 to 10
- Percentages must sum to 100
- Use only the provided research data
- Do NOT include commentary or markdown

RESEARCH DATA:
{}"#,
        years.join(", "),
        research_data
    )
}

/// 解析回复中第一个 `{` 到最后一个 `}` 之间的JSON
pub fn parse_chart_data(response: &str) -> Result<MarketChartData> {
    let start = response
        .find('{')
        .ok_or_else(|| anyhow!("No JSON object found in chart response"))?;
    let end = response
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| anyhow!("Unterminated JSON object in chart response"))?;

    let mut data: MarketChartData = serde_json::from_str(&response[start..=end])
        .context("Chart response is not valid chart JSON")?;

    // 年份与数值必须一一对应
    let paired = data
        .market_projection
        .years
        .len()
        .min(data.market_projection.values.len());
    data.market_projection.years.truncate(paired);
    data.market_projection.values.truncate(paired);

    if data.is_empty() {
        return Err(anyhow!("Chart response contained no data"));
    }
    Ok(data)
}

/// 抽取图表数据；没有有效情报或任一步失败时返回None
#[tracing::instrument(name = "extract chart data", skip_all)]
pub async fn extract_chart_data(
    context: &GeneratorContext,
    summaries: &[VectorSummary],
) -> Option<MarketChartData> {
    let research_data = build_master_context(summaries, CHART_CONTEXT_CHARS);
    if research_data.is_empty() {
        tracing::debug!("no synthesized intelligence, skipping chart data");
        return None;
    }

    println!("📊 生成市场图表数据...");
    let prompt = build_chart_prompt(&research_data, chrono::Utc::now().year());
    let parsed = match context.llm_client.prompt(DATA_SYSTEM_PROMPT, &prompt).await {
        Ok(response) => parse_chart_data(&response),
        Err(e) => Err(e),
    };

    match parsed {
        Ok(data) => {
            context.events.emit(ResearchEvent::ChartData(data.clone()));
            Some(data)
        }
        Err(e) => {
            tracing::warn!(error = %e, "chart generation failed");
            eprintln!("⚠️ 图表数据生成失败: {}", e);
            context
                .events
                .emit(ResearchEvent::Warning(format!("Chart generation failed: {}", e)));
            None
        }
    }
}
