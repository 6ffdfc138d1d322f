// 报告合成阶段
// 将各向量的有效情报拼接为总上下文，逐章节调用LLM撰写；随后可选地抽取图表数据

use chrono::Datelike;

use crate::config::{PROJECTION_HORIZON_PLACEHOLDER, SectionSpec};
use crate::generator::context::GeneratorContext;
use crate::generator::events::ResearchEvent;
use crate::generator::types::{ReportSection, VectorSummary};
use crate::i18n::TargetLanguage;
use crate::utils::text::truncate_chars;

pub mod chart;

/// 章节合成阶段的进度区间
pub const SYNTHESIS_PROGRESS: (u8, u8) = (50, 90);

const PARTNER_SYSTEM_PROMPT: &str =
    "You are the Pegasus Lead Partner, a senior strategy consultant writing for executives.";

const EMPTY_CONTEXT_NOTICE: &str =
    "No verified research data could be retrieved. State clearly where evidence is missing.";

/// 拼接总上下文：只包含成功合成的向量摘要，按字符数截断
pub fn build_master_context(summaries: &[VectorSummary], max_chars: usize) -> String {
    let joined = summaries
        .iter()
        .filter(|summary| summary.is_synthesized())
        .map(|summary| format!("RESEARCH DATA FOR {}: {}", summary.vector.query, summary.summary))
        .collect::<Vec<_>>()
        .join("\n\n");

    truncate_chars(&joined, max_chars).to_string()
}

/// 预测区间，例如 2025-2029
pub fn projection_horizon(current_year: i32) -> String {
    format!("{}-{}", current_year, current_year + 4)
}

/// 替换章节指令中的占位符
pub fn resolve_instruction(instruction: &str, current_year: i32) -> String {
    instruction.replace(
        PROJECTION_HORIZON_PLACEHOLDER,
        &projection_horizon(current_year),
    )
}

pub fn build_section_prompt(
    topic: &str,
    title: &str,
    instruction: &str,
    research_data: &str,
    language: &TargetLanguage,
) -> String {
    let research_data = if research_data.trim().is_empty() {
        EMPTY_CONTEXT_NOTICE
    } else {
        research_data
    };

    format!(
        "You are the Pegasus Lead Partner. Using ONLY the following research data, write the '{}' section of a report for {}. {} \
         Be professional, use Markdown headers, and do not truncate. Provide the full text for this section. {}\
         \n\nRESEARCH DATA:\n{}",
        title,
        topic,
        instruction,
        language.prompt_instruction(),
        research_data
    )
}

/// 逐章节合成报告
///
/// 章节按配置顺序依次生成，单个章节失败时写入占位文本并标记为降级。
#[tracing::instrument(name = "synthesize sections", skip_all, fields(sections = context.config.report.sections.len()))]
pub async fn synthesize_sections(
    context: &GeneratorContext,
    summaries: &[VectorSummary],
) -> Vec<ReportSection> {
    println!("\n🤖 执行报告合成流程...");
    println!(
        "📝 目标语言: {}",
        context.config.target_language.display_name()
    );

    let master_context =
        build_master_context(summaries, context.config.research.max_master_context_chars);
    let current_year = chrono::Utc::now().year();
    let specs: &[SectionSpec] = &context.config.report.sections;
    let total = specs.len();

    let mut sections = Vec::with_capacity(total);
    for (i, spec) in specs.iter().enumerate() {
        println!("✍️ 撰写章节: {}", spec.title);
        context.events.emit(ResearchEvent::SectionStarted {
            title: spec.title.clone(),
        });

        let instruction = resolve_instruction(&spec.instruction, current_year);
        let prompt = build_section_prompt(
            &context.config.topic,
            &spec.title,
            &instruction,
            &master_context,
            &context.config.target_language,
        );

        let section = match context
            .llm_client
            .prompt(PARTNER_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(content) => ReportSection {
                title: spec.title.clone(),
                content: content.trim().to_string(),
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(section = %spec.title, error = %e, "section generation failed");
                eprintln!("❌ 章节 {} 生成失败: {}", spec.title, e);
                ReportSection {
                    title: spec.title.clone(),
                    content: format!("*Section generation failed: {}*", e),
                    degraded: true,
                }
            }
        };

        context.events.emit(ResearchEvent::SectionReady {
            title: section.title.clone(),
            content: section.content.clone(),
            degraded: section.degraded,
        });
        context
            .events
            .progress(SYNTHESIS_PROGRESS.0, SYNTHESIS_PROGRESS.1, i + 1, total);
        sections.push(section);
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::types::{ResearchVector, SummaryStatus};

    fn summary(index: usize, query: &str, text: &str, status: SummaryStatus) -> VectorSummary {
        VectorSummary {
            vector: ResearchVector::new(index, query),
            summary: text.to_string(),
            citations: vec![],
            status,
            mindmap: None,
        }
    }

    #[test]
    fn test_master_context_only_synthesized() {
        let summaries = vec![
            summary(1, "q1", "first", SummaryStatus::Synthesized),
            summary(2, "q2", "*No sources*", SummaryStatus::Placeholder),
            summary(3, "q3", "third", SummaryStatus::Synthesized),
        ];

        let context = build_master_context(&summaries, 10_000);

        assert_eq!(
            context,
            "RESEARCH DATA FOR q1: first\n\nRESEARCH DATA FOR q3: third"
        );
    }

    #[test]
    fn test_master_context_is_bounded() {
        let long_text = "x".repeat(500);
        let summaries = vec![
            summary(1, "q1", &long_text, SummaryStatus::Synthesized),
            summary(2, "q2", &long_text, SummaryStatus::Synthesized),
        ];

        let context = build_master_context(&summaries, 300);

        assert_eq!(context.chars().count(), 300);
        assert!(context.starts_with("RESEARCH DATA FOR q1: "));
    }

    #[test]
    fn test_master_context_empty() {
        assert_eq!(build_master_context(&[], 100), "");
    }

    #[test]
    fn test_resolve_instruction() {
        assert_eq!(
            resolve_instruction("Provide __PROJECTION_HORIZON__ projections.", 2026),
            "Provide 2026-2030 projections."
        );
        assert_eq!(resolve_instruction("No placeholder.", 2026), "No placeholder.");
    }

    #[test]
    fn test_section_prompt() {
        let prompt = build_section_prompt(
            "Acme Corp",
            "SWOT Analysis",
            "Provide a breakdown.",
            "RESEARCH DATA FOR q1: facts",
            &TargetLanguage::English,
        );

        assert!(prompt.starts_with(
            "You are the Pegasus Lead Partner. Using ONLY the following research data, write the 'SWOT Analysis' section of a report for Acme Corp. Provide a breakdown."
        ));
        assert!(prompt.ends_with("\n\nRESEARCH DATA:\nRESEARCH DATA FOR q1: facts"));
    }

    #[test]
    fn test_section_prompt_with_empty_context() {
        let prompt = build_section_prompt("Acme", "Outlook", "", "  ", &TargetLanguage::Chinese);

        assert!(prompt.contains(EMPTY_CONTEXT_NOTICE));
        assert!(prompt.contains(TargetLanguage::Chinese.prompt_instruction()));
    }
}
