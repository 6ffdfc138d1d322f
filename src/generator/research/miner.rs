//! 单个调研向量的检索与摘要

use crate::generator::context::GeneratorContext;
use crate::generator::events::ResearchEvent;
use crate::generator::types::{ResearchVector, SourceCitation, SummaryStatus, VectorSummary};
use crate::utils::text::{strip_code_fence, truncate_chars};
use crate::web::with_retries;

const ANALYST_SYSTEM_PROMPT: &str = "You are a meticulous market intelligence analyst. \
You only state facts supported by the provided sources and cite them.";

const NO_SOURCES_PLACEHOLDER: &str = "*No verifiable sources could be retrieved for this vector.*";

/// 挖掘单个向量：搜索、抓取、摘要，可选生成思维导图
///
/// 任何一步失败都只降级当前向量，不会中断整个流程。
#[tracing::instrument(name = "mine vector", skip(context, vector), fields(vector = vector.index, query = %vector.query))]
pub async fn mine_vector(context: &GeneratorContext, vector: ResearchVector) -> VectorSummary {
    println!("🔎 挖掘向量 #{}: {}", vector.index, vector.query);
    context.events.emit(ResearchEvent::VectorStarted {
        vector: vector.clone(),
    });

    let citations = collect_sources(context, &vector).await;

    if citations.is_empty() {
        tracing::warn!("no sources retrieved, using placeholder summary");
        eprintln!("⚠️ 向量 #{} 未获取到任何可用来源", vector.index);
        context.events.emit(ResearchEvent::VectorSkipped {
            vector_index: vector.index,
            query: vector.query.clone(),
            reason: "no sources".to_string(),
        });
        return VectorSummary::placeholder(vector, citations, NO_SOURCES_PLACEHOLDER);
    }

    let prompt = build_summary_prompt(&vector.query, &citations);
    let summary = match context
        .llm_client
        .prompt(ANALYST_SYSTEM_PROMPT, &prompt)
        .await
    {
        Ok(summary) => summary.trim().to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "vector summary failed");
            eprintln!("⚠️ 向量 #{} 摘要生成失败: {}", vector.index, e);
            context.events.emit(ResearchEvent::VectorSkipped {
                vector_index: vector.index,
                query: vector.query.clone(),
                reason: format!("summary failed: {}", e),
            });
            return VectorSummary::placeholder(
                vector,
                citations,
                format!("*Summary generation failed: {}*", e),
            );
        }
    };

    println!("✅ 向量 #{} 摘要完成 ({} 个来源)", vector.index, citations.len());
    context.events.emit(ResearchEvent::VectorSummarized {
        vector_index: vector.index,
        query: vector.query.clone(),
        summary: summary.clone(),
    });

    let mindmap = if context.config.research.include_mindmaps {
        generate_mindmap(context, &vector, &summary).await
    } else {
        None
    };

    VectorSummary {
        vector,
        summary,
        citations,
        status: SummaryStatus::Synthesized,
        mindmap,
    }
}

/// 搜索并抓取来源；搜索失败返回空列表，单个抓取失败只跳过该来源
async fn collect_sources(context: &GeneratorContext, vector: &ResearchVector) -> Vec<SourceCitation> {
    let web_config = &context.config.web;
    let research_config = &context.config.research;

    let hits = match with_retries(
        "search",
        web_config.retry_attempts,
        web_config.retry_delay_ms,
        || context.web.search(&vector.query, research_config.max_sources_per_vector),
    )
    .await
    {
        Ok(hits) => hits,
        Err(e) => {
            tracing::warn!(error = %e, "search failed");
            eprintln!("⚠️ 搜索失败 '{}': {}", vector.query, e);
            context
                .events
                .emit(ResearchEvent::Warning(format!("Search failed for '{}': {}", vector.query, e)));
            Vec::new()
        }
    };

    let mut citations = Vec::new();
    for hit in hits.into_iter().take(research_config.max_sources_per_vector) {
        context.events.emit(ResearchEvent::SourceFound {
            vector_index: vector.index,
            url: hit.url.clone(),
        });

        let fetched = with_retries(
            "fetch",
            web_config.retry_attempts,
            web_config.retry_delay_ms,
            || context.web.fetch_text(&hit.url),
        )
        .await;

        let reason = match fetched {
            Ok(text) if !text.trim().is_empty() => {
                citations.push(SourceCitation {
                    url: hit.url,
                    title: hit.title,
                    snippet: truncate_chars(text.trim(), research_config.max_chars_per_source)
                        .to_string(),
                });
                continue;
            }
            Ok(_) => "no extractable text".to_string(),
            Err(e) => e.to_string(),
        };

        tracing::warn!(url = %hit.url, reason = %reason, "skipped source");
        eprintln!("   ⚠️ 跳过来源 {}: {}", hit.url, reason);
        context.events.emit(ResearchEvent::SourceSkipped {
            vector_index: vector.index,
            url: hit.url,
            reason,
        });
    }

    citations
}

/// 构造带编号来源的摘要提示词
pub fn build_summary_prompt(query: &str, citations: &[SourceCitation]) -> String {
    let mut prompt = format!(
        "Summarize verified intelligence for: {}. Focus only on consensus-backed facts. \
         Cite every claim inline with the source number in square brackets, e.g. [1].\n\nSOURCES:\n",
        query
    );
    for (i, citation) in citations.iter().enumerate() {
        prompt.push_str(&format!(
            "\n[{}] {} ({})\n{}\n",
            i + 1,
            citation.title,
            citation.url,
            citation.snippet
        ));
    }
    prompt
}

async fn generate_mindmap(
    context: &GeneratorContext,
    vector: &ResearchVector,
    summary: &str,
) -> Option<String> {
    let prompt = format!(
        "You must output ONLY a valid Mermaid mindmap.\n\
         Always start with 'mindmap'\n\
         Use 2 spaces per indent level\n\
         Wrap node text in ( )\n\n{}",
        summary
    );

    let response = match context.llm_client.prompt(ANALYST_SYSTEM_PROMPT, &prompt).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "mindmap generation failed");
            return None;
        }
    };

    let Some(diagram) = normalize_mindmap(&response) else {
        tracing::warn!("mindmap response is not a mermaid mindmap");
        return None;
    };

    context.events.emit(ResearchEvent::Mindmap {
        vector_index: vector.index,
        query: vector.query.clone(),
        diagram: diagram.clone(),
    });
    Some(diagram)
}

/// 规整思维导图：从 `mindmap` 行截取到代码围栏结束，至少需要一个节点
pub fn normalize_mindmap(response: &str) -> Option<String> {
    let body = strip_code_fence(response);
    let lines: Vec<&str> = body
        .lines()
        .skip_while(|line| line.trim() != "mindmap")
        .take_while(|line| !line.trim_start().starts_with("```"))
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();

    if lines.len() < 2 {
        return None;
    }
    Some(lines.join("\n"))
}
