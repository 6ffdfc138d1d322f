//! 调研向量规划

use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;

use crate::generator::context::GeneratorContext;
use crate::generator::errors::PipelineError;
use crate::generator::events::ResearchEvent;
use crate::generator::types::ResearchVector;

const PLANNER_SYSTEM_PROMPT: &str =
    "You are a senior market research strategist planning a due diligence engagement.";

static QUOTED_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)'"#).unwrap());

/// 让LLM规划调研向量
///
/// 模型调用耗尽重试视为致命错误；回复无法解析时退回到默认查询。
#[tracing::instrument(name = "generate vectors", skip(context), fields(topic = %context.config.topic))]
pub async fn generate_vectors(context: &GeneratorContext) -> Result<Vec<ResearchVector>> {
    let topic = context.config.topic.as_str();
    let count = context.config.research.num_vectors.max(1);

    println!("🧭 正在规划调研向量...");
    let prompt = build_vector_prompt(topic, count);
    let response = context
        .llm_client
        .prompt(PLANNER_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(PipelineError::NoResearchVectors)?;

    let queries = match parse_research_vectors(&response, count) {
        Some(queries) => queries,
        None => {
            tracing::warn!(response_len = response.len(), "could not parse research vectors, using defaults");
            let message = "Failed to parse research vectors, using default queries".to_string();
            eprintln!("⚠️ {}", message);
            context.events.emit(ResearchEvent::Warning(message));
            default_vectors(topic, count)
        }
    };

    let vectors: Vec<ResearchVector> = queries
        .into_iter()
        .enumerate()
        .map(|(i, query)| ResearchVector::new(i + 1, query))
        .collect();

    println!("✅ 已规划 {} 个调研向量", vectors.len());
    context.events.emit(ResearchEvent::VectorsPlanned {
        vectors: vectors.clone(),
    });

    Ok(vectors)
}

pub fn build_vector_prompt(topic: &str, count: usize) -> String {
    format!(
        "Generate a JSON list of exactly {} distinct market research queries for deep due diligence on: {}. \
         Each query should target a different angle (market size, competitors, customers, regulation, technology, financials, risks). \
         Return ONLY the list, for example [\"query one\", \"query two\"].",
        count, topic
    )
}

/// 从回复中解析查询列表
///
/// 取第一个 `[` 到最后一个 `]` 之间的内容，先按JSON解析，失败时逐个提取引号包裹的条目。
/// 结果去除首尾空白、忽略大小写去重并截断到 `count` 条；没有有效条目时返回None。
pub fn parse_research_vectors(response: &str, count: usize) -> Option<Vec<String>> {
    let start = response.find('[')?;
    let end = response.rfind(']')?;
    if end <= start {
        return None;
    }
    let list = &response[start..=end];

    let items: Vec<String> = match serde_json::from_str::<Vec<String>>(list) {
        Ok(items) => items,
        Err(_) => QUOTED_ITEM_RE
            .captures_iter(list)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().replace("\\'", "'").replace("\\\"", "\""))
            .collect(),
    };

    let mut queries: Vec<String> = Vec::new();
    for item in items {
        let query = item.trim();
        if query.is_empty() {
            continue;
        }
        if queries.iter().any(|q| q.eq_ignore_ascii_case(query)) {
            continue;
        }
        queries.push(query.to_string());
        if queries.len() >= count {
            break;
        }
    }

    if queries.is_empty() { None } else { Some(queries) }
}

/// 默认查询
pub fn default_vectors(topic: &str, count: usize) -> Vec<String> {
    [
        "market analysis",
        "competitors",
        "industry trends",
        "financial performance",
        "strategic position",
    ]
    .iter()
    .take(count.max(1))
    .map(|angle| format!("{} {}", topic, angle))
    .collect()
}
