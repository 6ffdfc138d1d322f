// 调研阶段
// 1. 规划：LLM给出N个调研向量（失败即终止）
// 2. 挖掘：每个向量独立地搜索、抓取、摘要，按max_parallels并发，结果按向量顺序汇总

use anyhow::Result;
use std::sync::Arc;

use crate::generator::context::GeneratorContext;
use crate::generator::events::ProgressCounter;
use crate::generator::types::VectorSummary;
use crate::utils::threads::do_parallel_with_limit;

pub mod miner;
pub mod vectors;

/// 向量挖掘阶段的进度区间
pub const RESEARCH_PROGRESS: (u8, u8) = (0, 50);

/// 执行调研阶段
pub async fn execute(context: &GeneratorContext) -> Result<Vec<VectorSummary>> {
    println!("\n🚀 开始执行调研流程...");

    let research_vectors = vectors::generate_vectors(context).await?;
    let total = research_vectors.len();
    let max_parallels = context.config.llm.max_parallels;
    let progress = Arc::new(ProgressCounter::new(
        RESEARCH_PROGRESS.0,
        RESEARCH_PROGRESS.1,
        total,
    ));

    let mining_futures: Vec<_> = research_vectors
        .into_iter()
        .map(|vector| {
            let context = context.clone();
            let progress = progress.clone();
            Box::pin(async move {
                let summary = miner::mine_vector(&context, vector).await;
                progress.advance(&context.events);
                summary
            })
        })
        .collect();

    // 使用do_parallel_with_limit进行并发控制
    let summaries = do_parallel_with_limit(mining_futures, max_parallels).await;

    let synthesized = summaries.iter().filter(|s| s.is_synthesized()).count();
    println!(
        "✓ 调研流程执行完毕：{}/{} 个向量获得有效情报",
        synthesized,
        summaries.len()
    );
    if synthesized == 0 {
        tracing::warn!("no vector produced synthesized intelligence");
        eprintln!("⚠️ 所有向量均未获得有效情报，报告将基于空数据生成");
    }

    Ok(summaries)
}
