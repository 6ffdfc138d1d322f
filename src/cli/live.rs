//! 实时终端：把调研事件渲染为终端输出

use tokio::sync::mpsc::UnboundedReceiver;

use crate::generator::events::ResearchEvent;

const PROGRESS_BAR_WIDTH: usize = 30;

/// 持续消费事件直到发送端全部关闭
pub async fn render_feed(mut events: UnboundedReceiver<ResearchEvent>) {
    while let Some(event) = events.recv().await {
        println!("{}", render_event(&event));
    }
}

/// 渲染单个事件
pub fn render_event(event: &ResearchEvent) -> String {
    match event {
        ResearchEvent::Deployed { topic } => format!("\n🛰️  AGENT DEPLOYED: {}", topic),
        ResearchEvent::VectorsPlanned { vectors } => {
            let mut text = String::from("🧭 Research vectors:");
            for vector in vectors {
                text.push_str(&format!("\n   {}. {}", vector.index, vector.query));
            }
            text
        }
        ResearchEvent::VectorStarted { vector } => {
            format!("\n🧠 Mining vector #{}: {}", vector.index, vector.query)
        }
        ResearchEvent::SourceFound { vector_index, url } => {
            format!("   🌐 [#{}] {}", vector_index, url)
        }
        ResearchEvent::SourceSkipped {
            vector_index,
            url,
            reason,
        } => format!("   ⏭️ [#{}] skipped {} ({})", vector_index, url, reason),
        ResearchEvent::VectorSummarized {
            vector_index,
            query,
            summary,
        } => format!(
            "\n📡 VECTOR INTEL #{} | {}\n{}\n",
            vector_index,
            query,
            summary.trim()
        ),
        ResearchEvent::VectorSkipped {
            vector_index,
            query,
            reason,
        } => format!("⚠️ Vector #{} ({}) skipped: {}", vector_index, query, reason),
        ResearchEvent::Mindmap {
            vector_index,
            diagram,
            ..
        } => format!("🗺️ Mindmap #{}\n{}\n", vector_index, diagram),
        ResearchEvent::SectionStarted { title } => format!("\n✍️ Streaming section: {}", title),
        ResearchEvent::SectionReady {
            title,
            content,
            degraded,
        } => {
            let marker = if *degraded { "⚠️" } else { "📄" };
            format!(
                "{} ══════ {} ══════\n\n{}\n",
                marker,
                title.to_uppercase(),
                content.trim()
            )
        }
        ResearchEvent::ChartData(chart_data) => {
            format!("📊 Market data\n\n{}", chart_data.to_markdown().trim_end())
        }
        ResearchEvent::Progress(percent) => progress_bar(*percent),
        ResearchEvent::Warning(message) => format!("⚠️ {}", message),
        ResearchEvent::Finished { output } => {
            format!("\n🏁 Intelligence vaulted: {}", output.display())
        }
    }
}

/// 文本进度条，例如 `[██████░░░░] 60%`
pub fn progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = PROGRESS_BAR_WIDTH * usize::from(percent) / 100;
    format!(
        "[{}{}] {}%",
        "█".repeat(filled),
        "░".repeat(PROGRESS_BAR_WIDTH - filled),
        percent
    )
}
