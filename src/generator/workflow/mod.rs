use crate::config::Config;
use crate::generator::context::GeneratorContext;
use crate::generator::errors::PipelineError;
use crate::generator::events::{EventSink, ResearchEvent};
use crate::generator::types::FinalReport;

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: std::time::Instant,
    phase_start_times: HashMap<String, std::time::Instant>,
    phase_durations: HashMap<String, Duration>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: HashMap::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .insert(phase_name.to_string(), std::time::Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let start_time = self.phase_start_times.remove(phase_name)?;
        let duration = start_time.elapsed();
        self.phase_durations.insert(phase_name.to_string(), duration);
        Some(duration)
    }

    /// 获取总执行时间
    pub fn get_total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn get_phase_durations(&self) -> &HashMap<String, Duration> {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告，阶段按流水线顺序排列
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.get_total_duration().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for phase in TimingKeys::get_all_phase_keys() {
                if let Some(duration) = self.phase_durations.get(phase) {
                    report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
                }
            }
        }

        report
    }
}

/// 时间跟踪常量
pub struct TimingKeys;

impl TimingKeys {
    pub const CONNECTION_CHECK: &'static str = "connection_check";
    pub const RESEARCH: &'static str = "research";
    pub const COMPOSE: &'static str = "compose";
    pub const CHARTS: &'static str = "charts";
    pub const OUTPUT: &'static str = "output";

    /// 获取所有阶段的键列表
    pub fn get_all_phase_keys() -> Vec<&'static str> {
        vec![
            Self::CONNECTION_CHECK,
            Self::RESEARCH,
            Self::COMPOSE,
            Self::CHARTS,
            Self::OUTPUT,
        ]
    }
}

/// 启动调研工作流，返回报告文件路径
pub async fn launch(config: &Config) -> Result<PathBuf> {
    launch_with_events(config, EventSink::default()).await
}

/// 启动调研工作流，并把进度事件发送给观察者
pub async fn launch_with_events(config: &Config, events: EventSink) -> Result<PathBuf> {
    let context = GeneratorContext::new(config.clone())?.with_events(events);
    run(&context).await
}

/// 在给定上下文中执行完整流程：连接检查、调研、合成、导出
#[tracing::instrument(name = "pegasus run", skip_all, fields(topic = %context.config.topic))]
pub async fn run(context: &GeneratorContext) -> Result<PathBuf> {
    let config = &context.config;
    if config.topic.trim().is_empty() {
        return Err(PipelineError::EmptyTopic.into());
    }

    let mut timing = TimingScope::new();
    println!("🦄 Pegasus 已部署: {}", config.topic);
    context.events.emit(ResearchEvent::Deployed {
        topic: config.topic.clone(),
    });

    // 启动时检查模型连接
    if config.llm.check_connection {
        timing.start_phase(TimingKeys::CONNECTION_CHECK);
        context
            .llm_client
            .check_connection()
            .await
            .map_err(PipelineError::ConnectionCheck)?;
        timing.end_phase(TimingKeys::CONNECTION_CHECK);
    }

    let report = build_report(context, &mut timing).await?;

    timing.start_phase(TimingKeys::OUTPUT);
    let output = crate::generator::outlet::save(config, &report).await?;
    timing.end_phase(TimingKeys::OUTPUT);

    context.events.emit(ResearchEvent::Progress(100));
    context.events.emit(ResearchEvent::Finished {
        output: output.clone(),
    });

    let degraded = report.degraded_sections();
    if degraded > 0 {
        eprintln!(
            "⚠️ {} 个章节生成失败，已使用占位内容",
            degraded
        );
    }
    println!("🎉 调研报告生成完成: {}", output.display());

    if config.verbose {
        println!("\n{}", timing.generate_timing_report());
    }

    Ok(output)
}

/// 执行调研与合成，组装最终报告
pub async fn build_report(
    context: &GeneratorContext,
    timing: &mut TimingScope,
) -> Result<FinalReport> {
    let config = &context.config;

    timing.start_phase(TimingKeys::RESEARCH);
    let summaries = crate::generator::research::execute(context).await?;
    timing.end_phase(TimingKeys::RESEARCH);

    timing.start_phase(TimingKeys::COMPOSE);
    let sections = crate::generator::compose::synthesize_sections(context, &summaries).await;
    timing.end_phase(TimingKeys::COMPOSE);

    let chart_data = if config.research.include_charts {
        timing.start_phase(TimingKeys::CHARTS);
        let chart_data = crate::generator::compose::chart::extract_chart_data(context, &summaries).await;
        timing.end_phase(TimingKeys::CHARTS);
        chart_data
    } else {
        None
    };

    Ok(FinalReport {
        title: config.report_title(),
        topic: config.topic.clone(),
        generated_at: chrono::Utc::now(),
        sections,
        vectors: summaries,
        chart_data,
        include_appendix: config.report.include_appendix,
    })
}

// Include tests
#[cfg(test)]
mod tests;
