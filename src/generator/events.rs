//! 调研过程事件，供实时终端等观察者订阅

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::generator::types::{MarketChartData, ResearchVector};

/// 流水线中的进度事件
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchEvent {
    Deployed { topic: String },
    VectorsPlanned { vectors: Vec<ResearchVector> },
    VectorStarted { vector: ResearchVector },
    SourceFound { vector_index: usize, url: String },
    SourceSkipped {
        vector_index: usize,
        url: String,
        reason: String,
    },
    VectorSummarized {
        vector_index: usize,
        query: String,
        summary: String,
    },
    VectorSkipped {
        vector_index: usize,
        query: String,
        reason: String,
    },
    Mindmap {
        vector_index: usize,
        query: String,
        diagram: String,
    },
    SectionStarted { title: String },
    SectionReady {
        title: String,
        content: String,
        degraded: bool,
    },
    ChartData(MarketChartData),
    /// 0-100
    Progress(u8),
    Warning(String),
    Finished { output: PathBuf },
}

/// 事件发送端；未连接观察者时发送为空操作
#[derive(Clone, Default)]
pub struct EventSink(Option<UnboundedSender<ResearchEvent>>);

impl EventSink {
    /// 创建一对发送端与接收端
    pub fn channel() -> (Self, UnboundedReceiver<ResearchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(Some(tx)), rx)
    }

    pub fn emit(&self, event: ResearchEvent) {
        if let Some(tx) = &self.0 {
            // 观察者提前退出不影响流水线
            let _ = tx.send(event);
        }
    }

    /// 按已完成比例换算进度，映射到 [start, end] 区间
    pub fn progress(&self, start: u8, end: u8, done: usize, total: usize) {
        self.emit(ResearchEvent::Progress(scale_progress(start, end, done, total)));
    }
}

/// 并发任务共享的完成计数器
///
/// 计数与发送在同一把锁内完成，观察者收到的进度单调不减。
pub struct ProgressCounter {
    start: u8,
    end: u8,
    total: usize,
    done: Mutex<usize>,
}

impl ProgressCounter {
    pub fn new(start: u8, end: u8, total: usize) -> Self {
        Self {
            start,
            end,
            total,
            done: Mutex::new(0),
        }
    }

    /// 记录一个任务完成并发送对应进度
    pub fn advance(&self, events: &EventSink) -> u8 {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        *done += 1;
        let percent = scale_progress(self.start, self.end, *done, self.total);
        events.emit(ResearchEvent::Progress(percent));
        percent
    }
}

pub fn scale_progress(start: u8, end: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return end;
    }
    let span = usize::from(end.saturating_sub(start));
    let offset = span * done.min(total) / total;
    start + offset as u8
}
