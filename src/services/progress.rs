//! 进度上报 - 业务能力层
//!
//! 进度的展示方（UI）在系统之外，这里只定义它消费的接口，以及保证"单次运行内百分比不回退"的跟踪器

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

/// 空闲状态文字
pub const IDLE_STATUS: &str = "Ready";

/// 进度事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 0-100
    pub percent: u8,
    pub status: String,
}

impl ProgressEvent {
    pub fn idle() -> Self {
        Self {
            percent: 0,
            status: IDLE_STATUS.to_string(),
        }
    }
}

/// 进度接收方
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

/// 把进度写到日志里
#[derive(Debug, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&self, event: &ProgressEvent) {
        info!("[{:>3}%] {}", event.percent, event.status);
    }
}

/// 完成比例，四舍五入到整数百分比
pub fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done.min(total) as f64 / total as f64) * 100.0).round() as u8
}

/// 进度跟踪器
///
/// 多个任务可能以任意顺序完成并上报；跟踪器只接受不小于当前值的百分比，
/// 因此一次运行内接收方看到的百分比单调不减。
pub struct ProgressTracker {
    reporter: Arc<dyn ProgressReporter>,
    current: Mutex<ProgressEvent>,
}

impl ProgressTracker {
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            current: Mutex::new(ProgressEvent::idle()),
        }
    }

    /// 新的运行开始：百分比归零
    pub fn begin(&self, status: impl Into<String>) {
        self.set(ProgressEvent {
            percent: 0,
            status: status.into(),
        });
    }

    /// 更新进度，小于当前值的百分比会被忽略
    pub fn update(&self, percent: u8, status: impl Into<String>) {
        let mut current = self.lock();
        if percent < current.percent {
            return;
        }
        *current = ProgressEvent {
            percent: percent.min(100),
            status: status.into(),
        };
        // 在锁内上报，接收方看到的顺序与这里的接受顺序一致
        self.reporter.report(&current);
    }

    /// 显式重置：回到 0 和空闲文字
    pub fn reset(&self) {
        self.set(ProgressEvent::idle());
    }

    pub fn snapshot(&self) -> ProgressEvent {
        self.lock().clone()
    }

    fn set(&self, event: ProgressEvent) {
        let mut current = self.lock();
        *current = event;
        self.reporter.report(&current);
    }

    fn lock(&self) -> MutexGuard<'_, ProgressEvent> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
