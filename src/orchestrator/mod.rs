//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_scheduler` - 批量还原调度器
//! - 运行守卫（同一时间只有一个批次）
//! - 单张模式 / 分批并发模式
//! - 控制并发数量（Semaphore + 批次屏障）
//! - 登记结果、上报进度
//!
//! ### `app` - 应用会话
//! - 创建引擎（每个会话一次）
//! - 扫描输入目录
//! - 选择下载方式并保存文件
//!
//! ## 层次关系
//!
//! ```text
//! app (会话：加载 / 下载)
//!     ↓
//! batch_scheduler (处理 Vec<SourceFile>)
//!     ↓
//! workflow::RestoreFlow (处理单张图片)
//!     ↓
//! services (能力层：解码 / 登记 / 打包 / 进度)
//!     ↓
//! infrastructure (基础设施：WatermarkEngine)
//! ```

pub mod app;
pub mod batch_scheduler;

// 重新导出主要类型
pub use app::App;
pub use batch_scheduler::BatchScheduler;
