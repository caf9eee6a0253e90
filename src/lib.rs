//! # GemRemover
//!
//! 批量去除图片右下角 Gemini 水印的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有还原引擎，只暴露"去水印"能力
//! - `WatermarkEngine` - 引擎接口（可替换，测试中使用假引擎）
//! - `AlphaMapEngine` - 基于透明度图的反向 alpha 混合实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单张图片或单个结果集
//! - `ImageLoader` - 解码 / 编码 PNG
//! - `ResultRegistry` - 登记还原结果
//! - `ArchivePackager` / `DownloadService` - 打包与下载决策
//! - `ProgressTracker` - 单调不减的进度上报
//! - `ArtifactWriter` - 写下载文件和运行汇总
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一张图片"的完整处理流程
//! - `ItemCtx` - 上下文封装（source_index + 文件名）
//! - `RestoreFlow` - 流程编排（类型检查 → 解码 → 去水印 → 编码）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_scheduler` - 运行守卫、分批并发、容错
//! - `orchestrator/app` - 会话：加载文件、运行、下载
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{AlphaMapEngine, WatermarkEngine};
pub use models::{DecodedImage, RestorationResult, RunState, RunSummary, SourceFile};
pub use orchestrator::{App, BatchScheduler};
pub use services::{DownloadArtifact, DownloadRequest, ProgressEvent, ProgressReporter};
pub use workflow::{ItemCtx, RestoreFlow};
