//! 图片还原流程 - 流程层
//!
//! 核心职责：定义"一张图片"的完整处理流程
//!
//! 流程顺序：
//! 1. MIME 类型检查（非图片直接跳过）
//! 2. 解码 → 去水印 → 编码为 PNG
//! 3. 生成还原结果（登记由编排层负责）

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppResult, EngineError};
use crate::infrastructure::WatermarkEngine;
use crate::models::{DecodedImage, RestorationResult, SourceFile};
use crate::services::{ImageLoader, ProgressTracker};
use crate::workflow::item_ctx::ItemCtx;

pub const PHASE_ANALYZING: &str = "Analyzing Neural Patterns...";
pub const PHASE_ISOLATING: &str = "Isolating Gemini Layers...";
pub const PHASE_SYNTHESIZING: &str = "Synthesizing Original Pixels...";

/// 跳过原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 声明的类型不是图片
    NotAnImage { mime_type: String },
}

/// 图片处理结果
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    /// 还原成功
    Restored(RestorationResult),
    /// 跳过
    Skipped(SkipReason),
}

/// 图片还原流程
///
/// - 编排单张图片的处理步骤
/// - 只持有引擎的共享引用，可以被多个任务同时使用
/// - 解码和引擎错误原样返回，由调用方决定是否跳过
pub struct RestoreFlow {
    loader: ImageLoader,
    engine: Arc<dyn WatermarkEngine>,
    timeout: Option<Duration>,
}

impl RestoreFlow {
    /// 创建新的还原流程
    pub fn new(engine: Arc<dyn WatermarkEngine>, config: &Config) -> Self {
        Self::with_timeout(engine, config.engine_timeout())
    }

    pub fn with_timeout(engine: Arc<dyn WatermarkEngine>, timeout: Option<Duration>) -> Self {
        Self {
            loader: ImageLoader::new(),
            engine,
            timeout,
        }
    }

    /// 批量模式下处理一张图片
    pub async fn run(&self, file: &SourceFile, ctx: &ItemCtx) -> AppResult<ItemOutcome> {
        if let Some(skip) = check_type(file) {
            return Ok(ItemOutcome::Skipped(skip));
        }

        let image = self.loader.load(file).await?;
        let result = self.restore_and_encode(image, ctx).await?;
        Ok(ItemOutcome::Restored(result))
    }

    /// 单张模式：同样的步骤，但每个阶段都上报进度
    pub async fn run_single(
        &self,
        file: &SourceFile,
        ctx: &ItemCtx,
        progress: &ProgressTracker,
    ) -> AppResult<ItemOutcome> {
        if let Some(skip) = check_type(file) {
            return Ok(ItemOutcome::Skipped(skip));
        }

        progress.update(20, PHASE_ANALYZING);
        let image = self.loader.load(file).await?;

        let watermark = self.engine.watermark_info(image.width(), image.height());
        info!("{} 水印检测: {}", ctx, watermark);
        progress.update(40, format!("{PHASE_ISOLATING} ({watermark})"));

        progress.update(70, PHASE_SYNTHESIZING);
        let result = self.restore_and_encode(image, ctx).await?;

        Ok(ItemOutcome::Restored(result))
    }

    async fn restore_and_encode(
        &self,
        image: DecodedImage,
        ctx: &ItemCtx,
    ) -> AppResult<RestorationResult> {
        let restored = self.restore(&image, ctx).await?;
        drop(image);

        let png = self.loader.encode_png(restored, &ctx.name).await?;
        debug!("{} 编码完成: {} 字节", ctx, png.len());

        Ok(RestorationResult::new(ctx.source_index, ctx.name.clone(), png))
    }

    /// 调用引擎；配置了超时则超时视为引擎错误
    async fn restore(
        &self,
        image: &DecodedImage,
        ctx: &ItemCtx,
    ) -> Result<DecodedImage, EngineError> {
        let call = self.engine.remove_watermark(image, &ctx.name);

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| EngineError::Timeout {
                    name: ctx.name.clone(),
                    secs: limit.as_secs(),
                })?,
            None => call.await,
        }
    }
}

fn check_type(file: &SourceFile) -> Option<SkipReason> {
    if file.is_image() {
        None
    } else {
        Some(SkipReason::NotAnImage {
            mime_type: file.mime_type.clone(),
        })
    }
}
