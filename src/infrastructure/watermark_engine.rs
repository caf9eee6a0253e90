//! 还原引擎接口 - 基础设施层
//!
//! 引擎内部算法不属于本系统，流水线只通过这个 trait 使用它，测试时可以替换为确定性的假引擎。

use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::{DecodedImage, WatermarkInfo};

/// 大尺寸判定阈值：宽高都超过该值时使用大水印
const LARGE_IMAGE_THRESHOLD: u32 = 1024;

/// 去水印引擎
///
/// 职责：
/// - 接收解码后的图片，返回去除水印后的图片
/// - 可以被多个任务同时调用
/// - 不认识文件名以外的业务概念
#[async_trait]
pub trait WatermarkEngine: Send + Sync {
    /// 根据图片尺寸给出水印位置信息（纯函数，仅用于展示）
    fn watermark_info(&self, width: u32, height: u32) -> WatermarkInfo {
        watermark_info_for(width, height)
    }

    /// 去除水印
    ///
    /// # 参数
    /// - `image`: 解码后的图片
    /// - `name`: 原始文件名（仅用于错误信息）
    async fn remove_watermark(
        &self,
        image: &DecodedImage,
        name: &str,
    ) -> Result<DecodedImage, EngineError>;
}

/// 水印固定在右下角：大图 96px + 64px 边距，其余 48px + 32px 边距
pub fn watermark_info_for(width: u32, height: u32) -> WatermarkInfo {
    if width > LARGE_IMAGE_THRESHOLD && height > LARGE_IMAGE_THRESHOLD {
        WatermarkInfo {
            size: 96,
            margin_right: 64,
            margin_bottom: 64,
        }
    } else {
        WatermarkInfo {
            size: 48,
            margin_right: 32,
            margin_bottom: 32,
        }
    }
}
