//! 图片读写服务 - 业务能力层
//!
//! 只负责"字节 ↔ 位图"的转换，不关心流程

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::error::{DecodeError, EngineError};
use crate::models::{DecodedImage, SourceFile};

/// 图片读写服务
///
/// 解码和编码都放到阻塞线程池里执行，不阻塞其他并发任务；本身无状态，可以任意共享。
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageLoader;

impl ImageLoader {
    pub fn new() -> Self {
        Self
    }

    /// 解码源文件
    ///
    /// # 返回
    /// 字节流无法解析为图片时返回 `DecodeError`
    pub async fn load(&self, file: &SourceFile) -> Result<DecodedImage, DecodeError> {
        if file.is_empty() {
            return Err(DecodeError::EmptyInput {
                name: file.name.clone(),
            });
        }

        let data = file.data.clone();
        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&data))
            .await
            .map_err(|source| DecodeError::TaskFailed {
                name: file.name.clone(),
                source,
            })?
            .map_err(|source| DecodeError::InvalidImage {
                name: file.name.clone(),
                source,
            })?;

        debug!(
            "解码完成: {} ({}x{})",
            file.name,
            decoded.width(),
            decoded.height()
        );
        Ok(DecodedImage::new(decoded.to_rgba8()))
    }

    /// 将还原结果编码为 PNG，编码完成后位图随之释放
    pub async fn encode_png(
        &self,
        image: DecodedImage,
        name: &str,
    ) -> Result<Vec<u8>, EngineError> {
        let encoded = tokio::task::spawn_blocking(move || {
            let mut buffer = Cursor::new(Vec::new());
            DynamicImage::ImageRgba8(image.into_pixels()).write_to(&mut buffer, ImageFormat::Png)?;
            Ok::<_, image::ImageError>(buffer.into_inner())
        })
        .await
        .map_err(|source| EngineError::TaskFailed {
            name: name.to_string(),
            source,
        })?
        .map_err(|source| EngineError::EncodeFailed {
            name: name.to_string(),
            source,
        })?;

        Ok(encoded)
    }
}
