//! 反向 alpha 混合去水印引擎
//!
//! 水印是白色 logo 以固定透明度叠加到右下角：`wm = α·255 + (1−α)·orig`。
//! 已知每个像素的 α（由黑底截图得到），即可解出 `orig = (wm − α·255) / (1 − α)`。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::RgbaImage;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::EngineError;
use crate::models::{DecodedImage, WatermarkInfo};

use super::watermark_engine::WatermarkEngine;

/// 低于该透明度的像素视为未被覆盖
const ALPHA_THRESHOLD: f32 = 0.002;
/// 透明度上限，避免除以接近 0 的数
const MAX_ALPHA: f32 = 0.99;
/// logo 颜色（纯白）
const LOGO_VALUE: f32 = 255.0;

const SMALL_MAP_SIZE: u32 = 48;
const LARGE_MAP_SIZE: u32 = 96;

/// 水印透明度图
#[derive(Debug, Clone)]
pub struct AlphaMap {
    size: u32,
    values: Vec<f32>,
}

impl AlphaMap {
    /// 由黑底 logo 截图计算透明度：α = max(r, g, b) / 255
    pub fn from_capture(capture: &RgbaImage) -> Self {
        let size = capture.width();
        let values = capture
            .pixels()
            .map(|p| f32::from(p[0].max(p[1]).max(p[2])) / 255.0)
            .collect();
        Self { size, values }
    }

    /// 所有像素使用同一透明度
    pub fn uniform(size: u32, alpha: f32) -> Self {
        Self {
            size,
            values: vec![alpha; (size * size) as usize],
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    fn get(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.size + x) as usize]
    }
}

/// 基于透明度图的去水印引擎
///
/// 透明度图用 `Arc` 共享，逐像素计算放到阻塞线程池中执行。
pub struct AlphaMapEngine {
    small: Arc<AlphaMap>,
    large: Arc<AlphaMap>,
}

impl AlphaMapEngine {
    /// 初始化引擎（每个会话一次），从磁盘加载两张透明度图
    pub async fn create(config: &Config) -> Result<Self, EngineError> {
        let small = load_alpha_map(Path::new(&config.alpha_map_small), SMALL_MAP_SIZE).await?;
        let large = load_alpha_map(Path::new(&config.alpha_map_large), LARGE_MAP_SIZE).await?;

        info!("✓ 去水印引擎初始化完成");
        Self::from_alpha_maps(small, large)
    }

    /// 使用已加载的透明度图创建引擎
    pub fn from_alpha_maps(small: AlphaMap, large: AlphaMap) -> Result<Self, EngineError> {
        check_size(&small, SMALL_MAP_SIZE, "small")?;
        check_size(&large, LARGE_MAP_SIZE, "large")?;
        Ok(Self {
            small: Arc::new(small),
            large: Arc::new(large),
        })
    }

    fn alpha_map_for(&self, info: &WatermarkInfo) -> &Arc<AlphaMap> {
        if info.size == LARGE_MAP_SIZE {
            &self.large
        } else {
            &self.small
        }
    }
}

#[async_trait]
impl WatermarkEngine for AlphaMapEngine {
    async fn remove_watermark(
        &self,
        image: &DecodedImage,
        name: &str,
    ) -> Result<DecodedImage, EngineError> {
        let info = self.watermark_info(image.width(), image.height());
        let alpha = self.alpha_map_for(&info).clone();

        debug!("{}: 水印区域 {}x{}", name, info.size, info.size);

        let mut restored = image.clone();
        tokio::task::spawn_blocking(move || {
            reverse_blend(restored.pixels_mut(), &alpha, &info);
            restored
        })
        .await
        .map_err(|source| EngineError::TaskFailed {
            name: name.to_string(),
            source,
        })
    }
}

fn check_size(map: &AlphaMap, expected: u32, label: &str) -> Result<(), EngineError> {
    if map.size() != expected {
        return Err(EngineError::InvalidAsset {
            path: PathBuf::from(label),
            reason: format!("透明度图应为 {expected}x{expected}，实际为 {}", map.size()),
        });
    }
    Ok(())
}

async fn load_alpha_map(path: &Path, expected: u32) -> Result<AlphaMap, EngineError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| EngineError::AssetLoadFailed {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

    let capture = image::load_from_memory(&bytes)
        .map_err(|e| EngineError::AssetLoadFailed {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?
        .to_rgba8();

    if capture.width() != expected || capture.height() != expected {
        return Err(EngineError::InvalidAsset {
            path: path.to_path_buf(),
            reason: format!(
                "透明度图应为 {expected}x{expected}，实际为 {}x{}",
                capture.width(),
                capture.height()
            ),
        });
    }

    Ok(AlphaMap::from_capture(&capture))
}

/// 在右下角水印区域内逐像素反解原始颜色，超出图片范围的部分忽略
fn reverse_blend(pixels: &mut RgbaImage, alpha: &AlphaMap, info: &WatermarkInfo) {
    let (width, height) = (i64::from(pixels.width()), i64::from(pixels.height()));
    let x0 = width - i64::from(info.margin_right) - i64::from(info.size);
    let y0 = height - i64::from(info.margin_bottom) - i64::from(info.size);

    for ay in 0..alpha.size() {
        for ax in 0..alpha.size() {
            let (x, y) = (x0 + i64::from(ax), y0 + i64::from(ay));
            if x < 0 || y < 0 || x >= width || y >= height {
                continue;
            }

            let a = alpha.get(ax, ay);
            if a < ALPHA_THRESHOLD {
                continue;
            }
            let a = a.min(MAX_ALPHA);

            let pixel = pixels.get_pixel_mut(x as u32, y as u32);
            for channel in pixel.0.iter_mut().take(3) {
                let original = (f32::from(*channel) - a * LOGO_VALUE) / (1.0 - a);
                *channel = original.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}
