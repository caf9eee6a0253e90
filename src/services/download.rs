//! 下载服务 - 业务能力层
//!
//! 决定"下载哪个文件"：只有一个结果时直接给出该图片，多个结果走打包

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AppResult;
use crate::models::RestorationResult;
use crate::services::archive_packager::{archive_name, restored_name, ArchivePackager};

pub const PNG_MIME: &str = "image/png";
pub const ZIP_MIME: &str = "application/zip";

/// 下载入口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadRequest {
    /// 下载按钮：单个结果直接下载，多个结果打包
    Primary,
    /// 全部下载按钮：总是打包
    All,
}

/// 待保存的下载文件
#[derive(Debug, Clone)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub data: Arc<[u8]>,
}

/// 下载服务
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadService {
    packager: ArchivePackager,
}

impl DownloadService {
    pub fn new(packager: ArchivePackager) -> Self {
        Self { packager }
    }

    /// 根据结果数量和下载入口生成下载文件
    ///
    /// # 返回
    /// 没有任何结果时返回 `None`（下载操作不做任何事）
    pub async fn prepare(
        &self,
        results: &[RestorationResult],
        request: DownloadRequest,
    ) -> AppResult<Option<DownloadArtifact>> {
        if results.is_empty() {
            debug!("没有可下载的结果");
            return Ok(None);
        }

        if let ([single], DownloadRequest::Primary) = (results, request) {
            info!("⬇️ 单张下载: {}", single.original_name);
            return Ok(Some(DownloadArtifact {
                file_name: restored_name(&single.original_name),
                mime_type: PNG_MIME,
                data: single.binary_data.clone(),
            }));
        }

        let archive = self.packager.pack(results).await?;
        let file_name = archive_name(chrono::Utc::now().timestamp_millis());
        info!("⬇️ 打包下载: {} ({} 个文件)", file_name, results.len());

        Ok(Some(DownloadArtifact {
            file_name,
            mime_type: ZIP_MIME,
            data: archive.into(),
        }))
    }
}
