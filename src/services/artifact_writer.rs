//! 结果写入服务 - 业务能力层
//!
//! 只负责"把下载文件和运行汇总写到输出目录"能力，不关心流程

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, FileError};
use crate::models::RunSummary;
use crate::services::download::DownloadArtifact;

/// 运行汇总文件名
pub const SUMMARY_FILE_NAME: &str = "run_summary.json";

/// 结果写入服务
pub struct ArtifactWriter {
    output_folder: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_folder: impl Into<PathBuf>) -> Self {
        Self {
            output_folder: output_folder.into(),
        }
    }

    /// 写入下载文件
    ///
    /// # 返回
    /// 写入后的完整路径
    pub async fn write(&self, artifact: &DownloadArtifact) -> AppResult<PathBuf> {
        let path = self.output_folder.join(&artifact.file_name);
        self.write_bytes(&path, &artifact.data).await?;

        info!("💾 已保存: {} ({})", path.display(), artifact.mime_type);
        Ok(path)
    }

    /// 写入运行汇总（JSON）
    pub async fn write_summary(&self, summary: &RunSummary) -> AppResult<PathBuf> {
        let path = self.output_folder.join(SUMMARY_FILE_NAME);
        let json = serde_json::to_vec_pretty(summary).map_err(FileError::SerializeFailed)?;
        self.write_bytes(&path, &json).await?;

        debug!("运行汇总已写入: {}", path.display());
        Ok(path)
    }

    async fn write_bytes(&self, path: &Path, data: &[u8]) -> AppResult<()> {
        fs::create_dir_all(&self.output_folder)
            .await
            .map_err(|e| AppError::file_write_failed(&self.output_folder, e))?;
        fs::write(path, data)
            .await
            .map_err(|e| AppError::file_write_failed(path, e))?;
        Ok(())
    }
}
