//! 应用会话 - 编排层
//!
//! 持有引擎和调度器，串起"加载文件 → 批量还原 → 下载"整个流程

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{AlphaMapEngine, WatermarkEngine};
use crate::models::{load_all_source_files, RunSummary, SourceFile};
use crate::orchestrator::batch_scheduler::BatchScheduler;
use crate::services::{
    ArchivePackager, ArtifactWriter, DownloadRequest, DownloadService, LogReporter,
    ProgressReporter,
};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    scheduler: BatchScheduler,
    downloads: DownloadService,
    writer: ArtifactWriter,
}

impl App {
    /// 初始化应用：写日志文件头，并创建去水印引擎（每个会话一次）
    pub async fn initialize(config: Config) -> AppResult<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(&config);

        let engine = AlphaMapEngine::create(&config).await?;
        Ok(Self::with_engine(config, Arc::new(engine), Arc::new(LogReporter)))
    }

    /// 使用指定的引擎和进度接收方创建应用
    pub fn with_engine(
        config: Config,
        engine: Arc<dyn WatermarkEngine>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        let scheduler = BatchScheduler::new(engine, &config, reporter);
        let writer = ArtifactWriter::new(&config.output_folder);

        Self {
            config,
            scheduler,
            downloads: DownloadService::new(ArchivePackager::new()),
            writer,
        }
    }

    pub fn scheduler(&self) -> &BatchScheduler {
        &self.scheduler
    }

    /// 运行应用主逻辑：处理输入目录中的所有文件并保存下载文件
    pub async fn run(&self) -> AppResult<RunSummary> {
        info!("\n📁 正在扫描待处理的图片...");
        let files = load_all_source_files(&self.config.input_folder).await?;

        if files.is_empty() {
            warn!("⚠️ 没有找到待处理的文件，程序结束");
            return Ok(RunSummary::default());
        }

        let summary = self.process(files).await?;

        let request = if self.config.download_all {
            DownloadRequest::All
        } else {
            DownloadRequest::Primary
        };
        let saved = self.download(request).await?;
        self.writer.write_summary(&summary).await?;

        logging::print_final_stats(&summary, saved.as_deref(), &self.config.output_log_file);
        Ok(summary)
    }

    /// 处理一组已提交的文件
    pub async fn process(&self, files: Vec<SourceFile>) -> AppResult<RunSummary> {
        self.scheduler.run(files).await
    }

    /// 保存下载文件
    ///
    /// # 返回
    /// 没有任何结果时返回 `None`
    pub async fn download(&self, request: DownloadRequest) -> AppResult<Option<PathBuf>> {
        let results = self.scheduler.registry().all();
        let Some(artifact) = self.downloads.prepare(&results, request).await? else {
            return Ok(None);
        };

        let path = self.writer.write(&artifact).await?;
        Ok(Some(path))
    }

    /// 重置会话
    pub fn reset(&self) -> bool {
        self.scheduler.reset()
    }
}
