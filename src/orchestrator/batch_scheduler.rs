//! 批量还原调度器 - 编排层
//!
//! ## 职责
//!
//! 把 N 张图片送进还原引擎，控制并发并汇总进度。
//!
//! ## 核心功能
//!
//! 1. **运行守卫**：同一时间只允许一个批次运行，任何退出路径都会释放；
//!    守卫由所有图片任务共同持有，最后一个任务结束后才回到 `Idle`
//! 2. **单张模式**：只有一张图片时按阶段上报详细进度
//! 3. **分批处理**：每批最多 `C` 张并发，整批完成后再开始下一批
//! 4. **容错**：单张图片失败只记录并跳过，不影响其他图片
//! 5. **结果登记**：成功的结果按完成顺序写入登记表
//!
//! ## 顺序保证
//!
//! - 批与批之间严格串行：第 i+1 批不会在第 i 批全部结束前开始
//! - 同一批内不保证顺序，登记表中的顺序即完成顺序
//! - 运行被中途丢弃时，本批尚未完成的任务随之取消，不会写入下一次运行的登记表

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::WatermarkEngine;
use crate::models::{RunState, RunSummary, SourceFile};
use crate::services::progress::percent_of;
use crate::services::{ProgressEvent, ProgressReporter, ProgressTracker, ResultRegistry};
use crate::utils::logging;
use crate::workflow::{ItemCtx, ItemOutcome, RestoreFlow, SkipReason};

pub const STATUS_COMPLETE_SINGLE: &str = "Restoration Complete!";
pub const STATUS_SKIPPED_SINGLE: &str = "Restoration Skipped (0 of 1 restored)";
pub const STATUS_FAILED_SINGLE: &str = "Restoration Failed (0 of 1 restored)";

/// 批量还原调度器
///
/// 运行状态由实例持有（不是全局变量），用互斥锁保证"同一时间只有一个批次"。
pub struct BatchScheduler {
    flow: Arc<RestoreFlow>,
    registry: Arc<ResultRegistry>,
    progress: Arc<ProgressTracker>,
    state: Arc<Mutex<RunState>>,
    concurrency_limit: usize,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct ChunkResult {
    restored: usize,
    skipped: usize,
}

/// 批量运行中所有任务共享的状态
struct BatchShared {
    flow: Arc<RestoreFlow>,
    registry: Arc<ResultRegistry>,
    progress: Arc<ProgressTracker>,
    finished: AtomicUsize,
    restored: AtomicUsize,
    total: usize,
}

impl BatchScheduler {
    pub fn new(
        engine: Arc<dyn WatermarkEngine>,
        config: &Config,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            flow: Arc::new(RestoreFlow::new(engine, config)),
            registry: Arc::new(ResultRegistry::new()),
            progress: Arc::new(ProgressTracker::new(reporter)),
            state: Arc::new(Mutex::new(RunState::Idle)),
            concurrency_limit: config.max_concurrent_images.max(1),
        }
    }

    pub fn registry(&self) -> Arc<ResultRegistry> {
        self.registry.clone()
    }

    pub fn progress(&self) -> ProgressEvent {
        self.progress.snapshot()
    }

    pub fn state(&self) -> RunState {
        *lock_state(&self.state)
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// 运行一个批次
    ///
    /// # 返回
    /// - 已有批次在运行时返回 `ConcurrencyGuardRejection`，登记表不受影响
    /// - 单张图片的错误不会出现在这里，只体现在 `skipped_or_failed` 中
    pub async fn run(&self, files: Vec<SourceFile>) -> AppResult<RunSummary> {
        if files.is_empty() {
            warn!("⚠️ 没有提交任何文件");
            return Ok(RunSummary::default());
        }

        let guard = Arc::new(RunGuard::acquire(&self.state)?);

        self.registry.clear();

        let summary = if files.len() == 1 {
            self.run_single(files).await
        } else {
            self.run_batch(files, &guard).await?
        };

        guard.complete();
        logging::print_run_summary(&summary);
        Ok(summary)
    }

    /// 显式重置：清空结果和进度
    ///
    /// 不会中断正在运行的批次；运行中调用时不做任何事并返回 `false`。
    pub fn reset(&self) -> bool {
        if self.state() == RunState::Processing {
            warn!("⚠️ 批次正在运行，忽略重置请求");
            return false;
        }
        self.registry.clear();
        self.progress.reset();
        info!("🔄 已重置");
        true
    }

    /// 单张模式：同步走完解码 → 去水印 → 登记，按阶段上报进度
    async fn run_single(&self, files: Vec<SourceFile>) -> RunSummary {
        let mut summary = RunSummary {
            total_submitted: 1,
            ..Default::default()
        };
        let Some(file) = files.into_iter().next() else {
            return summary;
        };
        let ctx = ItemCtx::new(0, 1, file.name.clone());

        self.progress.begin(format!("Restoring {}...", file.name));

        match self.flow.run_single(&file, &ctx, &self.progress).await {
            Ok(ItemOutcome::Restored(result)) => {
                self.registry.append(result);
                summary.completed = 1;
                self.progress.update(100, STATUS_COMPLETE_SINGLE);
                info!("{} ✓ 还原完成", ctx);
            }
            Ok(ItemOutcome::Skipped(reason)) => {
                summary.skipped_or_failed = 1;
                log_skip(&ctx, &reason);
                self.progress.update(100, STATUS_SKIPPED_SINGLE);
            }
            Err(e) => {
                summary.skipped_or_failed = 1;
                log_failure(&ctx, &e);
                self.progress.update(100, STATUS_FAILED_SINGLE);
            }
        }

        summary
    }

    /// 批量模式：分批处理所有图片
    async fn run_batch(
        &self,
        files: Vec<SourceFile>,
        guard: &Arc<RunGuard>,
    ) -> AppResult<RunSummary> {
        let total = files.len();
        let limit = self.concurrency_limit;
        let semaphore = Arc::new(Semaphore::new(limit));
        let shared = Arc::new(BatchShared {
            flow: self.flow.clone(),
            registry: self.registry.clone(),
            progress: self.progress.clone(),
            finished: AtomicUsize::new(0),
            restored: AtomicUsize::new(0),
            total,
        });

        let mut summary = RunSummary {
            total_submitted: total,
            ..Default::default()
        };

        logging::log_files_loaded(total, limit);
        self.progress.begin(format!("Batch Restoration (0/{total})..."));

        let total_chunks = total.div_ceil(limit);
        for (chunk_index, chunk) in files.chunks(limit).enumerate() {
            let chunk_start = chunk_index * limit;
            let chunk_num = chunk_index + 1;

            logging::log_chunk_start(
                chunk_num,
                total_chunks,
                chunk_start + 1,
                chunk_start + chunk.len(),
                total,
            );

            // 处理本批，整批结束后才进入下一批
            let result = self
                .process_chunk(chunk, chunk_start, &semaphore, &shared, guard)
                .await?;

            summary.completed += result.restored;
            summary.skipped_or_failed += result.skipped;

            logging::log_chunk_complete(
                chunk_num,
                result.restored,
                result.restored + result.skipped,
            );
        }

        self.progress.update(
            100,
            format!(
                "Vault Update Complete! ({} of {} restored)",
                summary.completed, total
            ),
        );

        Ok(summary)
    }

    /// 处理单个批次
    ///
    /// 任务放在 `JoinSet` 中：本函数的 future 被丢弃时，尚未完成的任务一并取消。
    /// 每个任务还持有一份运行守卫，状态要等最后一个任务真正结束才会回到 `Idle`。
    async fn process_chunk(
        &self,
        chunk: &[SourceFile],
        chunk_start: usize,
        semaphore: &Arc<Semaphore>,
        shared: &Arc<BatchShared>,
        guard: &Arc<RunGuard>,
    ) -> AppResult<ChunkResult> {
        let mut tasks = JoinSet::new();

        // 为本批创建并发任务
        for (offset, file) in chunk.iter().enumerate() {
            let ctx = ItemCtx::new(chunk_start + offset, shared.total, file.name.clone());
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AppError::Other(format!("并发许可获取失败: {e}")))?;

            let file = file.clone();
            let shared = shared.clone();
            let guard = guard.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let _guard = guard;
                process_item(&shared, &file, &ctx).await
            });
        }

        // 等待本批所有任务完成
        let mut result = ChunkResult::default();
        while let Some(outcome) = tasks.join_next().await {
            match outcome {
                Ok(true) => result.restored += 1,
                Ok(false) => result.skipped += 1,
                Err(e) => {
                    error!("第 {} 张起的批次中有任务执行失败: {}", chunk_start + 1, e);
                    result.skipped += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 处理一张图片并上报进度
///
/// 这里是单张图片错误的边界：解码和引擎错误在此记录并转换为跳过。
async fn process_item(shared: &BatchShared, file: &SourceFile, ctx: &ItemCtx) -> bool {
    let restored = match shared.flow.run(file, ctx).await {
        Ok(ItemOutcome::Restored(result)) => {
            let appended = shared.registry.append(result);
            if appended {
                debug!("{} ✓ 已登记", ctx);
            }
            appended
        }
        Ok(ItemOutcome::Skipped(reason)) => {
            log_skip(ctx, &reason);
            false
        }
        Err(e) => {
            log_failure(ctx, &e);
            false
        }
    };

    let restored_count = if restored {
        shared.restored.fetch_add(1, Ordering::SeqCst) + 1
    } else {
        shared.restored.load(Ordering::SeqCst)
    };
    let finished = shared.finished.fetch_add(1, Ordering::SeqCst) + 1;

    shared.progress.update(
        percent_of(finished, shared.total),
        format!(
            "Batch Processing ({}/{})... {} restored",
            finished, shared.total, restored_count
        ),
    );

    restored
}

fn log_skip(ctx: &ItemCtx, reason: &SkipReason) {
    match reason {
        SkipReason::NotAnImage { mime_type } => {
            warn!("{} ⚠️ 不是图片 ({})，已跳过", ctx, mime_type);
        }
    }
}

/// 单张图片级别的错误按跳过处理；其他错误不应出现在这里，单独标出便于排查
fn log_failure(ctx: &ItemCtx, e: &AppError) {
    if e.is_item_level() {
        error!("{} ❌ 处理失败，已跳过: {}", ctx, e);
    } else {
        error!("{} ❌ 非预期错误，计为失败: {}", ctx, e);
    }
}

fn lock_state(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// 运行守卫
///
/// 创建时把状态从 `Idle` 切到 `Processing`；正常结束时先标记为 `Complete`，
/// 离开作用域时（包括出错、panic 和运行被丢弃）回到 `Idle`。
struct RunGuard {
    state: Arc<Mutex<RunState>>,
}

impl RunGuard {
    fn acquire(state: &Arc<Mutex<RunState>>) -> AppResult<Self> {
        let mut current = lock_state(state);
        if *current != RunState::Idle {
            warn!("⚠️ 已有批次正在运行 ({:?})，拒绝启动", *current);
            return Err(AppError::ConcurrencyGuardRejection);
        }
        *current = RunState::Processing;
        debug!("运行状态: Processing");

        Ok(Self {
            state: state.clone(),
        })
    }

    fn complete(&self) {
        *lock_state(&self.state) = RunState::Complete;
        debug!("运行状态: Complete");
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        *lock_state(&self.state) = RunState::Idle;
        debug!("运行状态: Idle");
    }
}
