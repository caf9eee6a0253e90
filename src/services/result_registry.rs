//! 结果登记表 - 业务能力层
//!
//! 单次运行中所有还原结果的唯一来源，单张下载和打包下载都从这里读取

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::models::RestorationResult;

/// 结果登记表
///
/// 职责：
/// - 按完成顺序追加结果
/// - 同一源文件只登记一次
/// - 追加在锁内一次完成，多个任务同时追加不会丢失或交错
/// - 不支持单条删除，只能整体清空
#[derive(Debug, Default)]
pub struct ResultRegistry {
    entries: RwLock<Vec<RestorationResult>>,
}

impl ResultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空所有结果
    pub fn clear(&self) {
        let mut entries = self.write();
        debug!("清空结果登记表 ({} 条)", entries.len());
        entries.clear();
    }

    /// 追加结果
    ///
    /// # 返回
    /// 同一源文件已经登记过时返回 `false`，不做任何修改
    pub fn append(&self, result: RestorationResult) -> bool {
        let mut entries = self.write();
        if entries
            .iter()
            .any(|existing| existing.source_index == result.source_index)
        {
            warn!(
                "⚠️ 重复的还原结果被忽略: #{} {}",
                result.source_index, result.original_name
            );
            return false;
        }
        entries.push(result);
        true
    }

    /// 按登记顺序返回所有结果的快照
    pub fn all(&self) -> Vec<RestorationResult> {
        self.read().clone()
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // 持锁期间不会 panic，锁中毒时数据仍然完整，直接取回即可
    fn read(&self) -> RwLockReadGuard<'_, Vec<RestorationResult>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<RestorationResult>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
