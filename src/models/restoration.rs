use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// 单张图片的还原结果
///
/// 创建后不再修改；`source_index` 是对应源文件在提交列表中的位置，用于去重。
#[derive(Clone)]
pub struct RestorationResult {
    pub source_index: usize,
    pub original_name: String,
    /// PNG 编码后的结果
    pub binary_data: Arc<[u8]>,
}

impl RestorationResult {
    pub fn new(
        source_index: usize,
        original_name: impl Into<String>,
        binary_data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            source_index,
            original_name: original_name.into(),
            binary_data: binary_data.into(),
        }
    }
}

impl fmt::Debug for RestorationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestorationResult")
            .field("source_index", &self.source_index)
            .field("original_name", &self.original_name)
            .field("bytes", &self.binary_data.len())
            .finish()
    }
}

/// 一次运行的汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_submitted: usize,
    pub completed: usize,
    pub skipped_or_failed: usize,
}

/// 运行状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Processing,
    Complete,
}

/// 水印位置信息（仅用于展示）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatermarkInfo {
    /// 水印边长（像素）
    pub size: u32,
    pub margin_right: u32,
    pub margin_bottom: u32,
}

impl fmt::Display for WatermarkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} Neural Map", self.size, self.size)
    }
}
