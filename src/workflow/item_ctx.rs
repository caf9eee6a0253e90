//! 图片处理上下文
//!
//! 封装"我正在处理本批次第几张图片"这一信息

use std::fmt::Display;

/// 图片处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 在提交列表中的位置（从0开始，用于结果去重）
    pub source_index: usize,

    /// 提交总数（仅用于日志显示）
    pub total: usize,

    /// 原始文件名
    pub name: String,
}

impl ItemCtx {
    pub fn new(source_index: usize, total: usize, name: impl Into<String>) -> Self {
        Self {
            source_index,
            total,
            name: name.into(),
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[图片 {}/{} {}]",
            self.source_index + 1,
            self.total,
            crate::utils::logging::truncate_text(&self.name, 40)
        )
    }
}
