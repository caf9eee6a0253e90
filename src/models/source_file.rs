use std::fmt;
use std::sync::Arc;

/// 图片类 MIME 前缀
const IMAGE_MIME_PREFIX: &str = "image/";

/// 用户提交的原始文件
///
/// 提交后不可变；字节内容用 `Arc` 共享，克隆到并发任务中不会复制数据。
#[derive(Clone)]
pub struct SourceFile {
    /// 原始文件名
    pub name: String,
    /// 声明的 MIME 类型
    pub mime_type: String,
    /// 原始字节
    pub data: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// 声明的类型是否为图片
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with(IMAGE_MIME_PREFIX)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}
