use std::path::PathBuf;

use thiserror::Error;

/// 应用程序错误类型
///
/// 单张图片级别的错误（`Decode` / `Engine`）在任务边界被捕获并转换为跳过；
/// `Packaging` 与 `ConcurrencyGuardRejection` 属于整体操作的前置条件，会直接返回给调用方。
#[derive(Debug, Error)]
pub enum AppError {
    /// 图片解码错误
    #[error("图片解码错误: {0}")]
    Decode(#[from] DecodeError),
    /// 还原引擎错误
    #[error("还原引擎错误: {0}")]
    Engine(#[from] EngineError),
    /// 打包错误
    #[error("打包错误: {0}")]
    Packaging(#[from] PackagingError),
    /// 已有批次在运行
    #[error("已有批次正在处理，拒绝启动新的批次")]
    ConcurrencyGuardRejection,
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// 图片解码错误
#[derive(Debug, Error)]
pub enum DecodeError {
    /// 文件内容为空
    #[error("文件内容为空: {name}")]
    EmptyInput { name: String },
    /// 字节流无法解析为图片
    #[error("无法解析图片 ({name}): {source}")]
    InvalidImage {
        name: String,
        #[source]
        source: image::ImageError,
    },
    /// 解码任务异常退出
    #[error("解码任务失败 ({name}): {source}")]
    TaskFailed {
        name: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// 还原引擎错误
#[derive(Debug, Error)]
pub enum EngineError {
    /// 引擎资源加载失败
    #[error("无法加载引擎资源 {}: {source}", .path.display())]
    AssetLoadFailed {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 资源内容不符合要求
    #[error("引擎资源无效 ({}): {reason}", .path.display())]
    InvalidAsset { path: PathBuf, reason: String },
    /// 引擎调用失败
    #[error("去水印失败 ({name}): {reason}")]
    RestoreFailed { name: String, reason: String },
    /// 引擎调用超时
    #[error("去水印超时 ({name}): 超过 {secs} 秒")]
    Timeout { name: String, secs: u64 },
    /// 结果编码失败
    #[error("结果编码失败 ({name}): {source}")]
    EncodeFailed {
        name: String,
        #[source]
        source: image::ImageError,
    },
    /// 还原或编码的后台任务异常退出
    #[error("后台任务失败 ({name}): {source}")]
    TaskFailed {
        name: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// 打包错误
#[derive(Debug, Error)]
pub enum PackagingError {
    /// 没有可打包的结果
    #[error("没有可打包的结果")]
    EmptyInput,
    /// 压缩包写入失败
    #[error("压缩包写入失败: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// 写入条目数据失败
    #[error("写入条目失败 ({entry}): {source}")]
    EntryWriteFailed {
        entry: String,
        #[source]
        source: std::io::Error,
    },
    /// 打包任务异常退出
    #[error("打包任务失败: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 目录不存在
    #[error("目录不存在: {}", .path.display())]
    DirectoryNotFound { path: PathBuf },
    /// 读取文件失败
    #[error("读取文件失败 ({}): {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 序列化失败
    #[error("序列化失败: {0}")]
    SerializeFailed(#[from] serde_json::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置值不合法
    #[error("配置项 {key} 的值 '{value}' 不合法: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({}): {source}", .path.display())]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建引擎调用失败错误
    pub fn restore_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Engine(EngineError::RestoreFailed {
            name: name.into(),
            reason: reason.into(),
        })
    }

    /// 是否为单张图片级别的错误（可以跳过，不影响整个批次）
    pub fn is_item_level(&self) -> bool {
        matches!(self, AppError::Decode(_) | AppError::Engine(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
