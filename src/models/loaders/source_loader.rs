use crate::error::{AppError, AppResult, FileError};
use crate::models::SourceFile;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 无法识别扩展名时使用的类型
const FALLBACK_MIME: &str = "application/octet-stream";

/// 根据扩展名推断声明的 MIME 类型
///
/// 图片格式交给 `image` 识别；少数常见的非图片类型单独列出，其余一律视为二进制流。
pub fn mime_type_for_path(path: &Path) -> String {
    let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
        return FALLBACK_MIME.to_string();
    };

    if let Some(format) = ImageFormat::from_extension(ext) {
        return format.to_mime_type().to_string();
    }

    match ext.to_ascii_lowercase().as_str() {
        "txt" | "md" | "log" => "text/plain",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        _ => FALLBACK_MIME,
    }
    .to_string()
}

/// 从磁盘读取单个源文件
pub async fn load_source_file(path: &Path) -> AppResult<SourceFile> {
    let data = fs::read(path)
        .await
        .map_err(|e| AppError::file_read_failed(path, e))?;

    let name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    Ok(SourceFile::new(name, mime_type_for_path(path), data))
}

/// 从文件夹中加载所有文件
///
/// 按文件名排序，保证提交顺序稳定；子目录被忽略，读取失败的文件记录后跳过。
pub async fn load_all_source_files(folder_path: &str) -> AppResult<Vec<SourceFile>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound { path: folder }.into());
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file_read_failed(&folder, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::file_read_failed(&folder, e))?
    {
        let path = entry.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        tracing::debug!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_source_file(&path).await {
            Ok(file) => files.push(file),
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(files)
}
