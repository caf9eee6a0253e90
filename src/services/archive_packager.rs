//! 打包服务 - 业务能力层
//!
//! 只负责"把多个结果压缩成一个 zip"能力

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::PackagingError;
use crate::models::RestorationResult;

/// 结果文件名前缀
pub const RESTORED_PREFIX: &str = "restored_";

/// 压缩包文件名前缀
pub const ARCHIVE_PREFIX: &str = "gemremover_vault_";

/// 结果文件名：`restored_<原文件名>`
pub fn restored_name(original_name: &str) -> String {
    format!("{RESTORED_PREFIX}{original_name}")
}

/// 压缩包文件名：`gemremover_vault_<毫秒时间戳>.zip`
pub fn archive_name(timestamp_millis: i64) -> String {
    format!("{ARCHIVE_PREFIX}{timestamp_millis}.zip")
}

/// 打包服务
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchivePackager;

impl ArchivePackager {
    pub fn new() -> Self {
        Self
    }

    /// 将结果打包为 zip
    ///
    /// 压缩在阻塞线程池中进行。结果为空时返回 `PackagingError::EmptyInput`，调用方应提前判断。
    pub async fn pack(&self, results: &[RestorationResult]) -> Result<Vec<u8>, PackagingError> {
        if results.is_empty() {
            return Err(PackagingError::EmptyInput);
        }

        let names = entry_names(results);
        let entries: Vec<_> = names
            .into_iter()
            .zip(results.iter().map(|r| r.binary_data.clone()))
            .collect();
        let count = entries.len();

        let archive = tokio::task::spawn_blocking(move || build_archive(entries)).await??;

        info!("📦 打包完成: {} 个文件, {} 字节", count, archive.len());
        Ok(archive)
    }
}

fn build_archive(entries: Vec<(String, std::sync::Arc<[u8]>)>) -> Result<Vec<u8>, PackagingError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, data) in entries {
        debug!("写入条目: {} ({} 字节)", name, data.len());
        writer.start_file(name.as_str(), options)?;
        writer
            .write_all(&data)
            .map_err(|source| PackagingError::EntryWriteFailed {
                entry: name.clone(),
                source,
            })?;
    }

    Ok(writer.finish()?.into_inner())
}

/// 生成压缩包内的条目名
///
/// 同名文件在扩展名前追加序号：`restored_cat.png`、`restored_cat_2.png`……
fn entry_names(results: &[RestorationResult]) -> Vec<String> {
    let mut used = HashSet::new();
    let mut names = Vec::with_capacity(results.len());

    for result in results {
        let base = restored_name(&result.original_name);
        let mut candidate = base.clone();
        let mut n = 2;
        while used.contains(&candidate) {
            candidate = with_suffix(&base, n);
            n += 1;
        }
        used.insert(candidate.clone());
        names.push(candidate);
    }

    names
}

fn with_suffix(name: &str, n: usize) -> String {
    let path = Path::new(name);
    match (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|s| s.to_str()),
    ) {
        (Some(stem), Some(ext)) => format!("{stem}_{n}.{ext}"),
        _ => format!("{name}_{n}"),
    }
}
