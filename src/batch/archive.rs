//! # 压缩包输入
//!
//! 批处理输入可以是 zip 压缩包或目录。压缩包解压到
//! `<out_root>/_unzipped`，每次运行前清空重建。
//!
//! ## 依赖关系
//! - 被 `commands/batch.rs`、`commands/evaluate.rs` 调用
//! - 使用 `zip` 解压

use crate::error::{QhaError, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// 压缩包解压目录名
pub const EXTRACT_DIR: &str = "_unzipped";

/// 把 zip 压缩包解压到 `dest`（先删除已有内容），返回解压出的文件数
pub fn extract_zip(zip_path: &Path, dest: &Path) -> Result<usize> {
    let archive_error = |reason: String| QhaError::ArchiveError {
        path: zip_path.display().to_string(),
        reason,
    };

    let file = File::open(zip_path).map_err(|e| QhaError::FileReadError {
        path: zip_path.display().to_string(),
        source: e,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;

    if dest.exists() {
        fs::remove_dir_all(dest).map_err(|e| QhaError::FileWriteError {
            path: dest.display().to_string(),
            source: e,
        })?;
    }
    fs::create_dir_all(dest).map_err(|e| QhaError::FileWriteError {
        path: dest.display().to_string(),
        source: e,
    })?;

    archive
        .extract(dest)
        .map_err(|e| archive_error(e.to_string()))?;

    let count = (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().map(|f| f.is_file()))
        .filter(|&is_file| is_file)
        .count();
    log::debug!("Extracted {} files from {} to {}", count, zip_path.display(), dest.display());
    Ok(count)
}

/// 解析批处理输入：目录直接使用，zip 文件解压到 `extract_root/_unzipped`
pub fn resolve_input(input: &Path, extract_root: &Path) -> Result<PathBuf> {
    if input.is_dir() {
        return Ok(input.to_path_buf());
    }
    if !input.is_file() {
        return Err(QhaError::FileNotFound {
            path: input.display().to_string(),
        });
    }

    let dest = extract_root.join(EXTRACT_DIR);
    extract_zip(input, &dest)?;
    Ok(dest)
}

/// 是否按扩展名判断为 zip 文件
pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}
