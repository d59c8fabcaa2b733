use crate::error::{AppError, AppResult, FileError};
use crate::models::image::{mime_from_path, ImageInput};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 一个学生的答卷目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentSubmission {
    /// 学生姓名（目录名）
    pub name: String,
    pub dir: PathBuf,
}

/// 加载目录下所有图片（按文件名排序，即页码顺序）
pub async fn load_images_in_dir(dir: &Path) -> AppResult<Vec<ImageInput>> {
    if !dir.is_dir() {
        return Err(AppError::File(FileError::DirectoryNotFound {
            path: dir.display().to_string(),
        }));
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| AppError::file_read_failed(dir.display().to_string(), e))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && mime_from_path(&path).is_some() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut images = Vec::with_capacity(paths.len());
    for path in &paths {
        tracing::debug!("正在加载图片: {}", path.display());
        images.push(ImageInput::from_path(path).await?);
    }

    Ok(images)
}

/// 扫描学生目录：每个子目录代表一个学生
pub async fn scan_student_dirs(root: &Path) -> AppResult<Vec<StudentSubmission>> {
    if !root.is_dir() {
        return Err(AppError::File(FileError::DirectoryNotFound {
            path: root.display().to_string(),
        }));
    }

    let mut submissions = Vec::new();
    let mut entries = fs::read_dir(root)
        .await
        .map_err(|e| AppError::file_read_failed(root.display().to_string(), e))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().trim().to_string();
        if name.is_empty() || name.starts_with('.') {
            continue;
        }
        submissions.push(StudentSubmission { name, dir: path });
    }

    submissions.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(submissions)
}
