use crate::error::{AppError, AppResult, FileError};
use crate::models::master_key::MasterKey;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// 标准答案文件（TOML）
///
/// 既是每场考试的缓存，也是老师人工修正标准答案的入口
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterKeyFile {
    pub exam_id: String,
    /// 生成时间
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub items: MasterKey,
}

impl MasterKeyFile {
    pub fn new(exam_id: impl Into<String>, items: MasterKey) -> Self {
        Self {
            exam_id: exam_id.into(),
            created_at: Some(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
            items,
        }
    }
}

/// 从 TOML 文件加载标准答案
pub async fn load_master_key(path: &Path) -> AppResult<MasterKeyFile> {
    if !path.exists() {
        return Err(AppError::File(FileError::NotFound {
            path: path.display().to_string(),
        }));
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let file: MasterKeyFile = toml::from_str(&content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    })?;

    tracing::info!(
        "成功加载标准答案: {} ({} 题)",
        path.display(),
        file.items.len()
    );

    Ok(file)
}

/// 保存标准答案到 TOML 文件
pub async fn save_master_key(path: &Path, file: &MasterKeyFile) -> AppResult<()> {
    let content = toml::to_string_pretty(file)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
    }

    fs::write(path, content)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

    tracing::info!("标准答案已保存至: {}", path.display());
    Ok(())
}
