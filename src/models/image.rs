use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// 默认 MIME 类型（无法从扩展名推断时）
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// 一张待识别的图片
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageInput {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// 从文件读取图片，MIME 类型由扩展名推断
    pub async fn from_path(path: &Path) -> AppResult<Self> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Ok(Self::new(mime_from_path(path).unwrap_or(DEFAULT_IMAGE_MIME), data))
    }

    /// 编码为 data URL，供 Vision API 使用
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

impl std::fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageInput")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// 根据扩展名推断图片 MIME 类型，不是图片返回 None
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}
