//! 警告写入服务 - 业务能力层
//!
//! 只负责"写 warn.txt"能力，不关心流程

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::ScoringResult;

/// 警告写入服务
///
/// 职责：
/// - 把需要老师人工复核的学生（解析异常、答卷无法识别、标准答案总分为 0）追加到 warn.txt
/// - 把无法解析的模型原文保存下来，供人工编辑
pub struct WarnWriter {
    warn_file_path: PathBuf,
}

impl WarnWriter {
    pub fn new() -> Self {
        Self {
            warn_file_path: PathBuf::from("warn.txt"),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.warn_file_path
    }

    /// 追加一条复核记录
    pub fn write_review(&self, prefix: &str, result: &ScoringResult) -> AppResult<()> {
        debug!(
            "写入复核记录: {} | 异常 {} 条",
            result.student_name,
            result.anomalies.len()
        );

        let anomalies: Vec<String> = result.anomalies.iter().map(|a| a.to_string()).collect();
        let mut warn_msg = format!(
            "{} 学生 {} | 成绩 {} | 需要复核",
            prefix, result.student_name, result.final_score
        );
        if result.degenerate_key {
            warn_msg.push_str(" | 标准答案总分为 0");
        }
        if !anomalies.is_empty() {
            warn_msg.push_str(" | ");
            warn_msg.push_str(&anomalies.join("; "));
        }
        self.append_line(&warn_msg)
    }

    /// 追加一条批改失败记录
    pub fn write_failure(&self, prefix: &str, student_name: &str, reason: &str) -> AppResult<()> {
        debug!("写入失败记录: {} | {}", student_name, reason);
        self.append_line(&format!(
            "{} 学生 {} | 批改失败 | {}",
            prefix, student_name, reason
        ))
    }

    fn append_line(&self, line: &str) -> AppResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)
            .map_err(|e| AppError::file_write_failed(self.warn_file_path.display().to_string(), e))?;

        writeln!(file, "{}", line)
            .map_err(|e| AppError::file_write_failed(self.warn_file_path.display().to_string(), e))?;

        Ok(())
    }
}

impl Default for WarnWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// 保存无法解析的模型原文，返回写入的路径（`<目标文件>.raw.txt`）
pub fn write_raw_output(target: &Path, raw: &str) -> AppResult<PathBuf> {
    let mut raw_path = target.as_os_str().to_owned();
    raw_path.push(".raw.txt");
    let raw_path = PathBuf::from(raw_path);

    if let Some(parent) = raw_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
    }

    std::fs::write(&raw_path, raw)
        .map_err(|e| AppError::file_write_failed(raw_path.display().to_string(), e))?;

    Ok(raw_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Choice, MasterKey, MasterKeyItem, Transcript};
    use crate::services::scoring_engine::score_transcript;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("smart_grader_warn_{}_{}", tag, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_write_review_appends() {
        let dir = scratch_dir("review");
        let writer = WarnWriter::with_path(dir.join("warn.txt"));

        let key = MasterKey::try_from(vec![MasterKeyItem::new(1, Choice::A, "Sel", 1.0)]).unwrap();
        let result = score_transcript(&key, &Transcript::unreadable(), "Ani");

        writer.write_review("[学生 1]", &result).unwrap();
        writer.write_failure("[学生 2]", "Budi", "推理服务不可用").unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("Budi | 批改失败"));
        assert!(content.contains("答卷内容无法解析"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_write_raw_output() {
        let dir = scratch_dir("raw");
        let path = write_raw_output(&dir.join("master_key.toml"), "1. A\n2. B").unwrap();

        assert!(path.to_string_lossy().ends_with("master_key.toml.raw.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1. A\n2. B");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
