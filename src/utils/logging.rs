//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::{AppError, AppResult};
use crate::models::ClassSummary;

/// 初始化 tracing 订阅器
///
/// 优先使用 `RUST_LOG`，否则默认 `info`（详细模式下为 `debug`）。
/// 重复调用不会报错
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件（写入带时间的文件头）
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n阅卷日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );

    if let Some(parent) = Path::new(log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
    }

    fs::write(log_file_path, log_header)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(exam_id: &str, models: &[String], max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量阅卷模式");
    info!("📝 考试: {}", exam_id);
    info!("🤖 模型: {}", models.join(" → "));
    info!("📊 最大并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录学生加载信息
pub fn log_students_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 名学生的答卷", total);
    info!("📋 最多同时批改 {} 份\n", max_concurrent);
}

/// 记录班级统计
pub fn log_summary(summary: &ClassSummary) {
    info!("\n{}", "─".repeat(60));
    info!("📈 班级统计 ({} 人)", summary.student_count);
    info!(
        "平均分: {:.1} | 最高: {} | 最低: {}",
        summary.mean, summary.max, summary.min
    );
    info!(
        "及格: {} | 不及格: {}",
        summary.pass_count, summary.fail_count
    );
    info!(
        "分数段: 90-100: {} | 75-89: {} | 50-74: {} | <50: {}",
        summary.distribution.excellent,
        summary.distribution.good,
        summary.distribution.fair,
        summary.distribution.low
    );
    for tf in summary.topic_error_frequency.iter().take(5) {
        info!("薄弱知识点: {} ({} 人)", tf.topic, tf.count);
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(success: usize, failed: usize, total: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部批改完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abc", 5), "abc");
        assert_eq!(truncate_text("标准答案解析", 4), "标准答案...");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false);
        init(true);
    }

    #[test]
    fn test_init_log_file_writes_header() {
        let dir = std::env::temp_dir().join(format!("smart_grader_log_{}", std::process::id()));
        let path = dir.join("run.log");
        let path_str = path.to_string_lossy().to_string();

        init_log_file(&path_str).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("阅卷日志"));

        let _ = fs::remove_dir_all(&dir);
    }
}
