//! 阅卷上下文
//!
//! 封装"我正在批改哪场考试的第几个学生"这一信息

use std::fmt::Display;

/// 阅卷上下文（主要用于日志前缀）
#[derive(Debug, Clone)]
pub struct GradingCtx {
    /// 考试标识
    pub exam_id: String,

    /// 学生序号（从1开始，仅用于日志显示）
    pub student_index: usize,

    /// 学生姓名
    pub student_name: String,
}

impl GradingCtx {
    pub fn new(exam_id: impl Into<String>, student_index: usize, student_name: impl Into<String>) -> Self {
        Self {
            exam_id: exam_id.into(),
            student_index,
            student_name: student_name.into(),
        }
    }
}

impl Display for GradingCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[试卷 {} 学生#{} {}]",
            self.exam_id, self.student_index, self.student_name
        )
    }
}
