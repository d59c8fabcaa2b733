//! 模型输出解析结果
//!
//! 解析器不会在格式错误时抛出异常或填充默认值，而是返回 `ParseResult::MalformedInput`，
//! 由调用方决定是交给人工修正还是降级处理

use serde::{Deserialize, Serialize};

/// 解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult<T> {
    /// 解析成功
    Ok(T),
    /// 无法解析，附带模型原文
    MalformedInput(String),
}

impl<T> ParseResult<T> {
    pub fn is_malformed(&self) -> bool {
        matches!(self, ParseResult::MalformedInput(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ParseResult::Ok(value) => Some(value),
            ParseResult::MalformedInput(_) => None,
        }
    }
}

/// JSON 是通过哪一步恢复出来的
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// 直接解析（可能剥离了代码块）
    Direct,
    /// 从文本中截取第一个平衡的 `{...}` / `[...]`
    Substring,
    /// 完全失败
    Failed,
}

/// 解析或评分过程中发现的异常条目
///
/// 异常不会中断评分，但会随结果一起保留，供老师核对
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// 数组元素不是对象
    NotAnObject { position: usize },
    /// 题号缺失或不是正整数
    InvalidNumber { position: usize, raw: String },
    /// 题号重复，只保留第一次出现
    DuplicateNumber { number: u32 },
    /// 选项无法识别
    InvalidChoice { number: u32, raw: String },
    /// 分值非法，已使用默认分值
    InvalidWeight { number: u32, raw: String },
    /// 学生作答中有、标准答案中没有的题号
    UnknownItem { number: u32 },
    /// 标准答案中有、学生作答中没有的题号（按未作答处理）
    MissingAnswer { number: u32 },
    /// 学生答卷完全无法解析
    UnreadableTranscript,
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::NotAnObject { position } => write!(f, "第 {} 个元素不是对象", position + 1),
            Anomaly::InvalidNumber { position, raw } => {
                write!(f, "第 {} 个元素题号无效: {}", position + 1, raw)
            }
            Anomaly::DuplicateNumber { number } => write!(f, "题号 {} 重复", number),
            Anomaly::InvalidChoice { number, raw } => {
                write!(f, "第 {} 题选项无法识别: {}", number, raw)
            }
            Anomaly::InvalidWeight { number, raw } => {
                write!(f, "第 {} 题分值无效: {}", number, raw)
            }
            Anomaly::UnknownItem { number } => write!(f, "第 {} 题不在标准答案中", number),
            Anomaly::MissingAnswer { number } => write!(f, "第 {} 题未识别到作答", number),
            Anomaly::UnreadableTranscript => write!(f, "答卷内容无法解析"),
        }
    }
}
