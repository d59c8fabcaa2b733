use serde::{Deserialize, Serialize};

use crate::models::choice::Choice;
use crate::models::extraction::{Anomaly, Recovery};

/// 学生的一条原始作答（尚未评分）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAnswer {
    pub number: u32,
    pub choice: Choice,
}

impl RawAnswer {
    pub fn new(number: u32, choice: Choice) -> Self {
        Self { number, choice }
    }
}

/// 单个学生的答卷转写结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// 按原文出现顺序，题号已去重
    pub answers: Vec<RawAnswer>,
    /// 解析时发现的异常
    pub anomalies: Vec<Anomaly>,
    /// JSON 恢复方式
    pub recovery: Recovery,
}

impl Transcript {
    /// 完全无法解析时的空答卷：所有题目按未作答处理
    pub fn unreadable() -> Self {
        Self {
            answers: Vec::new(),
            anomalies: vec![Anomaly::UnreadableTranscript],
            recovery: Recovery::Failed,
        }
    }

    pub fn is_unreadable(&self) -> bool {
        self.recovery == Recovery::Failed
    }
}
