use serde::{Serialize, Serializer};

use crate::models::choice::Choice;
use crate::models::extraction::{Anomaly, Recovery};

/// 没有错题时的薄弱知识点占位
pub const NO_WEAK_TOPIC: &str = "none";

/// 评分后的单题明细
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnswerItem {
    pub number: u32,
    pub choice: Choice,
    /// 由评分引擎计算，永远不来自模型输出
    pub is_correct: bool,
    /// 标准答案中没有该题号时为 false（不参与计分，仅作展示）
    pub in_master_key: bool,
}

/// 单个学生的评分结果
///
/// 创建后不可修改；同样的输入总是得到完全相同的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    pub student_name: String,
    /// 0–100
    pub final_score: u8,
    pub correct_count: u32,
    pub earned_weight: f64,
    pub total_weight: f64,
    /// 按题号升序
    pub per_item_detail: Vec<StudentAnswerItem>,
    #[serde(serialize_with = "serialize_weakest_topic")]
    pub weakest_topic: Option<String>,
    pub feedback: String,
    /// 标准答案总分为 0，分数无意义
    pub degenerate_key: bool,
    pub recovery: Recovery,
    pub anomalies: Vec<Anomaly>,
}

impl ScoringResult {
    /// 薄弱知识点，没有错题时为 `"none"`
    pub fn weakest_topic_label(&self) -> &str {
        self.weakest_topic.as_deref().unwrap_or(NO_WEAK_TOPIC)
    }

    /// 失分 = 总分 - 得分
    pub fn lost_weight(&self) -> f64 {
        self.total_weight - self.earned_weight
    }

    pub fn is_passing(&self, threshold: u8) -> bool {
        self.final_score >= threshold
    }

    /// 是否需要老师人工复核
    pub fn needs_review(&self) -> bool {
        self.degenerate_key || self.recovery == Recovery::Failed || !self.anomalies.is_empty()
    }
}

fn serialize_weakest_topic<S>(topic: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(topic.as_deref().unwrap_or(NO_WEAK_TOPIC))
}
