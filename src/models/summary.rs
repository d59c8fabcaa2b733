use serde::Serialize;

/// 及格线（含）
pub const PASS_THRESHOLD: u8 = 75;

/// 分数段分布
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScoreDistribution {
    /// 90–100
    #[serde(rename = "90-100")]
    pub excellent: usize,
    /// 75–89
    #[serde(rename = "75-89")]
    pub good: usize,
    /// 50–74
    #[serde(rename = "50-74")]
    pub fair: usize,
    /// <50
    #[serde(rename = "<50")]
    pub low: usize,
}

impl ScoreDistribution {
    pub fn record(&mut self, score: u8) {
        match score {
            90..=u8::MAX => self.excellent += 1,
            75..=89 => self.good += 1,
            50..=74 => self.fair += 1,
            _ => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.excellent + self.good + self.fair + self.low
    }
}

/// 某个知识点被多少学生列为薄弱点
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicFrequency {
    pub topic: String,
    pub count: usize,
}

/// 班级统计（按需计算，不持久化）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub student_count: usize,
    /// 平均分，保留一位小数
    pub mean: f64,
    pub min: u8,
    pub max: u8,
    pub pass_count: usize,
    pub fail_count: usize,
    pub distribution: ScoreDistribution,
    /// 按次数降序，次数相同按首次出现顺序
    pub topic_error_frequency: Vec<TopicFrequency>,
    /// 未达及格线的学生（按成绩列表顺序）
    pub below_threshold: Vec<String>,
}

impl ClassSummary {
    pub fn topic_count(&self, topic: &str) -> usize {
        self.topic_error_frequency
            .iter()
            .find(|tf| tf.topic == topic)
            .map(|tf| tf.count)
            .unwrap_or(0)
    }
}
