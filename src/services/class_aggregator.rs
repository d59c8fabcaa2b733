//! 班级统计
//!
//! 每次调用都从完整的成绩列表重新计算，不缓存任何状态

use crate::error::{AppError, AppResult, GradingError};
use crate::models::{ClassSummary, ScoreDistribution, ScoringResult, TopicFrequency, PASS_THRESHOLD};

/// 计算班级统计，空列表返回 `GradingError::EmptyCollection`
pub fn summarize(results: &[ScoringResult]) -> AppResult<ClassSummary> {
    if results.is_empty() {
        return Err(AppError::Grading(GradingError::EmptyCollection));
    }

    let mut distribution = ScoreDistribution::default();
    let mut topic_error_frequency: Vec<TopicFrequency> = Vec::new();
    let mut below_threshold = Vec::new();
    let mut sum = 0u64;
    let mut min = u8::MAX;
    let mut max = u8::MIN;

    for result in results {
        let score = result.final_score;
        sum += u64::from(score);
        min = min.min(score);
        max = max.max(score);
        distribution.record(score);

        if !result.is_passing(PASS_THRESHOLD) {
            below_threshold.push(result.student_name.clone());
        }

        if let Some(topic) = &result.weakest_topic {
            match topic_error_frequency.iter_mut().find(|tf| &tf.topic == topic) {
                Some(tf) => tf.count += 1,
                None => topic_error_frequency.push(TopicFrequency {
                    topic: topic.clone(),
                    count: 1,
                }),
            }
        }
    }

    // 稳定排序，次数相同保持首次出现顺序
    topic_error_frequency.sort_by(|a, b| b.count.cmp(&a.count));

    let student_count = results.len();
    let mean = round_one_decimal(sum as f64 / student_count as f64);
    let pass_count = student_count - below_threshold.len();

    tracing::debug!(
        "班级统计: {} 人, 平均 {:.1}, 及格 {} 人",
        student_count,
        mean,
        pass_count
    );

    Ok(ClassSummary {
        student_count,
        mean,
        min,
        max,
        pass_count,
        fail_count: below_threshold.len(),
        distribution,
        topic_error_frequency,
        below_threshold,
    })
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::Recovery;

    fn result(name: &str, score: u8, weakest: Option<&str>) -> ScoringResult {
        ScoringResult {
            student_name: name.to_string(),
            final_score: score,
            correct_count: 0,
            earned_weight: f64::from(score),
            total_weight: 100.0,
            per_item_detail: Vec::new(),
            weakest_topic: weakest.map(str::to_string),
            feedback: String::new(),
            degenerate_key: false,
            recovery: Recovery::Direct,
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn test_scenario_e() {
        let results = vec![
            result("Ani", 90, None),
            result("Budi", 60, Some("Genetics")),
            result("Citra", 40, Some("Cells")),
        ];
        let summary = summarize(&results).unwrap();

        assert_eq!(summary.student_count, 3);
        assert_eq!(summary.mean, 63.3);
        assert_eq!(summary.min, 40);
        assert_eq!(summary.max, 90);
        assert_eq!(
            summary.distribution,
            ScoreDistribution {
                excellent: 1,
                good: 0,
                fair: 1,
                low: 1
            }
        );
        assert_eq!(summary.pass_count, 1);
        assert_eq!(summary.fail_count, 2);
        assert_eq!(summary.below_threshold, vec!["Budi", "Citra"]);
    }

    #[test]
    fn test_buckets_sum_to_count() {
        let results: Vec<ScoringResult> = [0u8, 49, 50, 74, 75, 89, 90, 100]
            .iter()
            .map(|s| result("x", *s, None))
            .collect();
        let summary = summarize(&results).unwrap();

        assert_eq!(summary.distribution.total(), summary.student_count);
        assert_eq!(summary.distribution.excellent, 2);
        assert_eq!(summary.distribution.good, 2);
        assert_eq!(summary.distribution.fair, 2);
        assert_eq!(summary.distribution.low, 2);
        assert_eq!(summary.pass_count, 4);
    }

    #[test]
    fn test_topic_frequency_excludes_none() {
        let results = vec![
            result("a", 50, Some("Sel")),
            result("b", 60, Some("Genetika")),
            result("c", 70, Some("Genetika")),
            result("d", 100, None),
            result("e", 40, Some("Ekologi")),
        ];
        let summary = summarize(&results).unwrap();

        let topics: Vec<(&str, usize)> = summary
            .topic_error_frequency
            .iter()
            .map(|tf| (tf.topic.as_str(), tf.count))
            .collect();
        assert_eq!(topics, vec![("Genetika", 2), ("Sel", 1), ("Ekologi", 1)]);
        assert_eq!(summary.topic_count("none"), 0);
    }

    #[test]
    fn test_empty_collection_rejected() {
        let err = summarize(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyCollection);
    }

    #[test]
    fn test_recomputed_each_call() {
        let mut results = vec![result("a", 80, None)];
        assert_eq!(summarize(&results).unwrap().mean, 80.0);

        results.push(result("b", 70, Some("Sel")));
        let summary = summarize(&results).unwrap();
        assert_eq!(summary.mean, 75.0);
        assert_eq!(summary.topic_count("Sel"), 1);
    }
}
