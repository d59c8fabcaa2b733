//! 评分引擎
//!
//! 确定性评分：对错、得分、薄弱知识点全部在本地重新计算，
//! 不采信模型给出的任何分数。纯函数，可并行调用

use std::collections::BTreeMap;

use crate::models::{
    Anomaly, Choice, MasterKey, RawAnswer, Recovery, ScoringResult, StudentAnswerItem,
    Transcript, PASS_THRESHOLD,
};

/// 知识点为空时的归类名
pub const UNCATEGORIZED_TOPIC: &str = "未分类";

/// 优秀反馈的分数线
const CONGRATULATE_THRESHOLD: u8 = 80;
/// 需要补救的分数线
const REMEDIAL_THRESHOLD: u8 = 50;

/// 对一份已解析的答卷评分，保留解析阶段的异常
pub fn score_transcript(key: &MasterKey, transcript: &Transcript, student_name: &str) -> ScoringResult {
    let mut result = score_answers(key, &transcript.answers, student_name, transcript.recovery);
    if !transcript.anomalies.is_empty() {
        let mut anomalies = transcript.anomalies.clone();
        anomalies.append(&mut result.anomalies);
        result.anomalies = anomalies;
    }
    result
}

/// 对原始作答评分
pub fn score_student(key: &MasterKey, answers: &[RawAnswer], student_name: &str) -> ScoringResult {
    score_answers(key, answers, student_name, Recovery::Direct)
}

fn score_answers(
    key: &MasterKey,
    answers: &[RawAnswer],
    student_name: &str,
    recovery: Recovery,
) -> ScoringResult {
    // 重复题号只认第一次出现
    let mut by_number: BTreeMap<u32, Choice> = BTreeMap::new();
    let mut anomalies = Vec::new();
    for answer in answers {
        if by_number.contains_key(&answer.number) {
            anomalies.push(Anomaly::DuplicateNumber {
                number: answer.number,
            });
        } else {
            by_number.insert(answer.number, answer.choice);
        }
    }

    let mut correct_count = 0u32;
    let mut earned_weight = 0.0f64;
    let mut total_weight = 0.0f64;
    let mut detail = Vec::with_capacity(key.len().max(by_number.len()));
    // 按知识点在标准答案中首次出现的顺序记录失分（答对的题也占位）
    let mut topic_losses: Vec<TopicLoss<'_>> = Vec::new();

    for item in key.items() {
        total_weight += item.weight;

        let choice = match by_number.get(&item.number) {
            Some(choice) => *choice,
            None => {
                anomalies.push(Anomaly::MissingAnswer {
                    number: item.number,
                });
                Choice::Unanswered
            }
        };

        let is_correct = choice.is_answered() && choice == item.correct_choice;
        let topic = topic_entry(&mut topic_losses, topic_label(&item.topic));
        if is_correct {
            correct_count += 1;
            earned_weight += item.weight;
        } else {
            topic.lost += item.weight;
            topic.missed = true;
        }

        detail.push(StudentAnswerItem {
            number: item.number,
            choice,
            is_correct,
            in_master_key: true,
        });
    }

    for (&number, &choice) in &by_number {
        if key.get(number).is_none() {
            anomalies.push(Anomaly::UnknownItem { number });
            detail.push(StudentAnswerItem {
                number,
                choice,
                is_correct: false,
                in_master_key: false,
            });
        }
    }
    detail.sort_by_key(|item| item.number);

    let degenerate_key = total_weight <= 0.0;
    let final_score = if degenerate_key {
        0
    } else {
        (earned_weight / total_weight * 100.0).round().clamp(0.0, 100.0) as u8
    };

    let weakest_topic = weakest_topic(&topic_losses);
    let feedback = feedback_for(final_score, weakest_topic.as_deref(), degenerate_key);

    ScoringResult {
        student_name: student_name.to_string(),
        final_score,
        correct_count,
        earned_weight,
        total_weight,
        per_item_detail: detail,
        weakest_topic,
        feedback,
        degenerate_key,
        recovery,
        anomalies,
    }
}

fn topic_label(topic: &str) -> &str {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        UNCATEGORIZED_TOPIC
    } else {
        trimmed
    }
}

struct TopicLoss<'a> {
    topic: &'a str,
    lost: f64,
    /// 该知识点下至少有一道题没有得分
    missed: bool,
}

fn topic_entry<'a, 'b>(losses: &'b mut Vec<TopicLoss<'a>>, topic: &'a str) -> &'b mut TopicLoss<'a> {
    let idx = match losses.iter().position(|entry| entry.topic == topic) {
        Some(idx) => idx,
        None => {
            losses.push(TopicLoss {
                topic,
                lost: 0.0,
                missed: false,
            });
            losses.len() - 1
        }
    };
    &mut losses[idx]
}

/// 失分最多的知识点；并列时取首次出现题号最小的
fn weakest_topic(losses: &[TopicLoss<'_>]) -> Option<String> {
    let mut best: Option<&TopicLoss<'_>> = None;
    for entry in losses.iter().filter(|entry| entry.missed) {
        if best.map_or(true, |b| entry.lost > b.lost) {
            best = Some(entry);
        }
    }
    best.map(|entry| entry.topic.to_string())
}

/// 按分数段生成固定模板的反馈
pub fn feedback_for(score: u8, weakest_topic: Option<&str>, degenerate_key: bool) -> String {
    if degenerate_key {
        return "标准答案总分为 0，无法计算成绩，请老师核对各题分值。".to_string();
    }

    let topic = weakest_topic.unwrap_or("各知识点");
    match score {
        s if s >= CONGRATULATE_THRESHOLD => match weakest_topic {
            Some(topic) => format!("成绩优秀，继续保持！可以再巩固一下「{}」。", topic),
            None => "成绩优秀，全部答对，继续保持！".to_string(),
        },
        s if s >= PASS_THRESHOLD => {
            format!("已达到及格线，建议复习「{}」相关内容。", topic)
        }
        s if s >= REMEDIAL_THRESHOLD => {
            format!("尚未达到及格线，需要加强「{}」的练习。", topic)
        }
        _ => format!("需要补习，请重点从「{}」的基础概念开始复习。", topic),
    }
}
