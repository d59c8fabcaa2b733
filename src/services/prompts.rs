//! 提示词
//!
//! 所有提示词都要求模型只返回 JSON；真正的评分在本地完成，
//! 学生答卷的提示词中不包含标准答案

use crate::models::{ClassSummary, ScoringResult, PASS_THRESHOLD};

pub const MASTER_KEY_SYSTEM: &str = "你是一名严谨的阅卷老师助手，负责根据试卷照片整理选择题标准答案。\
只输出 JSON，不要输出任何解释或 markdown。";

pub const TRANSCRIPT_SYSTEM: &str = "你是一名答题卡转写员，只负责如实记录学生在每道选择题上涂写的选项，\
不判断对错，不打分。只输出 JSON，不要输出任何解释或 markdown。";

pub const REPORT_SYSTEM: &str = "你是一名资深的教学评估顾问，擅长根据班级成绩数据给出专业、可操作的分析。";

/// 只识别前 N 道选择题的附加说明
fn scope_clause(limit: Option<usize>) -> String {
    match limit {
        Some(n) => format!("\n只处理前 {} 道选择题，忽略之后的题目和所有非选择题。", n),
        None => "\n处理试卷上的全部选择题，忽略非选择题（如问答题）。".to_string(),
    }
}

/// 标准答案提取提示词
pub fn master_key_prompt(limit: Option<usize>) -> String {
    format!(
        r#"阅读这些试卷照片，为每一道选择题给出准确的正确答案，并且必须为每道题标注考查的知识点（topic）。{}

分值（weight）：试卷上注明了每题分值时照抄；没有注明时所有题目使用相同的分值 1。
知识点使用试卷本身的语言，简短即可（2-4 个词）。

只返回一个 JSON 数组，不要使用代码块，格式如下：
[
  {{"number": 1, "correctChoice": "A", "topic": "知识点", "weight": 1}},
  {{"number": 2, "correctChoice": "C", "topic": "知识点", "weight": 1}}
]

correctChoice 只能是 A、B、C、D、E 中的一个字母。"#,
        scope_clause(limit)
    )
}

/// 学生答卷转写提示词
pub fn transcript_prompt(limit: Option<usize>) -> String {
    format!(
        r#"这些照片是同一名学生的答题卡或试卷。逐题记录学生选择的选项。{}

规则：
- 只记录学生实际涂写/圈选的选项，不要根据题目内容推测正确答案
- 没有作答、涂改无法辨认或选了多个选项的题目，choice 填 "unanswered"
- 题号以试卷上印刷的题号为准

只返回一个 JSON 数组，不要使用代码块，格式如下：
[
  {{"number": 1, "choice": "B"}},
  {{"number": 2, "choice": "unanswered"}}
]"#,
        scope_clause(limit)
    )
}

/// 班级分析报告提示词
pub fn class_report_prompt(summary: &ClassSummary, results: &[ScoringResult]) -> String {
    let students: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "name": r.student_name,
                "finalScore": r.final_score,
                "weakestTopic": r.weakest_topic_label(),
                "feedback": r.feedback,
            })
        })
        .collect();

    let summary_json = serde_json::to_string_pretty(summary).unwrap_or_default();
    let students_json = serde_json::to_string_pretty(&students).unwrap_or_default();

    format!(
        r#"以下是一个班级（{count} 名学生）的考试结果。统计数据已经计算好，请直接引用，不要重新计算。

班级统计：
{summary_json}

学生成绩：
{students_json}

请用 Markdown 撰写一份专业的班级分析报告（不要使用 LaTeX，不要放在代码块中），必须包含以下章节：

## 📊 成绩概况
- 平均分、最高分、最低分
- 达标/未达标人数（及格线 {pass}）
- 分数段分布（90-100、75-89、50-74、<50）

## 📌 薄弱知识点
- 根据 topicErrorFrequency 分析错误最集中的知识点
- 估算在该知识点上薄弱的学生比例

## 🔴 补救重点
- 列出需要重点关注的学生（低于 {pass} 分），并说明每人需要加强的内容

## 💡 教学建议
- 针对薄弱知识点给出 2-3 条具体可执行的建议

报告语言与知识点名称使用的语言保持一致，直接从第一个标题开始。"#,
        count = summary.student_count,
        pass = PASS_THRESHOLD,
    )
}
