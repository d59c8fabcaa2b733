//! 成绩表导出
//!
//! 每个学生一行，每个题号一列（直到结果中出现的标准答案最大题号），再加汇总列

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{AppError, AppResult, GradingError};
use crate::models::{Choice, ScoringResult};

/// 扁平成绩表
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// 构建成绩表，空列表返回 `GradingError::EmptyCollection`
pub fn build_table(results: &[ScoringResult]) -> AppResult<ExportTable> {
    if results.is_empty() {
        return Err(AppError::Grading(GradingError::EmptyCollection));
    }

    // 列数只由标准答案中的题号决定；多出的题号已记为异常，不占列
    let max_number = results
        .iter()
        .flat_map(|r| r.per_item_detail.iter())
        .filter(|item| item.in_master_key)
        .map(|item| item.number)
        .max()
        .unwrap_or(0);

    let mut headers: Vec<String> = [
        "No",
        "Student",
        "Final Score",
        "Correct",
        "Earned Weight",
        "Total Weight",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();
    headers.extend((1..=max_number).map(|n| format!("Q{}", n)));
    headers.push("Weakest Topic".to_string());
    headers.push("Feedback".to_string());

    let rows = results
        .iter()
        .enumerate()
        .map(|(idx, result)| {
            let cells: BTreeMap<u32, String> = result
                .per_item_detail
                .iter()
                .map(|item| (item.number, answer_cell(item.choice, item.is_correct)))
                .collect();

            let mut row = vec![
                (idx + 1).to_string(),
                result.student_name.clone(),
                result.final_score.to_string(),
                result.correct_count.to_string(),
                format_weight(result.earned_weight),
                format_weight(result.total_weight),
            ];
            row.extend((1..=max_number).map(|n| cells.get(&n).cloned().unwrap_or_default()));
            row.push(result.weakest_topic_label().to_string());
            row.push(result.feedback.clone());
            row
        })
        .collect();

    Ok(ExportTable { headers, rows })
}

fn answer_cell(choice: Choice, is_correct: bool) -> String {
    if is_correct {
        format!("{} ✓", choice.label())
    } else {
        choice.label().to_string()
    }
}

/// 整数分值不带小数点
fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{:.0}", weight)
    } else {
        format!("{}", weight)
    }
}

impl ExportTable {
    /// RFC 4180 CSV
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for line in std::iter::once(&self.headers).chain(&self.rows) {
            let fields: Vec<String> = line.iter().map(|f| csv_field(f)).collect();
            out.push_str(&fields.join(","));
            out.push_str("\r\n");
        }
        out
    }

    /// 写入 CSV 文件（带 BOM，方便 Excel 识别 UTF-8）
    pub async fn write_csv(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
        }

        let content = format!("\u{feff}{}", self.to_csv());
        tokio::fs::write(path, content)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        tracing::info!("成绩表已导出至: {}", path.display());
        Ok(())
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
