//! 阅卷会话
//!
//! 持有一场考试的标准答案（只读共享）和所有学生的成绩

use std::sync::Arc;
use tracing::debug;

use crate::error::{AppError, AppResult, GradingError};
use crate::models::{ClassSummary, MasterKey, ScoringResult};
use crate::services::{build_table, summarize, ExportTable};

/// 阅卷会话
#[derive(Debug, Clone)]
pub struct GradingSession {
    exam_id: String,
    master_key: Arc<MasterKey>,
    results: Vec<ScoringResult>,
}

impl GradingSession {
    pub fn new(exam_id: impl Into<String>, master_key: Arc<MasterKey>) -> Self {
        Self {
            exam_id: exam_id.into(),
            master_key,
            results: Vec::new(),
        }
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    pub fn master_key(&self) -> &Arc<MasterKey> {
        &self.master_key
    }

    pub fn add(&mut self, result: ScoringResult) {
        debug!("加入成绩: {} ({})", result.student_name, result.final_score);
        self.results.push(result);
    }

    /// 按位置删除
    pub fn remove(&mut self, index: usize) -> AppResult<ScoringResult> {
        if index >= self.results.len() {
            return Err(AppError::Grading(GradingError::IndexOutOfRange {
                index,
                len: self.results.len(),
            }));
        }
        Ok(self.results.remove(index))
    }

    /// 按姓名删除第一个匹配的学生
    pub fn remove_by_name(&mut self, student_name: &str) -> Option<ScoringResult> {
        let index = self
            .results
            .iter()
            .position(|r| r.student_name == student_name)?;
        Some(self.results.remove(index))
    }

    pub fn results(&self) -> &[ScoringResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// 班级统计（每次重新计算）
    pub fn summary(&self) -> AppResult<ClassSummary> {
        summarize(&self.results)
    }

    pub fn export_table(&self) -> AppResult<ExportTable> {
        build_table(&self.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Choice, MasterKeyItem, RawAnswer};
    use crate::services::score_student;

    fn session() -> GradingSession {
        let key = MasterKey::try_from(vec![
            MasterKeyItem::new(1, Choice::A, "Cells", 1.0),
            MasterKeyItem::new(2, Choice::B, "Genetics", 1.0),
        ])
        .unwrap();
        GradingSession::new("bio-7a", Arc::new(key))
    }

    fn grade(session: &GradingSession, name: &str, answers: &[RawAnswer]) -> ScoringResult {
        score_student(session.master_key(), answers, name)
    }

    #[test]
    fn test_add_and_summary() {
        let mut session = session();
        assert_eq!(session.summary().unwrap_err().kind(), ErrorKind::EmptyCollection);

        let ani = grade(&session, "Ani", &[RawAnswer::new(1, Choice::A), RawAnswer::new(2, Choice::B)]);
        let budi = grade(&session, "Budi", &[RawAnswer::new(1, Choice::A)]);
        session.add(ani);
        session.add(budi);

        let summary = session.summary().unwrap();
        assert_eq!(summary.student_count, 2);
        assert_eq!(summary.mean, 75.0);
        assert_eq!(session.export_table().unwrap().rows.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut session = session();
        session.add(grade(&session, "Ani", &[]));
        session.add(grade(&session, "Budi", &[]));
        session.add(grade(&session, "Citra", &[]));

        assert_eq!(session.remove(1).unwrap().student_name, "Budi");
        assert!(session.remove(5).is_err());
        assert_eq!(session.remove_by_name("Citra").unwrap().student_name, "Citra");
        assert!(session.remove_by_name("Dewi").is_none());

        let names: Vec<&str> = session.results().iter().map(|r| r.student_name.as_str()).collect();
        assert_eq!(names, vec!["Ani"]);
    }

    #[test]
    fn test_master_key_is_shared() {
        let session = session();
        let shared = Arc::clone(session.master_key());
        assert!(Arc::ptr_eq(&shared, session.master_key()));
        assert_eq!(shared.len(), 2);
    }
}
