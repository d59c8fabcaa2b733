//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_grader` - 批量阅卷器
//! - 管理应用生命周期（初始化、运行）
//! - 加载或生成标准答案
//! - 扫描学生目录（Vec<StudentSubmission>）
//! - 控制并发数量（Semaphore）
//! - 输出班级统计、成绩表
//!
//! ### `student_grader` - 单个学生处理器
//! - 加载一个学生的答卷图片
//! - 调用 GradingFlow 批改
//! - 把需要复核/失败的学生写入 warn.txt
//!
//! ## 层次关系
//!
//! ```text
//! batch_grader (处理 Vec<StudentSubmission>)
//!     ↓
//! student_grader (处理单个学生目录)
//!     ↓
//! workflow::GradingFlow (识别 → 解析 → 评分)
//!     ↓
//! services (能力层：llm / parser / scoring / export / warn)
//! ```

pub mod batch_grader;
pub mod student_grader;

// 重新导出主要类型
pub use batch_grader::App;
pub use student_grader::grade_submission;
