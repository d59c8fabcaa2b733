//! # Smart Grader
//!
//! 用视觉大模型批改选择题试卷的 Rust 应用程序
//!
//! 模型只负责"看图转写"：识别标准答案、转写学生涂写的选项。
//! 对错判断、得分、薄弱知识点、班级统计全部在本地确定性计算。
//!
//! ## 架构设计
//!
//! ### ① 数据层（Models）
//! - `models/` - 标准答案、答卷、评分结果、班级统计
//! - `models/loaders` - 标准答案 TOML 文件、学生图片目录
//!
//! ### ② 业务能力层（Services）
//! - `LlmService` - 视觉识别能力（超时 + 备用模型降级），实现 `VisionExtractor`
//! - `MasterKeyParser` / `TranscriptParser` - 从模型输出中恢复 JSON
//! - `scoring_engine` - 确定性评分
//! - `class_aggregator` - 班级统计
//! - `export` - 成绩表 CSV
//! - `WarnWriter` - 写 warn.txt 能力
//!
//! ### ③ 流程层（Workflow）
//! - `GradingCtx` - 上下文封装（exam_id + 学生序号）
//! - `GradingFlow` - 流程编排（识别 → 解析 → 评分）
//! - `GradingSession` - 一场考试的成绩集合
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_grader` - 批量阅卷，管理并发
//! - `orchestrator/student_grader` - 单个学生目录的处理
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, ErrorKind, ErrorReport};
pub use models::{
    Choice, ClassSummary, ImageInput, MasterKey, MasterKeyItem, ParseResult, ScoringResult,
};
pub use orchestrator::App;
pub use services::{ExtractionRequest, LlmService, VisionExtractor};
pub use workflow::{GradingCtx, GradingFlow, GradingSession};
