//! 阅卷流程 - 流程层
//!
//! 核心职责：定义"一个学生"的完整批改流程
//!
//! 流程顺序：
//! 1. 图片 → 模型转写（不带标准答案）
//! 2. 转写文本 → 答卷解析（失败时按全部未作答处理）
//! 3. 本地确定性评分

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, GradingError};
use crate::models::{ImageInput, MasterKey, ParseResult, Recovery, ScoringResult};
use crate::services::{
    prompts, score_transcript, summarize, ExtractionRequest, MasterKeyParse, MasterKeyParser,
    TranscriptParser, VisionExtractor,
};
use crate::utils::logging::truncate_text;
use crate::workflow::grading_ctx::GradingCtx;

/// 阅卷流程
///
/// - 编排识别、解析、评分
/// - 只依赖 `VisionExtractor`，不关心背后是哪个模型
/// - 不持有成绩列表（由 `GradingSession` 持有）
pub struct GradingFlow<E: ?Sized> {
    extractor: Arc<E>,
    master_key_parser: MasterKeyParser,
    transcript_parser: TranscriptParser,
    multiple_choice_limit: Option<usize>,
    master_key_temperature: f32,
    transcript_temperature: f32,
    report_temperature: f32,
}

impl<E: ?Sized> Clone for GradingFlow<E> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
            master_key_parser: self.master_key_parser.clone(),
            transcript_parser: self.transcript_parser,
            multiple_choice_limit: self.multiple_choice_limit,
            master_key_temperature: self.master_key_temperature,
            transcript_temperature: self.transcript_temperature,
            report_temperature: self.report_temperature,
        }
    }
}

impl<E: VisionExtractor + ?Sized> GradingFlow<E> {
    pub fn new(extractor: Arc<E>, config: &Config) -> Self {
        Self {
            extractor,
            master_key_parser: MasterKeyParser::new(config.default_item_weight),
            transcript_parser: TranscriptParser::new(),
            multiple_choice_limit: config.multiple_choice_limit,
            master_key_temperature: config.master_key_temperature,
            transcript_temperature: config.transcript_temperature,
            report_temperature: config.report_temperature,
        }
    }

    /// 从试卷照片生成标准答案
    ///
    /// 模型输出无法解析时返回 `ParseResult::MalformedInput`（不是错误），
    /// 调用方应把原文交给老师修正
    pub async fn build_master_key(
        &self,
        images: Vec<ImageInput>,
    ) -> AppResult<ParseResult<MasterKeyParse>> {
        if images.is_empty() {
            return Err(AppError::Grading(GradingError::NoImages {
                what: "试卷".to_string(),
            }));
        }

        info!("🔑 正在识别标准答案 ({} 张图片)...", images.len());

        let request = ExtractionRequest::new(
            images,
            prompts::master_key_prompt(self.multiple_choice_limit),
            self.master_key_temperature,
        )
        .with_system(prompts::MASTER_KEY_SYSTEM);

        let raw = self.extractor.extract(&request).await?;
        let parsed = self.master_key_parser.parse(&raw);

        match &parsed {
            ParseResult::Ok(parse) => {
                info!(
                    "✓ 标准答案识别完成: {} 题, 总分 {}",
                    parse.key.len(),
                    parse.key.total_weight()
                );
                for anomaly in &parse.anomalies {
                    warn!("⚠️ 标准答案异常: {}", anomaly);
                }
            }
            ParseResult::MalformedInput(raw) => {
                warn!("⚠️ 标准答案无法解析: {}", truncate_text(raw, 200));
            }
        }

        Ok(parsed)
    }

    /// 批改一个学生
    pub async fn grade_student(
        &self,
        master_key: &MasterKey,
        images: Vec<ImageInput>,
        ctx: &GradingCtx,
    ) -> AppResult<ScoringResult> {
        validate_grading_input(master_key, &ctx.student_name)?;
        if images.is_empty() {
            return Err(AppError::Grading(GradingError::NoImages {
                what: "学生答卷".to_string(),
            }));
        }

        info!("{} 📷 正在识别答卷 ({} 张图片)...", ctx, images.len());

        let request = ExtractionRequest::new(
            images,
            prompts::transcript_prompt(self.multiple_choice_limit),
            self.transcript_temperature,
        )
        .with_system(prompts::TRANSCRIPT_SYSTEM);

        let raw = self.extractor.extract(&request).await?;
        let result = self.grade_transcript(master_key, &raw, &ctx.student_name)?;

        if result.needs_review() {
            warn!(
                "{} ⚠️ 需要复核: {} 个异常{}",
                ctx,
                result.anomalies.len(),
                if result.recovery == Recovery::Failed {
                    "（答卷无法解析）"
                } else {
                    ""
                }
            );
        }
        info!(
            "{} ✓ 成绩 {} (答对 {}/{}), 薄弱知识点: {}",
            ctx,
            result.final_score,
            result.correct_count,
            master_key.len(),
            result.weakest_topic_label()
        );

        Ok(result)
    }

    /// 对已有的转写文本评分（不调用模型）
    pub fn grade_transcript(
        &self,
        master_key: &MasterKey,
        raw_text: &str,
        student_name: &str,
    ) -> AppResult<ScoringResult> {
        validate_grading_input(master_key, student_name)?;

        let transcript = self.transcript_parser.parse(raw_text);
        Ok(score_transcript(master_key, &transcript, student_name.trim()))
    }

    /// 生成班级分析报告（Markdown）
    pub async fn class_report(&self, results: &[ScoringResult]) -> AppResult<String> {
        let summary = summarize(results)?;

        info!("📝 正在生成班级分析报告...");
        let request = ExtractionRequest::new(
            Vec::new(),
            prompts::class_report_prompt(&summary, results),
            self.report_temperature,
        )
        .with_system(prompts::REPORT_SYSTEM);

        self.extractor.extract(&request).await
    }
}

fn validate_grading_input(master_key: &MasterKey, student_name: &str) -> AppResult<()> {
    if student_name.trim().is_empty() {
        return Err(AppError::Grading(GradingError::EmptyStudentName));
    }
    if master_key.is_empty() {
        return Err(AppError::Grading(GradingError::EmptyMasterKey));
    }
    Ok(())
}
