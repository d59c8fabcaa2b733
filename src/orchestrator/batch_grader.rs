//! 批量阅卷器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一场考试的批量批改。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志文件头、创建 LLM 服务
//! 2. **标准答案**：优先加载 TOML 文件；否则从试卷照片识别并保存
//! 3. **批量加载**：扫描学生目录（每个子目录一个学生）
//! 4. **并发控制**：使用 Semaphore 限制同时批改的学生数量
//! 5. **结果汇总**：按学生顺序写入会话，输出班级统计和成绩表

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    load_images_in_dir, load_master_key, save_master_key, scan_student_dirs, MasterKey,
    MasterKeyFile, ParseResult, ScoringResult, StudentSubmission,
};
use crate::orchestrator::student_grader::grade_submission_owned;
use crate::services::{write_raw_output, LlmService, VisionExtractor, WarnWriter};
use crate::utils::logging;
use crate::workflow::{GradingCtx, GradingFlow, GradingSession};

/// 应用主结构
pub struct App {
    config: Config,
    flow: GradingFlow<dyn VisionExtractor>,
    warn_writer: Arc<WarnWriter>,
}

impl App {
    /// 初始化应用（使用真实的 LLM 服务）
    pub async fn initialize(config: Config) -> Result<Self> {
        let service = LlmService::new(&config).context("创建 LLM 服务失败")?;
        logging::log_startup(&config.exam_id, service.models(), config.max_concurrent_students);

        Self::with_extractor(config, Arc::new(service))
    }

    /// 使用指定的识别实现初始化
    pub fn with_extractor(config: Config, extractor: Arc<dyn VisionExtractor>) -> Result<Self> {
        logging::init_log_file(&config.output_log_file).context("初始化日志文件失败")?;

        Ok(Self {
            flow: GradingFlow::new(extractor, &config),
            warn_writer: Arc::new(WarnWriter::with_path(&config.warn_file)),
            config,
        })
    }

    /// 运行应用主逻辑，返回本次的阅卷会话
    pub async fn run(&self) -> Result<GradingSession> {
        let master_key = Arc::new(self.load_or_build_master_key().await?);
        let mut session = GradingSession::new(&self.config.exam_id, Arc::clone(&master_key));

        info!("\n📁 正在扫描学生答卷...");
        let students = scan_student_dirs(&self.config.students_dir)
            .await
            .context("扫描学生目录失败")?;

        if students.is_empty() {
            warn!("⚠️ 没有找到学生答卷目录，程序结束");
            return Ok(session);
        }

        let total = students.len();
        logging::log_students_loaded(total, self.config.max_concurrent_students);

        let outcomes = self.grade_all(master_key, students).await;
        let mut failed = 0;
        for outcome in outcomes {
            match outcome {
                Some(result) => session.add(result),
                None => failed += 1,
            }
        }

        if session.is_empty() {
            error!("❌ 所有学生都批改失败");
        } else {
            self.write_outputs(&session).await?;
        }

        logging::print_final_stats(session.len(), failed, total, &self.config.output_log_file);
        Ok(session)
    }

    /// 加载或生成标准答案
    async fn load_or_build_master_key(&self) -> Result<MasterKey> {
        let path = &self.config.master_key_file;

        if path.exists() {
            info!("📖 使用已有的标准答案文件: {}", path.display());
            let file = load_master_key(path).await?;
            if file.items.is_empty() {
                bail!("标准答案文件 {} 中没有任何题目", path.display());
            }
            return Ok(file.items);
        }

        info!(
            "未找到标准答案文件，从试卷照片识别: {}",
            self.config.master_key_dir.display()
        );
        let images = load_images_in_dir(&self.config.master_key_dir)
            .await
            .context("加载试卷图片失败")?;

        match self.flow.build_master_key(images).await? {
            ParseResult::Ok(parse) => {
                let file = MasterKeyFile::new(&self.config.exam_id, parse.key);
                save_master_key(path, &file).await?;
                if !parse.anomalies.is_empty() {
                    warn!(
                        "⚠️ 标准答案有 {} 处异常，请核对 {}",
                        parse.anomalies.len(),
                        path.display()
                    );
                }
                Ok(file.items)
            }
            ParseResult::MalformedInput(raw) => {
                let raw_path = write_raw_output(path, &raw)?;
                Err(AppError::extraction_format("标准答案 JSON 数组", raw)).with_context(|| {
                    format!(
                        "标准答案无法解析，模型原文已保存至 {}，请整理为 {} 后重新运行",
                        raw_path.display(),
                        path.display()
                    )
                })
            }
        }
    }

    /// 并发批改所有学生，结果按学生顺序返回（失败为 None）
    async fn grade_all(
        &self,
        master_key: Arc<MasterKey>,
        students: Vec<StudentSubmission>,
    ) -> Vec<Option<ScoringResult>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_students));
        let mut handles = Vec::with_capacity(students.len());

        for (idx, submission) in students.into_iter().enumerate() {
            let ctx = GradingCtx::new(&self.config.exam_id, idx + 1, &submission.name);
            let semaphore = Arc::clone(&semaphore);
            let flow = self.flow.clone();
            let master_key = Arc::clone(&master_key);
            let warn_writer = Arc::clone(&self.warn_writer);

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                grade_submission_owned(flow, master_key, submission, ctx, warn_writer)
                    .await
                    .ok()
            });
            handles.push(handle);
        }

        // join_all 保持提交顺序
        join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(idx, joined)| {
                joined.unwrap_or_else(|e| {
                    error!("[学生 {}] 任务执行失败: {}", idx + 1, e);
                    None
                })
            })
            .collect()
    }

    /// 输出班级统计、成绩表和（可选的）分析报告
    async fn write_outputs(&self, session: &GradingSession) -> Result<()> {
        let summary = session.summary()?;
        logging::log_summary(&summary);

        session
            .export_table()?
            .write_csv(&self.config.export_file)
            .await
            .context("导出成绩表失败")?;

        if self.config.generate_report {
            match self.flow.class_report(session.results()).await {
                Ok(report) => {
                    if let Some(parent) = self
                        .config
                        .report_file
                        .parent()
                        .filter(|p| !p.as_os_str().is_empty())
                    {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    tokio::fs::write(&self.config.report_file, report)
                        .await
                        .context("写入分析报告失败")?;
                    info!("📝 班级分析报告已保存至: {}", self.config.report_file.display());
                }
                // 报告是附加产物，失败不影响成绩
                Err(e) => warn!("⚠️ 生成班级分析报告失败: {}", e),
            }
        }

        Ok(())
    }
}
