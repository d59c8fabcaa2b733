//! 单个学生处理器 - 编排层
//!
//! 负责一个学生目录：加载图片 → 调用阅卷流程 → 记录需要复核的结果

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, warn};

use crate::models::{load_images_in_dir, MasterKey, ScoringResult, StudentSubmission};
use crate::services::{VisionExtractor, WarnWriter};
use crate::workflow::{GradingCtx, GradingFlow};

/// 批改单个学生目录
pub async fn grade_submission<E: VisionExtractor + ?Sized>(
    flow: &GradingFlow<E>,
    master_key: &MasterKey,
    submission: &StudentSubmission,
    ctx: &GradingCtx,
    warn_writer: &WarnWriter,
) -> Result<ScoringResult> {
    let outcome = async {
        let images = load_images_in_dir(&submission.dir)
            .await
            .with_context(|| format!("加载答卷图片失败: {}", submission.dir.display()))?;

        flow.grade_student(master_key, images, ctx)
            .await
            .context("批改失败")
    }
    .await;

    match &outcome {
        Ok(result) if result.needs_review() => {
            if let Err(e) = warn_writer.write_review(&ctx.to_string(), result) {
                warn!("{} 写入复核记录失败: {}", ctx, e);
            }
        }
        Ok(_) => {}
        Err(e) => {
            error!("{} ❌ {:#}", ctx, e);
            if let Err(write_err) =
                warn_writer.write_failure(&ctx.to_string(), &submission.name, &format!("{:#}", e))
            {
                warn!("{} 写入失败记录失败: {}", ctx, write_err);
            }
        }
    }

    outcome
}

/// 供 `tokio::spawn` 使用的拥有所有权版本
pub(crate) async fn grade_submission_owned<E: VisionExtractor + ?Sized>(
    flow: GradingFlow<E>,
    master_key: Arc<MasterKey>,
    submission: StudentSubmission,
    ctx: GradingCtx,
    warn_writer: Arc<WarnWriter>,
) -> Result<ScoringResult> {
    grade_submission(&flow, &master_key, &submission, &ctx, &warn_writer).await
}
