//! LLM 服务 - 视觉识别能力层
//!
//! 只负责"把图片和指令发给模型、拿回文本"，不关心解析和评分
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（如 Gemini 的 OpenAI 兼容端点）
//!
//! ## 失败处理
//! - 每次调用都有超时（`request_timeout_secs`）
//! - 超时、限流、配额耗尽、过载、5xx、网络错误：换下一个备用模型
//! - 其他错误（请求非法、鉴权失败等）：立即失败，不降级
//! - 所有模型都失败：`LlmError::UpstreamUnavailable`

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_openai::error::{ApiError, OpenAIError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::models::ImageInput;
use crate::utils::logging::truncate_text;

/// 一次识别请求
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// 图片（为空时是纯文本请求）
    pub images: Vec<ImageInput>,
    pub instruction: String,
    pub system_message: Option<String>,
    pub temperature: f32,
}

impl ExtractionRequest {
    pub fn new(images: Vec<ImageInput>, instruction: impl Into<String>, temperature: f32) -> Self {
        Self {
            images,
            instruction: instruction.into(),
            system_message: None,
            temperature,
        }
    }

    pub fn with_system(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }
}

/// 视觉识别接口
///
/// 流程层只依赖这个 trait，测试中可以替换成脚本化的假实现
#[async_trait]
pub trait VisionExtractor: Send + Sync {
    /// 返回模型的原始文本输出
    async fn extract(&self, request: &ExtractionRequest) -> AppResult<String>;
}

/// 单次尝试的失败
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// 可以换下一个模型再试
    Retryable(String),
    /// 立即失败
    Fatal(LlmError),
}

/// LLM 服务
pub struct LlmService {
    client: Client<OpenAIConfig>,
    /// 按尝试顺序排列：首选模型 + 备用模型
    models: Vec<String>,
    timeout: Duration,
    max_tokens: u32,
}

impl LlmService {
    /// 创建 LLM 服务，配置不完整时返回 `ConfigError`
    pub fn new(config: &Config) -> AppResult<Self> {
        config.validate()?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            models: config.model_candidates(),
            timeout: config.request_timeout(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// 用指定模型调用一次
    async fn call_model(&self, model: &str, request: &ExtractionRequest) -> Result<String, AttemptError> {
        debug!(
            "调用 LLM API，模型: {}, 图片: {} 张, 指令长度: {} 字符",
            model,
            request.images.len(),
            request.instruction.len()
        );

        let chat_request = build_chat_request(model, request, self.max_tokens)
            .map_err(|e| AttemptError::Fatal(LlmError::RequestBuild(e.to_string())))?;

        let response = with_timeout(model, self.timeout, self.client.chat().create(chat_request)).await?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        match content {
            Some(content) => {
                debug!("LLM 响应 ({}): {}", model, truncate_text(&content, 200));
                Ok(content)
            }
            // 空响应多半是安全过滤或截断，换模型再试
            None => Err(AttemptError::Retryable(
                LlmError::EmptyContent {
                    model: model.to_string(),
                }
                .to_string(),
            )),
        }
    }
}

#[async_trait]
impl VisionExtractor for LlmService {
    async fn extract(&self, request: &ExtractionRequest) -> AppResult<String> {
        run_with_fallback(&self.models, |model| async move {
            self.call_model(&model, request).await
        })
        .await
    }
}

/// 构建 Chat Completion 请求（有图片时使用 Vision 多段内容）
fn build_chat_request(
    model: &str,
    request: &ExtractionRequest,
    max_tokens: u32,
) -> Result<async_openai::types::chat::CreateChatCompletionRequest, OpenAIError> {
    let mut messages = Vec::new();

    if let Some(sys_msg) = &request.system_message {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(sys_msg.as_str())
            .build()?;
        messages.push(ChatCompletionRequestMessage::System(system_msg));
    }

    let user_msg = if request.images.is_empty() {
        ChatCompletionRequestUserMessageArgs::default()
            .content(request.instruction.as_str())
            .build()?
    } else {
        let mut content_parts = vec![ChatCompletionRequestUserMessageContentPart::Text(
            ChatCompletionRequestMessageContentPartText {
                text: request.instruction.clone(),
            },
        )];

        for image in &request.images {
            content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: image.to_data_url(),
                        detail: Some(ImageDetail::High),
                    },
                },
            ));
        }

        ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()?
    };
    messages.push(ChatCompletionRequestMessage::User(user_msg));

    CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages(messages)
        .temperature(request.temperature)
        .max_tokens(max_tokens)
        .build()
}

/// 给单次调用加超时，并把错误分为"可降级"和"立即失败"
pub(crate) async fn with_timeout<T, Fut>(
    model: &str,
    timeout: Duration,
    call: Fut,
) -> Result<T, AttemptError>
where
    Fut: Future<Output = Result<T, OpenAIError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(classify_error(model, &e)),
        Err(_) => Err(AttemptError::Retryable(format!(
            "请求超时 ({} 秒)",
            timeout.as_secs_f32()
        ))),
    }
}

fn classify_error(model: &str, err: &OpenAIError) -> AttemptError {
    let retryable = match err {
        // 网络层错误：连接失败、读响应超时等
        OpenAIError::Reqwest(_) | OpenAIError::StreamError(_) => true,
        OpenAIError::ApiError(api_error) => is_retryable_api_error(api_error),
        // 错误体不是 OpenAI 格式（部分兼容端点如此），只能看原文
        OpenAIError::JSONDeserialize(_, content) => is_retryable_message(content),
        _ => false,
    };

    if retryable {
        AttemptError::Retryable(err.to_string())
    } else {
        AttemptError::Fatal(LlmError::Rejected {
            model: model.to_string(),
            message: err.to_string(),
        })
    }
}

/// 按 `type` / `code` 判断；两者都缺失时（5xx 的原始响应体）才看错误文本
pub(crate) fn is_retryable_api_error(api_error: &ApiError) -> bool {
    const RETRYABLE_CODES: &[&str] = &[
        "429",
        "500",
        "502",
        "503",
        "504",
        "rate_limit_exceeded",
        "rate_limit_error",
        "insufficient_quota",
        "resource_exhausted",
        "server_error",
        "internal_error",
        "overloaded_error",
        "service_unavailable",
        "unavailable",
    ];

    let labels: Vec<String> = [&api_error.r#type, &api_error.code]
        .into_iter()
        .flatten()
        .map(|label| label.trim().to_lowercase())
        .collect();

    if labels.is_empty() {
        return is_retryable_message(&api_error.message);
    }
    labels
        .iter()
        .any(|label| RETRYABLE_CODES.contains(&label.as_str()))
}

/// 错误文本是否属于限流/配额/过载/网络类（没有结构化信息时使用）
pub(crate) fn is_retryable_message(message: &str) -> bool {
    const MARKERS: &[&str] = &[
        "429",
        "too many requests",
        "rate limit",
        "rate_limit",
        "quota",
        "resource_exhausted",
        "resource exhausted",
        "overloaded",
        "unavailable",
        "502",
        "503",
        "504",
        "bad gateway",
        "internal server error",
        "server error",
        "timeout",
        "timed out",
        "deadline",
        "connection",
        "error sending request",
    ];

    let lower = message.to_lowercase();
    MARKERS.iter().any(|marker| lower.contains(marker))
}

/// 按顺序尝试每个模型，直到成功或遇到不可降级的错误
pub(crate) async fn run_with_fallback<F, Fut>(models: &[String], mut attempt: F) -> AppResult<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<String, AttemptError>>,
{
    let mut attempted = Vec::with_capacity(models.len());
    let mut last_cause = String::from("没有可用的模型");

    for model in models {
        attempted.push(model.clone());

        match attempt(model.clone()).await {
            Ok(content) => {
                if attempted.len() > 1 {
                    debug!("备用模型 {} 调用成功", model);
                }
                return Ok(content);
            }
            Err(AttemptError::Retryable(cause)) => {
                warn!("模型 {} 调用失败，尝试下一个模型: {}", model, cause);
                last_cause = cause;
            }
            Err(AttemptError::Fatal(err)) => {
                warn!("模型 {} 拒绝请求，不再重试: {}", model, err);
                return Err(AppError::Llm(err));
            }
        }
    }

    Err(AppError::Llm(LlmError::UpstreamUnavailable {
        attempted,
        last_cause,
    }))
}
