use serde::Serialize;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 模型输出解析错误
    #[error("解析错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 评分流程错误
    #[error("评分错误: {0}")]
    Grading(#[from] GradingError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 模型输出解析错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 经过代码块剥离和子串扫描后仍无法得到期望的 JSON 结构
    ///
    /// `raw` 保留模型原文，交给人工编辑修正
    #[error("无法从模型输出中解析出 {expected} (原文长度: {} 字符)", .raw.chars().count())]
    Format { expected: String, raw: String },
}

/// 评分流程错误
#[derive(Debug, Error)]
pub enum GradingError {
    /// 标准答案为空
    #[error("标准答案不能为空")]
    EmptyMasterKey,
    /// 学生姓名为空
    #[error("学生姓名不能为空")]
    EmptyStudentName,
    /// 未提供任何图片
    #[error("至少需要 1 张{what}图片")]
    NoImages { what: String },
    /// 班级统计时没有任何学生结果
    #[error("学生成绩列表为空，无法统计")]
    EmptyCollection,
    /// 索引超出范围
    #[error("索引 {index} 超出范围 (共 {len} 条)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 所有候选模型都失败或超时
    #[error("推理服务不可用 (已尝试模型: {}): {last_cause}", .attempted.join(", "))]
    UpstreamUnavailable {
        attempted: Vec<String>,
        last_cause: String,
    },
    /// 非配额类错误（请求本身有问题），不做降级重试
    #[error("推理服务拒绝请求 (模型: {model}): {message}")]
    Rejected { model: String, message: String },
    /// 构建请求失败
    #[error("构建请求失败: {0}")]
    RequestBuild(String),
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {message}")]
    TomlParseFailed { path: String, message: String },
    /// TOML 序列化失败
    #[error("TOML序列化失败: {0}")]
    TomlSerializeFailed(String),
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必填项缺失
    #[error("配置项 {name} 不能为空")]
    Missing { name: String },
    /// 取值非法
    #[error("配置项 {name} 取值非法: {reason}")]
    Invalid { name: String, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON处理失败: {}", err))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            message: err.to_string(),
        })
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::File(FileError::TomlSerializeFailed(err.to_string()))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: err,
        })
    }
}

// ========== 结构化错误报告 ==========

/// 边界层返回给调用方（UI）的错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ExtractionFormat,
    EmptyCollection,
    UpstreamUnavailable,
    UpstreamRejected,
    InvalidInput,
    File,
    Config,
    Internal,
}

/// 错误报告：类别 + 可读信息
///
/// 解析失败时附带模型原文，便于人工修正
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl AppError {
    /// 错误类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Extraction(ExtractionError::Format { .. }) => ErrorKind::ExtractionFormat,
            AppError::Grading(GradingError::EmptyCollection) => ErrorKind::EmptyCollection,
            AppError::Grading(_) => ErrorKind::InvalidInput,
            AppError::Llm(LlmError::UpstreamUnavailable { .. }) => ErrorKind::UpstreamUnavailable,
            AppError::Llm(LlmError::Rejected { .. }) => ErrorKind::UpstreamRejected,
            AppError::Llm(_) => ErrorKind::Internal,
            AppError::File(_) => ErrorKind::File,
            AppError::Config(_) => ErrorKind::Config,
            AppError::Other(_) => ErrorKind::Internal,
        }
    }

    /// 转换为结构化错误报告
    pub fn report(&self) -> ErrorReport {
        let raw_text = match self {
            AppError::Extraction(ExtractionError::Format { raw, .. }) => Some(raw.clone()),
            _ => None,
        };
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
            raw_text,
        }
    }

    // ========== 便捷构造函数 ==========

    /// 创建解析失败错误
    pub fn extraction_format(expected: impl Into<String>, raw: impl Into<String>) -> Self {
        AppError::Extraction(ExtractionError::Format {
            expected: expected.into(),
            raw: raw.into(),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建配置缺失错误
    pub fn config_missing(name: impl Into<String>) -> Self {
        AppError::Config(ConfigError::Missing { name: name.into() })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
