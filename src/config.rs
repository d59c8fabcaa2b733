use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult, ConfigError, FileError};

/// 程序配置
///
/// 字段都有默认值；TOML 配置文件里只需写要覆盖的项
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    /// OpenAI 兼容接口地址
    pub llm_api_base_url: String,
    /// 首选模型
    pub llm_model_name: String,
    /// 首选模型配额耗尽/过载时依次尝试的备用模型
    pub llm_fallback_models: Vec<String>,
    /// 单次调用超时（秒）
    pub request_timeout_secs: u64,
    pub master_key_temperature: f32,
    pub transcript_temperature: f32,
    pub report_temperature: f32,
    pub max_tokens: u32,

    // --- 评分配置 ---
    /// 标准答案缺少分值时使用的默认分值
    pub default_item_weight: f64,
    /// 只识别前 N 道选择题（None 表示全部）
    pub multiple_choice_limit: Option<usize>,
    /// 同时批改的学生数量
    pub max_concurrent_students: usize,

    // --- 输入输出 ---
    /// 考试标识（写入标准答案文件）
    pub exam_id: String,
    /// 题目/标准答案图片目录
    pub master_key_dir: PathBuf,
    /// 标准答案 TOML 文件（存在时直接加载，不再调用模型）
    pub master_key_file: PathBuf,
    /// 学生答卷目录，每个子目录一个学生
    pub students_dir: PathBuf,
    /// 成绩表 CSV
    pub export_file: PathBuf,
    /// 班级分析报告（Markdown）
    pub report_file: PathBuf,
    /// 是否生成班级分析报告
    pub generate_report: bool,

    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 需要人工复核的学生记录
    pub warn_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai/".to_string(),
            llm_model_name: "gemini-2.5-flash-lite".to_string(),
            llm_fallback_models: vec!["gemini-2.5-flash".to_string()],
            request_timeout_secs: 60,
            master_key_temperature: 0.3,
            transcript_temperature: 0.2,
            report_temperature: 0.5,
            max_tokens: 4096,
            default_item_weight: 1.0,
            multiple_choice_limit: None,
            max_concurrent_students: 4,
            exam_id: "exam".to_string(),
            master_key_dir: PathBuf::from("input/master_key"),
            master_key_file: PathBuf::from("output/master_key.toml"),
            students_dir: PathBuf::from("input/students"),
            export_file: PathBuf::from("output/grades.csv"),
            report_file: PathBuf::from("output/class_report.md"),
            generate_report: false,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            warn_file: PathBuf::from("warn.txt"),
        }
    }
}

impl Config {
    /// 默认配置 + 环境变量覆盖
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载，再应用环境变量覆盖
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        })?;

        Ok(config.with_env_overrides())
    }

    /// 环境变量优先；无法解析的值保留原值
    pub fn with_env_overrides(self) -> Self {
        Self {
            llm_api_key: env_string("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            llm_fallback_models: env_string("LLM_FALLBACK_MODELS")
                .map(|v| parse_model_list(&v))
                .unwrap_or(self.llm_fallback_models),
            request_timeout_secs: env_parsed("REQUEST_TIMEOUT_SECS").unwrap_or(self.request_timeout_secs),
            master_key_temperature: env_parsed("MASTER_KEY_TEMPERATURE").unwrap_or(self.master_key_temperature),
            transcript_temperature: env_parsed("TRANSCRIPT_TEMPERATURE").unwrap_or(self.transcript_temperature),
            report_temperature: env_parsed("REPORT_TEMPERATURE").unwrap_or(self.report_temperature),
            max_tokens: env_parsed("LLM_MAX_TOKENS").unwrap_or(self.max_tokens),
            default_item_weight: env_parsed("DEFAULT_ITEM_WEIGHT").unwrap_or(self.default_item_weight),
            multiple_choice_limit: env_parsed("MULTIPLE_CHOICE_LIMIT").or(self.multiple_choice_limit),
            max_concurrent_students: env_parsed("MAX_CONCURRENT_STUDENTS").unwrap_or(self.max_concurrent_students),
            exam_id: env_string("EXAM_ID").unwrap_or(self.exam_id),
            master_key_dir: env_string("MASTER_KEY_DIR").map(PathBuf::from).unwrap_or(self.master_key_dir),
            master_key_file: env_string("MASTER_KEY_FILE").map(PathBuf::from).unwrap_or(self.master_key_file),
            students_dir: env_string("STUDENTS_DIR").map(PathBuf::from).unwrap_or(self.students_dir),
            export_file: env_string("EXPORT_FILE").map(PathBuf::from).unwrap_or(self.export_file),
            report_file: env_string("REPORT_FILE").map(PathBuf::from).unwrap_or(self.report_file),
            generate_report: env_parsed("GENERATE_REPORT").unwrap_or(self.generate_report),
            verbose_logging: env_parsed("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            output_log_file: env_string("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
            warn_file: env_string("WARN_FILE").map(PathBuf::from).unwrap_or(self.warn_file),
        }
    }

    /// 启动前校验，缺少 API Key 等问题在这里以结构化错误返回
    pub fn validate(&self) -> AppResult<()> {
        if self.llm_api_key.trim().is_empty() {
            return Err(AppError::config_missing("llm_api_key"));
        }
        if self.llm_api_base_url.trim().is_empty() {
            return Err(AppError::config_missing("llm_api_base_url"));
        }
        if self.llm_model_name.trim().is_empty() {
            return Err(AppError::config_missing("llm_model_name"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "必须大于 0"));
        }
        if self.max_concurrent_students == 0 {
            return Err(invalid("max_concurrent_students", "必须大于 0"));
        }
        if !self.default_item_weight.is_finite() || self.default_item_weight < 0.0 {
            return Err(invalid("default_item_weight", "必须是非负数"));
        }
        if self.multiple_choice_limit == Some(0) {
            return Err(invalid("multiple_choice_limit", "必须大于 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 按尝试顺序排列的模型列表（首选模型在前，去重）
    pub fn model_candidates(&self) -> Vec<String> {
        let mut models: Vec<String> = Vec::with_capacity(1 + self.llm_fallback_models.len());
        for model in std::iter::once(&self.llm_model_name).chain(&self.llm_fallback_models) {
            let model = model.trim();
            if !model.is_empty() && !models.iter().any(|m| m == model) {
                models.push(model.to_string());
            }
        }
        models
    }
}

fn invalid(name: &str, reason: &str) -> AppError {
    AppError::Config(ConfigError::Invalid {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_model_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}
