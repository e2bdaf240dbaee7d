use crate::error::{AppError, AppResult, ConfigError};
use std::path::PathBuf;

/// 程序配置
///
/// 所有配置项均可通过环境变量覆盖，目录类配置有固定默认值
#[derive(Clone, Debug)]
pub struct Config {
    /// 推理服务的 chat/completions 地址（必须通过环境变量提供）
    pub llm_api_url: String,
    /// 模型名称
    pub llm_model_name: String,
    /// 采样温度
    pub temperature: f64,
    /// 单次推理请求的超时时间（秒）
    pub request_timeout_secs: u64,
    /// 同时处理的图片数量（1 = 严格串行）
    pub max_concurrent_images: usize,
    /// 待处理图片目录
    pub input_images_dir: PathBuf,
    /// 响应输出目录
    pub output_dir: PathBuf,
    /// 设置数据目录（存放 settings.json）
    pub data_dir: PathBuf,
    /// 致命错误的持久日志文件
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_url: "http://localhost:1234/v1/chat/completions".to_string(),
            llm_model_name: "local-model".to_string(),
            temperature: 0.7,
            request_timeout_secs: 10,
            max_concurrent_images: 1,
            input_images_dir: PathBuf::from("input_images"),
            output_dir: PathBuf::from("output_responses"),
            data_dir: PathBuf::from("data"),
            log_file: PathBuf::from("processing.log"),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// `LLM_API_URL` 是必填项，缺失时直接报错终止；
    /// 其余变量缺失时使用默认值，数值变量解析失败时报错
    pub fn from_env() -> AppResult<Self> {
        let default = Self::default();
        Ok(Self {
            llm_api_url: std::env::var("LLM_API_URL")
                .map_err(|_| AppError::env_var_not_found("LLM_API_URL"))?,
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            temperature: parse_env_or("LLM_TEMPERATURE", default.temperature)?,
            request_timeout_secs: parse_env_or("LLM_TIMEOUT_SECS", default.request_timeout_secs)?,
            max_concurrent_images: parse_env_or(
                "MAX_CONCURRENT_IMAGES",
                default.max_concurrent_images,
            )?,
            input_images_dir: std::env::var("INPUT_IMAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.input_images_dir),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.output_dir),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.data_dir),
            log_file: std::env::var("LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(default.log_file),
        })
    }
}

/// 解析数值类环境变量，缺失时返回默认值，解析失败时报错
fn parse_env_or<T: std::str::FromStr>(var_name: &str, default: T) -> AppResult<T> {
    match std::env::var(var_name) {
        Ok(value) => value.parse().map_err(|_| {
            AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            })
        }),
        Err(_) => Ok(default),
    }
}
