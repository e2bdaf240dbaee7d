//! 视觉推理客户端
//!
//! 封装与 OpenAI 兼容的 chat/completions 视觉端点（LM Studio 等）的交互：
//! 读取图片、base64 编码进 data URL、发送请求、提取响应文本。
//! 流水线只依赖 `ImageAnnotator` trait，测试时可以注入假实现

use crate::config::Config;
use crate::error::InferenceError;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// 图片标注能力
///
/// 输入一张图片和提示词，返回模型生成的描述文本，
/// 失败按网络、HTTP 状态码、响应结构三类上报
#[async_trait]
pub trait ImageAnnotator: Send + Sync {
    async fn describe(&self, image_path: &Path, prompt: &str) -> Result<String, InferenceError>;
}

/// 基于 reqwest 的视觉客户端
pub struct VisionClient {
    http: reqwest::Client,
    api_url: String,
    model_name: String,
    temperature: f64,
}

impl VisionClient {
    /// 从配置创建客户端，带单次请求超时
    pub fn new(config: &Config) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| InferenceError::Transport {
                endpoint: config.llm_api_url.clone(),
                source: Box::new(e),
            })?;

        Ok(Self {
            http,
            api_url: config.llm_api_url.clone(),
            model_name: config.llm_model_name.clone(),
            temperature: config.temperature,
        })
    }

    /// 构建 chat/completions 请求体
    ///
    /// 图片以 `data:<mime>;base64,...` 形式内嵌在用户消息里
    fn build_payload(&self, prompt: &str, image_data_url: &str) -> Value {
        json!({
            "model": self.model_name,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": prompt },
                        {
                            "type": "image_url",
                            "image_url": { "url": image_data_url }
                        }
                    ]
                }
            ],
            "temperature": self.temperature
        })
    }
}

#[async_trait]
impl ImageAnnotator for VisionClient {
    async fn describe(&self, image_path: &Path, prompt: &str) -> Result<String, InferenceError> {
        let image_bytes = fs::read(image_path).map_err(|e| InferenceError::ImageRead {
            path: image_path.display().to_string(),
            source: Box::new(e),
        })?;

        let mime = mime_guess::from_path(image_path).first_or_octet_stream();
        let encoded = general_purpose::STANDARD.encode(&image_bytes);
        let data_url = format!("data:{};base64,{}", mime.essence_str(), encoded);

        debug!(
            "调用视觉模型: {} | 图片: {} ({} 字节)",
            self.model_name,
            image_path.display(),
            image_bytes.len()
        );

        let response = self
            .http
            .post(&self.api_url)
            .json(&self.build_payload(prompt, &data_url))
            .send()
            .await
            .map_err(|e| InferenceError::Transport {
                endpoint: self.api_url.clone(),
                source: Box::new(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::HttpStatus {
                endpoint: self.api_url.clone(),
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| InferenceError::UnexpectedPayload {
                detail: format!("响应不是合法 JSON: {}", e),
            })?;

        extract_content(&body)
    }
}

/// 从响应 JSON 中提取 `choices[0].message.content`
fn extract_content(body: &Value) -> Result<String, InferenceError> {
    body.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| InferenceError::UnexpectedPayload {
            detail: format!("缺少 choices[0].message.content: {}", truncate_text(&body.to_string(), 200)),
        })
}

/// 截断长文本用于错误信息
fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
