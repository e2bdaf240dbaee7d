//! # Batch Image Annotate
//!
//! 把 `input_images/` 目录下的图片逐张送入视觉模型（LM Studio 等
//! OpenAI 兼容端点），响应文本落盘，处理过的图片归档到批次目录，
//! 批次编号持久化推进，保证多次运行不会重复处理
//!
//! ## 架构设计
//!
//! ### ① 基础能力层
//! - `settings` - 设置存储，持久化批次编号（原子落盘）
//! - `workspace` - 批次工作区，目录准备、提示词校验、防覆盖搬移
//! - `clients/vision_client` - 视觉推理客户端（`ImageAnnotator` trait 为边界）
//!
//! ### ② 汇报层
//! - `progress` - 进度事件 sink，流水线单向发事件，不依赖具体呈现
//!
//! ### ③ 编排层
//! - `orchestrator/batch_pipeline` - 核心流程：编号获取 → 工作区准备 →
//!   逐图状态机（推理/写盘/搬移）→ 批次推进 → 汇总
//!
//! ## 运行约束
//!
//! 同一设置目录同时只能有一个进程在运行（不加进程锁，操作约束）

pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod settings;
pub mod workspace;

// 重新导出常用类型
pub use clients::{ImageAnnotator, VisionClient};
pub use config::Config;
pub use error::{AppError, AppResult, InferenceError, WorkspaceError};
pub use models::{ImageStatus, PendingImage, ProcessingResult, RunSummary};
pub use orchestrator::BatchPipeline;
pub use progress::{ConsoleProgress, ProgressSink};
pub use settings::{BatchState, SettingsStore};
