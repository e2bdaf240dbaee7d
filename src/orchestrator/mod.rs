//! 编排层
//!
//! `batch_pipeline` 是整个应用的核心：驱动一个批次从编号获取、
//! 工作区准备、逐图处理到批次编号推进的完整流程

pub mod batch_pipeline;

pub use batch_pipeline::BatchPipeline;
