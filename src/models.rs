//! 核心数据模型
//!
//! 批次处理流程中流转的数据结构，全部为单次运行内的临时数据，
//! 唯一持久化的状态是 `settings::BatchState`

use std::path::PathBuf;
use std::time::Duration;

/// 一张待处理的图片
#[derive(Clone, Debug)]
pub struct PendingImage {
    /// 源文件完整路径
    pub path: PathBuf,
    /// 不含扩展名的文件名，用于生成输出文件名
    pub stem: String,
    /// 含扩展名的文件名，用于日志和搬移
    pub file_name: String,
}

/// 单张图片的处理状态（终态）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageStatus {
    /// 响应已保存且源文件已搬移
    Succeeded,
    /// 任一步骤失败（推理、写盘或搬移）
    Failed,
}

/// 单张图片的处理结果
#[derive(Clone, Debug)]
pub struct ProcessingResult {
    pub image_name: String,
    pub status: ImageStatus,
    /// 失败原因描述，成功时为 None
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl ProcessingResult {
    /// 创建成功结果
    pub fn succeeded(image_name: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            image_name: image_name.into(),
            status: ImageStatus::Succeeded,
            error: None,
            elapsed,
        }
    }

    /// 创建失败结果
    pub fn failed(
        image_name: impl Into<String>,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            image_name: image_name.into(),
            status: ImageStatus::Failed,
            error: Some(error.into()),
            elapsed,
        }
    }
}

/// 一次完整运行的汇总统计
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub batch_id: u64,
    pub total_images: usize,
    pub success_count: usize,
    pub fail_count: usize,
    pub total_elapsed: Duration,
    /// 平均每张图片耗时，空运行时为零
    pub avg_elapsed: Duration,
}

impl RunSummary {
    /// 空输入集的零值汇总
    pub fn empty(batch_id: u64) -> Self {
        Self {
            batch_id,
            total_images: 0,
            success_count: 0,
            fail_count: 0,
            total_elapsed: Duration::ZERO,
            avg_elapsed: Duration::ZERO,
        }
    }
}
