//! 进度汇报 - 业务能力层
//!
//! 流水线只负责产生事件，怎么呈现由注入的 sink 决定，
//! 事件单向流出，sink 的任何状态都不会反向影响流水线

use crate::models::{ImageStatus, ProcessingResult, RunSummary};
use tracing::{error, info};

/// 进度事件接收端
pub trait ProgressSink: Send + Sync {
    /// 一张图片开始处理
    fn on_image_start(&self, image_name: &str, index: usize, total: usize);
    /// 一张图片处理结束（成功或失败）
    fn on_image_done(&self, result: &ProcessingResult);
    /// 整次运行结束
    fn on_run_complete(&self, summary: &RunSummary);
}

/// 控制台进度输出（走 tracing）
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn on_image_start(&self, image_name: &str, index: usize, total: usize) {
        info!("🖼️ [{}/{}] 正在处理: {}", index, total, image_name);
    }

    fn on_image_done(&self, result: &ProcessingResult) {
        match result.status {
            ImageStatus::Succeeded => {
                info!(
                    "✓ {} 处理完成 (耗时 {:.2} 秒)",
                    result.image_name,
                    result.elapsed.as_secs_f64()
                );
            }
            ImageStatus::Failed => {
                error!(
                    "❌ {} 处理失败: {}",
                    result.image_name,
                    result.error.as_deref().unwrap_or("未知错误")
                );
            }
        }
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        info!("\n{}", "=".repeat(60));
        info!("📊 批次处理汇总");
        info!(
            "完成时间: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        info!("{}", "=".repeat(60));
        info!("📦 批次编号: {}", summary.batch_id);
        info!("📄 图片总数: {}", summary.total_images);
        info!("✅ 成功: {}", summary.success_count);
        info!("❌ 失败: {}", summary.fail_count);
        info!(
            "⏱️ 总耗时: {:.2} 秒, 平均每张: {:.2} 秒",
            summary.total_elapsed.as_secs_f64(),
            summary.avg_elapsed.as_secs_f64()
        );
        info!("{}", "=".repeat(60));
    }
}
