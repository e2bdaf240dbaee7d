//! 批次处理流水线 - 编排层
//!
//! ## 职责
//!
//! 1. **批次编号获取**：运行开始时从设置存储读取当前批次编号
//! 2. **工作区准备**：创建批次目录、校验提示词（闸门，不通过不处理任何图片）
//! 3. **逐图处理**：推理 → 写响应文件 → 搬移源图片，单图失败互不影响
//! 4. **并发控制**：Semaphore 限制在途图片数量（默认 1，即严格串行）
//! 5. **批次推进**：全部图片处理完（无论成败）后批次编号恰好加 1 并落盘
//! 6. **统计汇总**：计数在单一收集循环里累加，不存在并发丢失更新
//!
//! ## 失败语义
//!
//! - 单图失败只计入 fail_count，运行继续，源文件留在原地等待下次重跑
//! - 空输入集不算完成的批次，批次编号不推进
//! - 批次编号落盘失败是致命错误：汇总照常输出，但错误必须上抛，
//!   下次运行会用同一批次编号安全重做（允许重复处理，不允许丢数据）
//!
//! 不做任何单图重试：重试的唯一方式是重新运行整个程序

use crate::clients::ImageAnnotator;
use crate::config::Config;
use crate::error::FileError;
use crate::models::{ImageStatus, PendingImage, ProcessingResult, RunSummary};
use crate::progress::ProgressSink;
use crate::settings::{BatchState, SettingsStore};
use crate::workspace::{self, BatchWorkspace, WorkspaceManager};
use anyhow::Result;
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 批次处理流水线
pub struct BatchPipeline {
    config: Config,
    annotator: Arc<dyn ImageAnnotator>,
    sink: Arc<dyn ProgressSink>,
    settings: SettingsStore,
    workspace: WorkspaceManager,
}

impl BatchPipeline {
    /// 创建流水线，推理客户端和进度 sink 都是注入的依赖
    pub fn new(
        config: Config,
        annotator: Arc<dyn ImageAnnotator>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let settings = SettingsStore::new(config.data_dir.clone());
        let workspace = WorkspaceManager::new(&config);
        Self {
            config,
            annotator,
            sink,
            settings,
            workspace,
        }
    }

    /// 运行一次完整的批次处理
    ///
    /// 每次进程执行调用一次。返回本次运行的汇总统计；
    /// 运行级错误（配置、工作区、批次推进）直接上抛
    pub async fn run(&self) -> Result<RunSummary> {
        // 1. 获取批次编号
        let state = self.settings.load()?;
        let batch_id = state.next_batch_id;

        log_run_start(batch_id);

        // 2. 准备工作区（失败则整次运行终止，计数和批次编号都不动）
        let ws = self.workspace.prepare(batch_id)?;

        // 提示词每次运行重新读取，运行之间可能被修改
        let prompt = self.workspace.read_prompt()?;

        // 3. 枚举待处理图片
        let images = self.workspace.pending_images()?;
        if images.is_empty() {
            warn!("⚠️ input_images 目录下没有待处理的图片，批次编号不推进");
            let summary = RunSummary::empty(batch_id);
            self.sink.on_run_complete(&summary);
            return Ok(summary);
        }

        let total = images.len();
        info!("✓ 找到 {} 张待处理图片", total);

        // 4. 逐图处理
        let run_started = Instant::now();
        let (success_count, fail_count) = self.process_all_images(images, &ws, &prompt).await?;

        // 5. 枚举已耗尽，批次视为完成（无论单图成败），批次编号恰好加 1
        let total_elapsed = run_started.elapsed();
        let summary = RunSummary {
            batch_id,
            total_images: total,
            success_count,
            fail_count,
            total_elapsed,
            avg_elapsed: total_elapsed / total as u32,
        };

        let next = BatchState {
            next_batch_id: batch_id + 1,
        };
        if let Err(e) = self.settings.save(&next) {
            // 汇总照常输出，但必须让操作者知道批次编号没有推进：
            // 下次运行会重新处理同一批次编号（安全重做，不会丢数据）
            self.sink.on_run_complete(&summary);
            error!(
                "❌ 批次编号推进失败，下次运行将重复处理批次 {}: {}",
                batch_id, e
            );
            return Err(e.into());
        }

        // 6. 汇总
        self.sink.on_run_complete(&summary);
        info!("🎉 批次 {} 处理完成，下一批次编号: {}", batch_id, batch_id + 1);

        Ok(summary)
    }

    /// 处理所有图片，返回 (成功数, 失败数)
    ///
    /// Semaphore 限制在途数量；所有计数只在收集循环里累加，
    /// 批次推进必须等到全部任务排空之后
    async fn process_all_images(
        &self,
        images: Vec<PendingImage>,
        ws: &BatchWorkspace,
        prompt: &str,
    ) -> Result<(usize, usize)> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_images.max(1)));
        let total = images.len();
        let ws = Arc::new(ws.clone());
        let prompt: Arc<str> = Arc::from(prompt);

        let mut handles = Vec::new();
        for (idx, image) in images.into_iter().enumerate() {
            let permit = semaphore.clone().acquire_owned().await?;
            self.sink.on_image_start(&image.file_name, idx + 1, total);

            let annotator = self.annotator.clone();
            let ws = ws.clone();
            let prompt = prompt.clone();
            let image_name = image.file_name.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                process_image(annotator.as_ref(), &ws, &prompt, &image).await
            });
            handles.push((image_name, handle));
        }

        // 等待全部任务完成，单一收集点累加计数
        let mut success_count = 0;
        let mut fail_count = 0;
        for (image_name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("[{}] 任务执行失败: {}", image_name, e);
                    ProcessingResult::failed(image_name, e.to_string(), std::time::Duration::ZERO)
                }
            };
            match result.status {
                ImageStatus::Succeeded => success_count += 1,
                ImageStatus::Failed => fail_count += 1,
            }
            self.sink.on_image_done(&result);
        }

        Ok((success_count, fail_count))
    }
}

/// 单张图片的状态机：推理 → 写响应 → 搬移，任一步失败即为该图终态
///
/// 永远不上抛错误：单图失败不允许影响运行和兄弟图片
async fn process_image(
    annotator: &dyn ImageAnnotator,
    ws: &BatchWorkspace,
    prompt: &str,
    image: &PendingImage,
) -> ProcessingResult {
    let started = Instant::now();

    // 推理：失败时源文件原地不动，下次运行自然重试
    let text = match annotator.describe(&image.path, prompt).await {
        Ok(text) => text,
        Err(e) => {
            error!("❌ [{}] 推理失败: {}", image.file_name, e);
            return ProcessingResult::failed(&image.file_name, e.to_string(), started.elapsed());
        }
    };

    // 写响应文件：失败时不尝试搬移源文件
    let artifact = ws.output_folder.join(format!("{}.txt", image.stem));
    if let Err(e) = fs::write(&artifact, &text) {
        let e = FileError::WriteFailed {
            path: artifact.display().to_string(),
            source: Box::new(e),
        };
        error!("❌ [{}] {}", image.file_name, e);
        return ProcessingResult::failed(&image.file_name, e.to_string(), started.elapsed());
    }

    // 搬移源图片：重名时自动加后缀，绝不覆盖。
    // 搬移失败是已识别的部分失败状态（响应已保存但源文件未动），计为失败并明确上报
    match workspace::relocate_with_unique_name(&image.path, &ws.input_folder) {
        Ok(dest) => {
            info!(
                "✓ [{}] 响应已保存: {} | 图片已归档: {}",
                image.file_name,
                artifact.display(),
                dest.display()
            );
            ProcessingResult::succeeded(&image.file_name, started.elapsed())
        }
        Err(e) => {
            error!(
                "⚠️ [{}] 响应已保存但源图片搬移失败: {}",
                image.file_name, e
            );
            ProcessingResult::failed(
                &image.file_name,
                format!("响应已保存但源图片搬移失败: {}", e),
                started.elapsed(),
            )
        }
    }
}

// ========== 日志辅助函数 ==========

fn log_run_start(batch_id: u64) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批次图片处理模式");
    info!("📦 当前批次编号: {}", batch_id);
    info!("{}", "=".repeat(60));
}
