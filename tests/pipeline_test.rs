//! 批次流水线集成测试
//!
//! 通过注入假的视觉客户端来驱动完整流程，不发任何真实请求

use async_trait::async_trait;
use batch_image_annotate::error::{AppError, InferenceError, WorkspaceError};
use batch_image_annotate::{
    BatchPipeline, Config, ImageAnnotator, ImageStatus, ProcessingResult, ProgressSink,
    RunSummary, SettingsStore,
};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// 固定返回同一段文本的假客户端
struct FixedAnnotator {
    text: String,
}

#[async_trait]
impl ImageAnnotator for FixedAnnotator {
    async fn describe(&self, _image_path: &Path, _prompt: &str) -> Result<String, InferenceError> {
        Ok(self.text.clone())
    }
}

/// 对指定文件名返回失败的假客户端
struct FailOnName {
    fail_name: String,
    text: String,
}

#[async_trait]
impl ImageAnnotator for FailOnName {
    async fn describe(&self, image_path: &Path, _prompt: &str) -> Result<String, InferenceError> {
        let name = image_path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if name == self.fail_name {
            return Err(InferenceError::UnexpectedPayload {
                detail: "测试注入的失败".to_string(),
            });
        }
        Ok(self.text.clone())
    }
}

/// 收集进度事件的 sink
#[derive(Default)]
struct CollectingSink {
    done: Mutex<Vec<ProcessingResult>>,
    summary: Mutex<Option<RunSummary>>,
}

impl ProgressSink for CollectingSink {
    fn on_image_start(&self, _image_name: &str, _index: usize, _total: usize) {}

    fn on_image_done(&self, result: &ProcessingResult) {
        self.done.lock().unwrap().push(result.clone());
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        *self.summary.lock().unwrap() = Some(summary.clone());
    }
}

/// 在临时目录里搭建标准目录结构
fn test_config(root: &Path) -> Config {
    let config = Config {
        input_images_dir: root.join("input_images"),
        output_dir: root.join("output_responses"),
        data_dir: root.join("data"),
        ..Config::default()
    };
    fs::create_dir_all(&config.input_images_dir).unwrap();
    config
}

fn write_prompt(config: &Config) {
    fs::write(config.input_images_dir.join("prompt.txt"), "描述这张图片").unwrap();
}

fn write_image(config: &Config, name: &str) {
    fs::write(config.input_images_dir.join(name), b"fake image").unwrap();
}

fn pipeline_with(
    config: &Config,
    annotator: impl ImageAnnotator + 'static,
) -> (BatchPipeline, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::default());
    let pipeline = BatchPipeline::new(config.clone(), Arc::new(annotator), sink.clone());
    (pipeline, sink)
}

fn next_batch_id(config: &Config) -> u64 {
    SettingsStore::new(config.data_dir.clone())
        .load()
        .unwrap()
        .next_batch_id
}

#[tokio::test]
async fn test_empty_run_does_not_advance_batch_id() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_prompt(&config);

    let (pipeline, _sink) = pipeline_with(
        &config,
        FixedAnnotator {
            text: "desc".to_string(),
        },
    );
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.total_images, 0);
    assert_eq!(summary.success_count, 0);
    assert_eq!(summary.fail_count, 0);
    // 空输入集不算完成的批次
    assert_eq!(next_batch_id(&config), 1);
}

#[tokio::test]
async fn test_full_batch_scenario() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_prompt(&config);
    write_image(&config, "a.png");
    write_image(&config, "b.jpg");

    // 预置批次编号 3
    let store = SettingsStore::new(config.data_dir.clone());
    store.load().unwrap();
    store
        .save(&batch_image_annotate::BatchState { next_batch_id: 3 })
        .unwrap();

    let (pipeline, sink) = pipeline_with(
        &config,
        FixedAnnotator {
            text: "desc".to_string(),
        },
    );
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.batch_id, 3);
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.fail_count, 0);

    // 响应文件内容正确
    let out = config.output_dir.join("batch_3");
    assert_eq!(fs::read_to_string(out.join("a.txt")).unwrap(), "desc");
    assert_eq!(fs::read_to_string(out.join("b.txt")).unwrap(), "desc");

    // 源图片已归档
    let archive = config.input_images_dir.join("batch_3");
    assert!(archive.join("a.png").exists());
    assert!(archive.join("b.jpg").exists());
    assert!(!config.input_images_dir.join("a.png").exists());
    assert!(!config.input_images_dir.join("b.jpg").exists());

    // 批次编号推进到 4
    assert_eq!(next_batch_id(&config), 4);

    // sink 收到了每张图片的完成事件
    assert_eq!(sink.done.lock().unwrap().len(), 2);
    assert!(sink.summary.lock().unwrap().is_some());
}

#[tokio::test]
async fn test_per_image_failure_is_isolated() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        // 用并发池跑，计数依然不能丢
        max_concurrent_images: 3,
        ..test_config(dir.path())
    };
    write_prompt(&config);
    write_image(&config, "a.jpg");
    write_image(&config, "b.jpg");
    write_image(&config, "c.jpg");

    let (pipeline, sink) = pipeline_with(
        &config,
        FailOnName {
            fail_name: "b.jpg".to_string(),
            text: "desc".to_string(),
        },
    );
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.total_images, 3);
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.fail_count, 1);

    // 失败的图片留在原地，等下次运行重试
    assert!(config.input_images_dir.join("b.jpg").exists());
    assert!(!config.output_dir.join("batch_1/b.txt").exists());

    // 其余图片正常走完
    assert!(config.input_images_dir.join("batch_1/a.jpg").exists());
    assert!(config.input_images_dir.join("batch_1/c.jpg").exists());

    // 有失败也算完成，批次编号照常推进
    assert_eq!(next_batch_id(&config), 2);

    let failed: Vec<_> = sink
        .done
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.status == ImageStatus::Failed)
        .map(|r| r.image_name.clone())
        .collect();
    assert_eq!(failed, vec!["b.jpg"]);
}

#[tokio::test]
async fn test_prompt_missing_aborts_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_image(&config, "a.png");
    // 不写 prompt.txt

    let (pipeline, sink) = pipeline_with(
        &config,
        FixedAnnotator {
            text: "desc".to_string(),
        },
    );
    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Workspace(WorkspaceError::PromptMissing { .. }))
    ));

    // 图片一张没动，批次编号没推进，也没有任何汇总
    assert!(config.input_images_dir.join("a.png").exists());
    assert_eq!(next_batch_id(&config), 1);
    assert!(sink.summary.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_batch_id_monotonic_across_runs() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_prompt(&config);

    write_image(&config, "first.png");
    let (pipeline, _) = pipeline_with(
        &config,
        FixedAnnotator {
            text: "desc".to_string(),
        },
    );
    pipeline.run().await.unwrap();
    assert_eq!(next_batch_id(&config), 2);

    // 第二次运行处理新图片，编号继续 +1
    write_image(&config, "second.png");
    let (pipeline, _) = pipeline_with(
        &config,
        FixedAnnotator {
            text: "desc".to_string(),
        },
    );
    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.batch_id, 2);
    assert_eq!(next_batch_id(&config), 3);
    assert!(config.input_images_dir.join("batch_2/second.png").exists());
}

#[tokio::test]
async fn test_relocation_collision_keeps_both_files() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_prompt(&config);
    write_image(&config, "a.png");

    // 归档目录里已经有一个同名文件（上一次未推进编号的重跑会出现这种情况）
    let archive = config.input_images_dir.join("batch_1");
    fs::create_dir_all(&archive).unwrap();
    fs::write(archive.join("a.png"), b"previous run").unwrap();

    let (pipeline, _) = pipeline_with(
        &config,
        FixedAnnotator {
            text: "desc".to_string(),
        },
    );
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.success_count, 1);
    // 旧文件原样保留，新文件带后缀落盘
    assert_eq!(fs::read(archive.join("a.png")).unwrap(), b"previous run");
    assert_eq!(fs::read(archive.join("a_1.png")).unwrap(), b"fake image");
}

#[tokio::test]
async fn test_relocation_failure_loses_no_data() {
    // 复现逐图状态机的后两步：响应已写盘，搬移失败
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("a.png");
    fs::write(&src, b"image").unwrap();
    let artifact = dir.path().join("a.txt");
    fs::write(&artifact, "desc").unwrap();

    // 目标"目录"其实是个文件，rename 必然失败
    let bogus_dest = dir.path().join("not_a_dir");
    fs::write(&bogus_dest, b"").unwrap();

    let result = batch_image_annotate::workspace::relocate_with_unique_name(&src, &bogus_dest);
    assert!(result.is_err());

    // 响应文件和源图片都还在，两边都没有丢
    assert_eq!(fs::read_to_string(&artifact).unwrap(), "desc");
    assert!(src.exists());
}
