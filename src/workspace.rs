//! 批次工作区管理 - 目录与提示词
//!
//! ## 职责
//!
//! - 按批次编号创建（或复用）图片归档目录和响应输出目录
//! - 校验提示词文件存在且非空，校验不通过则整次运行不开始
//! - 枚举待处理图片（仅 jpg / png，按文件名排序保证可复现）
//! - 提供防覆盖的文件搬移能力（重名时追加序号后缀）

use crate::config::Config;
use crate::error::{AppError, AppResult, FileError, WorkspaceError};
use crate::models::PendingImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 接受的图片扩展名
const IMAGE_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// 单次运行的批次工作区
#[derive(Clone, Debug)]
pub struct BatchWorkspace {
    pub batch_id: u64,
    /// 处理成功的图片归档到这里：`input_images/batch_<N>`
    pub input_folder: PathBuf,
    /// 响应文本写到这里：`output_responses/batch_<N>`
    pub output_folder: PathBuf,
}

/// 批次工作区管理器
pub struct WorkspaceManager {
    input_images_dir: PathBuf,
    output_dir: PathBuf,
}

impl WorkspaceManager {
    /// 从配置创建工作区管理器
    pub fn new(config: &Config) -> Self {
        Self {
            input_images_dir: config.input_images_dir.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// 准备批次工作区
    ///
    /// 幂等：目录已存在时视为成功，支持批次编号未推进时的安全重跑。
    /// 目录创建失败或提示词校验失败都会在处理任何图片之前终止运行
    pub fn prepare(&self, batch_id: u64) -> AppResult<BatchWorkspace> {
        let input_folder = self.input_images_dir.join(format!("batch_{}", batch_id));
        let output_folder = self.output_dir.join(format!("batch_{}", batch_id));

        for folder in [&input_folder, &output_folder] {
            fs::create_dir_all(folder).map_err(|e| {
                AppError::Workspace(WorkspaceError::CreateDirFailed {
                    path: folder.display().to_string(),
                    source: Box::new(e),
                })
            })?;
        }

        // 提示词校验是整次运行的闸门
        self.read_prompt()?;

        info!("📁 批次 {} 工作区就绪", batch_id);
        debug!(
            "归档目录: {} | 输出目录: {}",
            input_folder.display(),
            output_folder.display()
        );

        Ok(BatchWorkspace {
            batch_id,
            input_folder,
            output_folder,
        })
    }

    /// 读取提示词
    ///
    /// 每次运行都重新读取，运行之间操作者可能会修改提示词文件
    pub fn read_prompt(&self) -> AppResult<String> {
        let prompt_file = self.input_images_dir.join("prompt.txt");

        if !prompt_file.exists() {
            return Err(AppError::prompt_missing(prompt_file.display().to_string()));
        }

        let prompt = fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::File(FileError::ReadFailed {
                path: prompt_file.display().to_string(),
                source: Box::new(e),
            })
        })?;

        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(AppError::prompt_empty(prompt_file.display().to_string()));
        }

        Ok(prompt)
    }

    /// 枚举待处理图片
    ///
    /// 只看 `input_images/` 的第一层，跳过子目录（历史批次的归档目录就在这里），
    /// 扩展名匹配不区分大小写，结果按文件名排序
    pub fn pending_images(&self) -> AppResult<Vec<PendingImage>> {
        let entries = fs::read_dir(&self.input_images_dir).map_err(|e| {
            AppError::File(FileError::ReadDirFailed {
                path: self.input_images_dir.display().to_string(),
                source: Box::new(e),
            })
        })?;

        let mut images = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                AppError::File(FileError::ReadDirFailed {
                    path: self.input_images_dir.display().to_string(),
                    source: Box::new(e),
                })
            })?;

            let path = entry.path();
            if !path.is_file() || !is_image_file(&path) {
                continue;
            }

            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s.to_string(),
                None => continue,
            };
            let file_name = match path.file_name().and_then(|s| s.to_str()) {
                Some(s) => s.to_string(),
                None => continue,
            };

            images.push(PendingImage {
                path,
                stem,
                file_name,
            });
        }

        images.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(images)
    }
}

/// 判断是否为接受的图片文件
fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// 把文件搬移到目标目录，重名时追加 `_1`、`_2`… 后缀直到找到空位
///
/// 永远不会覆盖已有文件；返回实际落盘的目标路径
pub fn relocate_with_unique_name(src: &Path, dest_dir: &Path) -> Result<PathBuf, FileError> {
    let file_name = src
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");
    let stem = src.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed");
    let ext = src.extension().and_then(|s| s.to_str());

    let mut dest = dest_dir.join(file_name);
    let mut suffix = 1u32;
    while dest.exists() {
        let candidate = match ext {
            Some(ext) => format!("{}_{}.{}", stem, suffix, ext),
            None => format!("{}_{}", stem, suffix),
        };
        dest = dest_dir.join(candidate);
        suffix += 1;
    }

    fs::rename(src, &dest).map_err(|e| FileError::RenameFailed {
        from: src.display().to_string(),
        to: dest.display().to_string(),
        source: Box::new(e),
    })?;

    Ok(dest)
}
