//! 设置存储 - 持久化批次编号
//!
//! ## 职责
//!
//! - 维护唯一的持久化状态：下一个批次编号（`settings.json`）
//! - 首次访问时立即创建并落盘默认记录
//! - 保存时先写临时文件再原子改名，保证崩溃后旧记录仍然可读
//!
//! 不加锁：本程序假定同一设置目录下同时只有一个进程在运行

use crate::error::{AppError, AppResult, SettingsError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 持久化的批次状态
///
/// 字段名沿用既有 settings.json 的 `batchID`，保持与历史数据兼容
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchState {
    /// 下一个批次编号，恒 ≥ 1，每完成一次运行加 1
    #[serde(rename = "batchID")]
    pub next_batch_id: u64,
}

impl Default for BatchState {
    fn default() -> Self {
        Self { next_batch_id: 1 }
    }
}

/// 设置存储
pub struct SettingsStore {
    data_dir: PathBuf,
    settings_file: PathBuf,
}

impl SettingsStore {
    /// 创建设置存储，`data_dir` 下存放 `settings.json`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let settings_file = data_dir.join("settings.json");
        Self {
            data_dir,
            settings_file,
        }
    }

    /// 加载批次状态
    ///
    /// 文件不存在时创建默认状态并立即落盘（这样即使创建后立刻崩溃，
    /// 磁盘上也有一份合法记录）；文件存在但无法解析时报 `Corrupt`
    pub fn load(&self) -> AppResult<BatchState> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            AppError::Settings(SettingsError::WriteFailed {
                path: self.data_dir.display().to_string(),
                source: Box::new(e),
            })
        })?;

        if !self.settings_file.exists() {
            let state = BatchState::default();
            info!("📄 设置文件不存在，创建默认设置: {}", self.settings_file.display());
            self.save(&state)?;
            return Ok(state);
        }

        let raw = fs::read_to_string(&self.settings_file).map_err(|e| {
            AppError::Settings(SettingsError::ReadFailed {
                path: self.settings_file.display().to_string(),
                source: Box::new(e),
            })
        })?;

        let state: BatchState = serde_json::from_str(&raw)
            .map_err(|e| AppError::settings_corrupt(self.settings_file.display().to_string(), e))?;

        // 批次编号恒 ≥ 1，为 0 说明记录被改坏了
        if state.next_batch_id == 0 {
            return Err(AppError::Settings(SettingsError::Corrupt {
                path: self.settings_file.display().to_string(),
                source: "batchID 必须 ≥ 1".into(),
            }));
        }

        debug!("设置已加载: 下一批次编号 = {}", state.next_batch_id);
        Ok(state)
    }

    /// 保存批次状态
    ///
    /// 先写 `settings.json.tmp` 再改名覆盖，失败时磁盘上的旧记录不受影响
    pub fn save(&self, state: &BatchState) -> AppResult<()> {
        let tmp_file = self.data_dir.join("settings.json.tmp");

        let json = serde_json::to_string(state).map_err(|e| {
            AppError::Settings(SettingsError::WriteFailed {
                path: self.settings_file.display().to_string(),
                source: Box::new(e),
            })
        })?;

        fs::write(&tmp_file, json).map_err(|e| {
            AppError::Settings(SettingsError::WriteFailed {
                path: tmp_file.display().to_string(),
                source: Box::new(e),
            })
        })?;

        fs::rename(&tmp_file, &self.settings_file).map_err(|e| {
            AppError::Settings(SettingsError::WriteFailed {
                path: self.settings_file.display().to_string(),
                source: Box::new(e),
            })
        })?;

        debug!("设置已保存: 下一批次编号 = {}", state.next_batch_id);
        Ok(())
    }

    /// 设置文件路径（测试用）
    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }
}
