use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 配置错误
    Config(ConfigError),
    /// 设置存储错误
    Settings(SettingsError),
    /// 批次工作区错误
    Workspace(WorkspaceError),
    /// 推理服务错误
    Inference(InferenceError),
    /// 文件操作错误
    File(FileError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Settings(e) => write!(f, "设置存储错误: {}", e),
            AppError::Workspace(e) => write!(f, "工作区错误: {}", e),
            AppError::Inference(e) => write!(f, "推理错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Settings(e) => Some(e),
            AppError::Workspace(e) => Some(e),
            AppError::Inference(e) => Some(e),
            AppError::File(e) => Some(e),
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量不存在
    EnvVarNotFound {
        var_name: String,
    },
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarNotFound { var_name } => {
                write!(f, "环境变量 {} 不存在", var_name)
            }
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// 设置存储错误
#[derive(Debug)]
pub enum SettingsError {
    /// 设置记录损坏（存在但无法解析）
    Corrupt {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 读取设置失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入设置失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Corrupt { path, source } => {
                write!(f, "设置记录损坏 ({}): {}", path, source)
            }
            SettingsError::ReadFailed { path, source } => {
                write!(f, "读取设置失败 ({}): {}", path, source)
            }
            SettingsError::WriteFailed { path, source } => {
                write!(f, "写入设置失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Corrupt { source, .. }
            | SettingsError::ReadFailed { source, .. }
            | SettingsError::WriteFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 批次工作区错误
#[derive(Debug)]
pub enum WorkspaceError {
    /// 提示词文件不存在
    PromptMissing {
        path: String,
    },
    /// 提示词文件为空
    PromptEmpty {
        path: String,
    },
    /// 创建批次目录失败
    CreateDirFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceError::PromptMissing { path } => {
                write!(f, "提示词文件不存在: {}", path)
            }
            WorkspaceError::PromptEmpty { path } => {
                write!(f, "提示词文件为空: {}", path)
            }
            WorkspaceError::CreateDirFailed { path, source } => {
                write!(f, "创建批次目录失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkspaceError::CreateDirFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 推理服务错误
///
/// 按调用结果分类：网络/超时、HTTP 状态码、响应结构不符合预期
#[derive(Debug)]
pub enum InferenceError {
    /// 网络请求失败（包括超时）
    Transport {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务返回非 2xx 状态码
    HttpStatus {
        endpoint: String,
        status: u16,
    },
    /// 响应中缺少预期的内容字段
    UnexpectedPayload {
        detail: String,
    },
    /// 读取图片文件失败
    ImageRead {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::Transport { endpoint, source } => {
                write!(f, "推理请求失败 ({}): {}", endpoint, source)
            }
            InferenceError::HttpStatus { endpoint, status } => {
                write!(f, "推理服务返回错误状态码 ({}): HTTP {}", endpoint, status)
            }
            InferenceError::UnexpectedPayload { detail } => {
                write!(f, "推理响应格式不符合预期: {}", detail)
            }
            InferenceError::ImageRead { path, source } => {
                write!(f, "读取图片失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for InferenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InferenceError::Transport { source, .. }
            | InferenceError::ImageRead { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 移动文件失败
    RenameFailed {
        from: String,
        to: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 枚举目录失败
    ReadDirFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            FileError::RenameFailed { from, to, source } => {
                write!(f, "移动文件失败 ({} -> {}): {}", from, to, source)
            }
            FileError::ReadDirFailed { path, source } => {
                write!(f, "枚举目录失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::RenameFailed { source, .. }
            | FileError::ReadDirFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

// ========== 从子错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        AppError::Settings(err)
    }
}

impl From<WorkspaceError> for AppError {
    fn from(err: WorkspaceError) -> Self {
        AppError::Workspace(err)
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        AppError::Inference(err)
    }
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        AppError::File(err)
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建环境变量缺失错误
    pub fn env_var_not_found(var_name: impl Into<String>) -> Self {
        AppError::Config(ConfigError::EnvVarNotFound {
            var_name: var_name.into(),
        })
    }

    /// 创建提示词缺失错误
    pub fn prompt_missing(path: impl Into<String>) -> Self {
        AppError::Workspace(WorkspaceError::PromptMissing { path: path.into() })
    }

    /// 创建提示词为空错误
    pub fn prompt_empty(path: impl Into<String>) -> Self {
        AppError::Workspace(WorkspaceError::PromptEmpty { path: path.into() })
    }

    /// 创建设置记录损坏错误
    pub fn settings_corrupt(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Settings(SettingsError::Corrupt {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
