//! 日志初始化与持久错误记录

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// 默认 info 级别，可通过 RUST_LOG 覆盖；重复调用安全（测试里会多次初始化）
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

/// 把运行级错误追加到持久日志文件
///
/// 运行级错误除了控制台输出之外还要留下持久记录；
/// 记录本身失败时只能忽略，不能再引发新的错误
pub fn record_fatal(log_file: &Path, err: &anyhow::Error) {
    let line = format!(
        "{} - ERROR - {:#}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        err
    );
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_file) {
        let _ = file.write_all(line.as_bytes());
    }
}
