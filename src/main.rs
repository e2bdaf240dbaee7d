use anyhow::Result;
use batch_image_annotate::{logger, BatchPipeline, Config, ConsoleProgress, VisionClient};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env（不存在也没关系）
    dotenvy::dotenv().ok();

    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env()?;
    let log_file = config.log_file.clone();

    // 初始化并运行流水线
    let annotator = Arc::new(VisionClient::new(&config)?);
    let pipeline = BatchPipeline::new(config, annotator, Arc::new(ConsoleProgress));

    // 运行级错误上抛之前先写进持久日志
    if let Err(e) = pipeline.run().await {
        logger::record_fatal(&log_file, &e);
        return Err(e);
    }

    Ok(())
}
