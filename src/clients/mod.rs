//! 外部服务客户端

pub mod vision_client;

pub use vision_client::{ImageAnnotator, VisionClient};
