//! 基础设施层
//!
//! 持有还原引擎这一外部能力，只暴露"去水印"接口

pub mod alpha_engine;
pub mod watermark_engine;

pub use alpha_engine::{AlphaMap, AlphaMapEngine};
pub use watermark_engine::{watermark_info_for, WatermarkEngine};
