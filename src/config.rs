use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppResult, ConfigError};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_FILE: &str = "gemremover.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 每批同时还原的图片数量
    pub max_concurrent_images: usize,
    /// 待处理图片所在目录
    pub input_folder: String,
    /// 还原结果输出目录
    pub output_folder: String,
    /// 48px 水印透明度图
    pub alpha_map_small: String,
    /// 96px 水印透明度图
    pub alpha_map_large: String,
    /// 单次去水印调用的超时秒数（None 表示不限时）
    pub engine_timeout_secs: Option<u64>,
    /// 是否总是打包下载全部结果
    pub download_all: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_images: 3,
            input_folder: "input".to_string(),
            output_folder: "output".to_string(),
            alpha_map_small: "assets/bg_48.png".to_string(),
            alpha_map_large: "assets/bg_96.png".to_string(),
            engine_timeout_secs: None,
            download_all: false,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 读取配置文件（如果存在），再用环境变量覆盖
    ///
    /// 配置文件路径取自 `GEMREMOVER_CONFIG`，未设置时使用 `gemremover.toml`。
    pub fn load() -> AppResult<Self> {
        let path = std::env::var("GEMREMOVER_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let config = if Path::new(&path).exists() {
            Self::from_file(&path)?.with_env_overrides()
        } else {
            Self::from_env()
        };

        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置，缺省字段使用默认值
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::AppError::file_read_failed(path, e))?;
        Self::from_toml_str(&content, path)
    }

    fn from_toml_str(content: &str, path: &Path) -> AppResult<Self> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::ParseFailed {
            path: PathBuf::from(path),
            source,
        })?;
        Ok(config)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            max_concurrent_images: std::env::var("MAX_CONCURRENT_IMAGES").ok().and_then(|v| v.parse().ok()).unwrap_or(self.max_concurrent_images),
            input_folder: std::env::var("INPUT_FOLDER").unwrap_or(self.input_folder),
            output_folder: std::env::var("OUTPUT_FOLDER").unwrap_or(self.output_folder),
            alpha_map_small: std::env::var("ALPHA_MAP_SMALL").unwrap_or(self.alpha_map_small),
            alpha_map_large: std::env::var("ALPHA_MAP_LARGE").unwrap_or(self.alpha_map_large),
            engine_timeout_secs: match std::env::var("ENGINE_TIMEOUT_SECS").ok().and_then(|v| v.parse::<u64>().ok()) {
                Some(0) => None,
                Some(secs) => Some(secs),
                None => self.engine_timeout_secs,
            },
            download_all: std::env::var("DOWNLOAD_ALL").ok().and_then(|v| v.parse().ok()).unwrap_or(self.download_all),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> AppResult<()> {
        if self.max_concurrent_images == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_concurrent_images".to_string(),
                value: "0".to_string(),
                reason: "并发数必须大于 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// 去水印调用超时（0 视为不限时）
    pub fn engine_timeout(&self) -> Option<Duration> {
        self.engine_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
