//! # Config 模块
//!
//! 播放器配置。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// 播放器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// 帧率
    #[serde(default = "default_fps")]
    pub fps: f64,

    /// 播放帧数
    #[serde(default = "default_frames")]
    pub frames: u32,

    /// 每隔多少帧采样一次目标属性
    #[serde(default = "default_sample_every")]
    pub sample_every: u32,

    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 报告中附带编译后的步骤表
    #[serde(default)]
    pub dump_steps: bool,
}

// 默认值函数
fn default_fps() -> f64 {
    60.0
}

fn default_frames() -> u32 {
    120
}

fn default_sample_every() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            frames: default_frames(),
            sample_every: default_sample_every(),
            log_level: default_log_level(),
            dump_steps: false,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl HostConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;
        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ConfigError::ValidationFailed(format!(
                "帧率必须为正数: {}",
                self.fps
            )));
        }

        if self.sample_every == 0 {
            return Err(ConfigError::ValidationFailed(
                "sample_every 必须大于 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "未知日志级别: {}",
                self.log_level
            )));
        }

        Ok(())
    }

    /// 每帧时长（毫秒）
    pub fn frame_ms(&self) -> f64 {
        1000.0 / self.fps
    }
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),

    /// IO 错误
    #[error("配置文件 IO 错误: {0}")]
    IoError(String),

    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.fps, 60.0);
        assert_eq!(config.frames, 120);
        assert_eq!(config.sample_every, 1);
        assert!(!config.dump_steps);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: HostConfig = serde_json::from_str(r#"{"fps": 30, "dump_steps": true}"#).unwrap();
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.frames, 120);
        assert_eq!(config.log_level, "info");
        assert!(config.dump_steps);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = HostConfig::default();
        config.fps = 0.0;
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.fps = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.sample_every = 0;
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.log_level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let config = HostConfig::load("/nonexistent/config.json");
        assert_eq!(config, HostConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = HostConfig {
            fps: 24.0,
            frames: 48,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(HostConfig::load(&path), config);
    }
}
