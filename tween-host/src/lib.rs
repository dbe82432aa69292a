//! # Tween Host
//!
//! tween-runtime 的无界面宿主：从 JSON 场景装配目标和 tween，按固定帧率
//! 推进时钟，并把目标属性的变化记录为播放报告。
//!
//! Host 层不包含时间轴逻辑，只负责装配、驱动和输出。

pub mod config;
pub mod player;
pub mod scene;

pub use config::{ConfigError, HostConfig};
pub use player::{FrameSample, PlaybackReport, Player};
pub use scene::{CallRecord, CommandSpec, Scene, SceneError, SceneFile, TargetSnapshot};
