//! # Player 模块
//!
//! 无界面播放器：按配置的帧率推进时钟，定期采样目标属性，输出播放报告。

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use tween_runtime::{StepSummary, Ticker, TweenEvent};

use crate::config::HostConfig;
use crate::scene::{CallRecord, SceneError, SceneFile, TargetSnapshot};

/// 一次采样
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSample {
    pub frame: u32,
    /// 时钟时间（毫秒）
    pub time: f64,
    pub targets: BTreeMap<String, TargetSnapshot>,
}

/// 播放报告
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackReport {
    pub scene: String,
    pub fps: f64,
    pub frames: Vec<FrameSample>,
    /// 播放完成的 tween：(名称, 完成帧)
    pub completed: Vec<(String, u32)>,
    pub calls: Vec<CallRecord>,
    /// 各 tween 的步骤表
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<BTreeMap<String, Vec<StepSummary>>>,
}

impl PlaybackReport {
    /// 最后一次采样
    pub fn last_frame(&self) -> Option<&FrameSample> {
        self.frames.last()
    }
}

/// 播放器
pub struct Player {
    config: HostConfig,
}

impl Player {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// 播放场景
    ///
    /// 第 0 帧是装配后、推进前的状态；随后每 `sample_every` 帧采样一次，
    /// 最后一帧总会被采样。
    pub fn run(&self, scene_file: &SceneFile) -> Result<PlaybackReport, SceneError> {
        let config = &self.config;
        let ticker = Ticker::with_framerate(config.fps);
        let scene = scene_file.build(&ticker)?;

        let steps = config.dump_steps.then(|| scene.step_summaries());

        let mut frames = vec![FrameSample {
            frame: 0,
            time: ticker.time(),
            targets: scene.snapshot(),
        }];
        let mut completed = Vec::new();
        let sample_every = config.sample_every.max(1);

        for frame in 1..=config.frames {
            for event in ticker.advance_frame() {
                let TweenEvent::Completed(id) = event;
                let name = scene
                    .tweens()
                    .find(|(_, tween)| tween.id() == id)
                    .map(|(name, _)| name.to_string())
                    .unwrap_or_else(|| id.to_string());
                debug!(frame, tween = %name, "tween 完成");
                completed.push((name, frame));
            }
            if frame % sample_every == 0 || frame == config.frames {
                frames.push(FrameSample {
                    frame,
                    time: ticker.time(),
                    targets: scene.snapshot(),
                });
            }
        }

        info!(
            scene = %scene.name,
            frames = config.frames,
            samples = frames.len(),
            completed = completed.len(),
            "播放结束"
        );

        Ok(PlaybackReport {
            scene: scene.name.clone(),
            fps: ticker.framerate(),
            frames,
            completed,
            calls: scene.calls(),
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> SceneFile {
        SceneFile::from_json(
            r#"{
                "name": "fade",
                "targets": [{ "name": "a", "props": { "alpha": 1 } }],
                "tweens": [{
                    "name": "fade",
                    "target": "a",
                    "commands": [{ "op": "to", "props": { "alpha": 0 }, "duration": 100 }]
                }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_sampling_cadence() {
        let player = Player::new(HostConfig {
            fps: 10.0,
            frames: 5,
            sample_every: 2,
            ..Default::default()
        });
        let report = player.run(&scene()).unwrap();
        let frames: Vec<u32> = report.frames.iter().map(|f| f.frame).collect();
        assert_eq!(frames, vec![0, 2, 4, 5]);
        assert!(report.steps.is_none());
    }

    #[test]
    fn test_completion_and_final_value() {
        let player = Player::new(HostConfig {
            fps: 10.0,
            frames: 3,
            dump_steps: true,
            ..Default::default()
        });
        let report = player.run(&scene()).unwrap();
        assert_eq!(report.completed, vec![("fade".to_string(), 1)]);

        let last = report.last_frame().unwrap();
        assert_eq!(
            last.targets["a"].props.get("alpha").and_then(|v| v.as_number()),
            Some(0.0)
        );
        let steps = report.steps.unwrap();
        assert_eq!(steps["fade"].len(), 1);
    }
}
