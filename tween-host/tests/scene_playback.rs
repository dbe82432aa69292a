//! # 场景播放集成测试
//!
//! 测试 场景文件 → Scene 装配 → Player 逐帧播放 的完整链路。

use std::fs;
use std::path::{Path, PathBuf};

use tween_host::{HostConfig, Player, SceneError, SceneFile};
use tween_runtime::{PropertyValue, Ticker};

fn scene_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("scenes").join(name)
}

fn config(fps: f64, frames: u32) -> HostConfig {
    HostConfig {
        fps,
        frames,
        ..Default::default()
    }
}

fn number(value: Option<&PropertyValue>) -> Option<f64> {
    value.and_then(PropertyValue::as_number)
}

#[test]
fn test_slide_scene_plays_to_end() {
    let scene = SceneFile::load(scene_path("slide.json")).unwrap();
    let report = Player::new(config(10.0, 25)).run(&scene).unwrap();

    assert_eq!(report.scene, "slide");
    assert_eq!(report.completed, vec![("slide".to_string(), 20)]);

    // quad_out 在 0.5 处为 0.75
    let mid = &report.frames[5];
    assert_eq!(mid.time, 500.0);
    let x = number(mid.targets["box"].props.get("x")).unwrap();
    assert!((x - 225.0).abs() < 1e-9);

    let last = report.last_frame().unwrap();
    let props = &last.targets["box"].props;
    assert_eq!(number(props.get("x")), Some(300.0));
    assert_eq!(number(props.get("alpha")), Some(0.0));
    assert_eq!(props.get("visible"), Some(&PropertyValue::Bool(false)));

    assert_eq!(report.calls.len(), 1);
    let call = &report.calls[0];
    assert_eq!(call.label, "arrived");
    assert_eq!(call.time, 1000.0);
    assert_eq!(
        call.params,
        vec![
            PropertyValue::Text("box".to_string()),
            PropertyValue::Number(300.0)
        ]
    );
}

#[test]
fn test_timeline_scene_drives_members_together() {
    let scene = SceneFile::load(scene_path("timeline.json")).unwrap();
    let ticker = Ticker::with_framerate(10.0);
    let built = scene.build(&ticker).unwrap();

    let timeline = &built.timelines()[0];
    assert_eq!(timeline.duration(), 1000.0);
    assert_eq!(timeline.tween_count(), 3);
    assert_eq!(built.target("clip").unwrap().synchronized_count(), 1);

    // 首帧只建立时间基准
    for _ in 0..7 {
        ticker.advance_frame();
    }
    assert_eq!(timeline.position(), 600.0);
    assert_eq!(built.tween("left").unwrap().position(), 600.0);
    let x = built.target("left").unwrap().number("x").unwrap();
    assert!((x - 120.0).abs() < 1e-9);
    assert_eq!(built.target("right").unwrap().number("x"), Some(200.0));
    assert_eq!(
        built.target("right").unwrap().synced_position(),
        Some(600.0)
    );
    assert!(built.target("frame_a").unwrap().is_hidden());
    assert!(!built.target("frame_b").unwrap().is_hidden());

    let calls = built.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].label, "halfway");
    assert_eq!(calls[0].scope.as_deref(), Some("clip"));
}

#[test]
fn test_looping_timeline_repeats_markers() {
    let scene = SceneFile::load(scene_path("timeline.json")).unwrap();
    let report = Player::new(config(10.0, 16)).run(&scene).unwrap();

    let labels: Vec<&str> = report.calls.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["halfway", "halfway"]);
    assert!(report.completed.is_empty());
}

#[test]
fn test_guide_scene_steps() {
    let scene = SceneFile::load(scene_path("guide.json")).unwrap();
    let steps = scene.compile_steps().unwrap();
    let orbit = &steps["orbit"];
    assert_eq!(orbit.len(), 2);
    for step in orbit {
        assert_eq!(step.duration, 1000.0);
        assert!(step.properties.iter().any(|p| p == "path"));
        assert!(step.properties.iter().any(|p| p == "rotation"));
        assert!(step.properties.iter().any(|p| p == "scale"));
    }
}

#[test]
fn test_scene_and_config_from_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let scene_file = dir.path().join("fade.json");
    fs::write(
        &scene_file,
        r#"{
            "name": "fade",
            "targets": [{ "name": "a", "props": { "alpha": 1 } }],
            "tweens": [{
                "target": "a",
                "commands": [
                    { "op": "wait", "duration": 100, "passive": true },
                    { "op": "to", "props": { "alpha": 0 }, "duration": 100 }
                ]
            }]
        }"#,
    )
    .unwrap();
    let config_file = dir.path().join("config.json");
    fs::write(&config_file, r#"{ "fps": 20, "frames": 6, "sample_every": 3 }"#).unwrap();

    let config = HostConfig::load(&config_file);
    assert!(config.validate().is_ok());
    let report = Player::new(config)
        .run(&SceneFile::load(&scene_file).unwrap())
        .unwrap();

    let frames: Vec<u32> = report.frames.iter().map(|f| f.frame).collect();
    assert_eq!(frames, vec![0, 3, 6]);
    // 无名 tween 按序号命名
    assert_eq!(report.completed, vec![("tween0".to_string(), 4)]);
    // 150ms：被动等待结束后半程
    let alpha = number(report.frames[1].targets["a"].props.get("alpha")).unwrap();
    assert!((alpha - 0.5).abs() < 1e-9);
    assert_eq!(
        number(report.last_frame().unwrap().targets["a"].props.get("alpha")),
        Some(0.0)
    );
}

#[test]
fn test_missing_scene_file() {
    let err = SceneFile::load("/nonexistent/scene.json").unwrap_err();
    assert!(matches!(err, SceneError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/scene.json"));
}
