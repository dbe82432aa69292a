//! # Scene 模块
//!
//! JSON 场景描述：目标、tween 指令序列和父时间轴。
//!
//! 场景文件只描述初始状态和指令，[`SceneFile::build`] 把它装配到一个
//! [`Ticker`] 上，之后由播放器逐帧驱动。
//!
//! ```json
//! {
//!   "name": "slide",
//!   "targets": [{ "name": "box", "props": { "x": 0 } }],
//!   "tweens": [{
//!     "target": "box",
//!     "commands": [
//!       { "op": "to", "props": { "x": 100 }, "duration": 1000, "ease": "quad_out" },
//!       { "op": "call", "label": "done" }
//!     ]
//!   }]
//! }
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use tween_runtime::{
    EasingFunction, GuidePath, PlayMode, PropertyMap, PropertyValue, SimpleTarget, StateEntry,
    StepSummary, TargetRef, Ticker, Timeline, Tween, TweenError, TweenOptions,
};

/// 场景错误
#[derive(Error, Debug)]
pub enum SceneError {
    /// 读取场景文件失败
    #[error("读取场景文件失败 {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON 解析失败
    #[error("场景 JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 引用了未声明的目标
    #[error("未声明的目标: {0}")]
    UnknownTarget(String),

    /// 时间轴引用了未命名或不存在的 tween
    #[error("时间轴引用了不存在的 tween: {0}")]
    UnknownTween(String),

    /// 目标或 tween 重名
    #[error("名称重复: {0}")]
    DuplicateName(String),

    /// tween 指令不合法
    #[error(transparent)]
    Tween(#[from] TweenError),
}

/// 场景文件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneFile {
    /// 场景名
    #[serde(default)]
    pub name: String,

    /// 目标列表
    #[serde(default)]
    pub targets: Vec<TargetSpec>,

    /// tween 列表
    #[serde(default)]
    pub tweens: Vec<TweenSpec>,

    /// 父时间轴列表
    #[serde(default)]
    pub timelines: Vec<TimelineSpec>,
}

/// 目标声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,

    /// 初始属性，同时决定目标支持哪些属性
    #[serde(default)]
    pub props: PropertyMap,

    /// 同步模式：位置由父时间轴决定
    #[serde(default)]
    pub synchronized: bool,
}

/// tween 声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweenSpec {
    /// 名称，供时间轴引用
    #[serde(default)]
    pub name: Option<String>,

    /// 目标名；缺省为无目标 tween（只能使用 state 指令）
    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub options: TweenOptions,

    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

/// 指令声明
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CommandSpec {
    /// 等待
    Wait {
        duration: f64,
        #[serde(default)]
        passive: bool,
    },

    /// 插值到目标值
    To {
        props: PropertyMap,
        #[serde(default)]
        duration: f64,
        #[serde(default)]
        ease: Option<EasingFunction>,
    },

    /// 沿路径移动
    Guide {
        path: GuidePath,
        #[serde(default)]
        props: PropertyMap,
        duration: f64,
        #[serde(default)]
        ease: Option<EasingFunction>,
    },

    /// 切换状态
    State {
        entries: Vec<StateSpec>,
        #[serde(default)]
        duration: f64,
    },

    /// 时间点标记：播放经过时记录到调用日志
    Call {
        label: String,
        #[serde(default)]
        params: Vec<PropertyValue>,
        /// 作用域目标名
        #[serde(default)]
        scope: Option<String>,
        /// 触发时把所在 tween 跳转到该位置
        #[serde(default)]
        seek: Option<f64>,
    },
}

/// state 指令中的一项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSpec {
    pub target: String,
    #[serde(default)]
    pub props: PropertyMap,
}

/// 父时间轴声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineSpec {
    /// 拥有者目标名
    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub options: TweenOptions,

    /// 成员 tween 名
    pub tweens: Vec<String>,
}

/// 一次标记触发
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    pub label: String,
    /// 标记所在的时间点
    pub time: f64,
    /// 触发时所在 tween 的位置
    pub position: f64,
    pub params: Vec<PropertyValue>,
    pub scope: Option<String>,
}

/// 调用日志
pub type CallLog = Rc<RefCell<Vec<CallRecord>>>;

/// 装配完成的场景
pub struct Scene {
    pub name: String,
    targets: Vec<(String, Rc<SimpleTarget>)>,
    tweens: Vec<(String, Tween)>,
    timelines: Vec<Timeline>,
    calls: CallLog,
}

impl SceneFile {
    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let scene = Self::from_json(&content)?;
        info!(path = %path.display(), name = %scene.name, "场景加载成功");
        Ok(scene)
    }

    /// 从 JSON 文本解析
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }

    /// 装配到时钟上
    ///
    /// 目标登记到时钟；有目标的 tween 登记到目标，无目标的 tween 登记到时钟；
    /// 被时间轴引用的 tween 随后转由时间轴驱动。
    pub fn build(&self, ticker: &Ticker) -> Result<Scene, SceneError> {
        let mut targets: Vec<(String, Rc<SimpleTarget>)> = Vec::new();
        for spec in &self.targets {
            if targets.iter().any(|(name, _)| name == &spec.name) {
                return Err(SceneError::DuplicateName(spec.name.clone()));
            }
            let mode = if spec.synchronized {
                PlayMode::Synchronized
            } else {
                PlayMode::Independent
            };
            let target =
                Rc::new(SimpleTarget::new(spec.name.as_str(), &spec.props).with_play_mode(mode));
            ticker.add_target(target.clone());
            targets.push((spec.name.clone(), target));
        }

        let lookup = |name: &str| -> Result<TargetRef, SceneError> {
            targets
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, t)| -> TargetRef { t.clone() })
                .ok_or_else(|| SceneError::UnknownTarget(name.to_string()))
        };

        let calls: CallLog = Rc::new(RefCell::new(Vec::new()));
        let mut tweens: Vec<(String, Tween)> = Vec::new();
        for (index, spec) in self.tweens.iter().enumerate() {
            let name = spec
                .name
                .clone()
                .unwrap_or_else(|| format!("tween{}", index));
            if tweens.iter().any(|(n, _)| n == &name) {
                return Err(SceneError::DuplicateName(name));
            }
            let target = spec.target.as_deref().map(&lookup).transpose()?;
            let tween = Tween::create(target, spec.options.clone(), ticker);
            for command in &spec.commands {
                queue_command(&tween, command, &lookup, &calls)?;
            }
            debug!(
                tween = %tween.id(),
                name = %name,
                duration = tween.duration(),
                "装配 tween"
            );
            tweens.push((name, tween));
        }

        let mut timelines = Vec::new();
        for spec in &self.timelines {
            let owner = spec.owner.as_deref().map(&lookup).transpose()?;
            let timeline = Timeline::new(owner, spec.options.clone());
            for member in &spec.tweens {
                let tween = tweens
                    .iter()
                    .find(|(n, _)| n == member)
                    .map(|(_, t)| t)
                    .ok_or_else(|| SceneError::UnknownTween(member.clone()))?;
                timeline.add_tween(tween);
            }
            ticker.add_timeline(&timeline);
            debug!(
                tweens = timeline.tween_count(),
                duration = timeline.duration(),
                "装配时间轴"
            );
            timelines.push(timeline);
        }

        Ok(Scene {
            name: self.name.clone(),
            targets,
            tweens,
            timelines,
            calls,
        })
    }

    /// 装配到独立时钟上并编译全部 tween，返回各自的步骤表
    pub fn compile_steps(&self) -> Result<BTreeMap<String, Vec<StepSummary>>, SceneError> {
        let ticker = Ticker::new();
        let scene = self.build(&ticker)?;
        Ok(scene.step_summaries())
    }
}

fn queue_command(
    tween: &Tween,
    command: &CommandSpec,
    lookup: &impl Fn(&str) -> Result<TargetRef, SceneError>,
    calls: &CallLog,
) -> Result<(), SceneError> {
    match command {
        CommandSpec::Wait { duration, passive } => {
            if *passive {
                tween.wait_passive(*duration);
            } else {
                tween.wait(*duration);
            }
        }
        CommandSpec::To {
            props,
            duration,
            ease,
        } => {
            tween.to(props.clone(), *duration, ease.map(Into::into))?;
        }
        CommandSpec::Guide {
            path,
            props,
            duration,
            ease,
        } => {
            tween.guide(path.clone(), props.clone(), *duration, ease.map(Into::into))?;
        }
        CommandSpec::State { entries, duration } => {
            let entries = entries
                .iter()
                .map(|entry| Ok(StateEntry::new(lookup(&entry.target)?, entry.props.clone())))
                .collect::<Result<Vec<_>, SceneError>>()?;
            tween.state(entries, *duration)?;
        }
        CommandSpec::Call {
            label,
            params,
            scope,
            seek,
        } => {
            let scope = scope.as_deref().map(lookup).transpose()?;
            let log = calls.clone();
            let label = label.clone();
            let seek = *seek;
            tween.call(
                move |cx| {
                    log.borrow_mut().push(CallRecord {
                        label: label.clone(),
                        time: cx.time,
                        position: cx.tween.position(),
                        params: cx.params.to_vec(),
                        scope: cx.scope.map(|s| s.name().to_string()),
                    });
                    if let Some(position) = seek {
                        cx.tween.set_position(position, true);
                    }
                },
                params.clone(),
                scope,
            )?;
        }
    }
    Ok(())
}

impl Scene {
    /// 目标（按声明顺序）
    pub fn targets(&self) -> impl Iterator<Item = (&str, &Rc<SimpleTarget>)> {
        self.targets.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// 按名称查找目标
    pub fn target(&self, name: &str) -> Option<&Rc<SimpleTarget>> {
        self.targets.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// tween（按声明顺序）
    pub fn tweens(&self) -> impl Iterator<Item = (&str, &Tween)> {
        self.tweens.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// 按名称查找 tween
    pub fn tween(&self, name: &str) -> Option<&Tween> {
        self.tweens.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn timelines(&self) -> &[Timeline] {
        &self.timelines
    }

    /// 各 tween 的步骤表（会触发编译）
    pub fn step_summaries(&self) -> BTreeMap<String, Vec<StepSummary>> {
        self.tweens
            .iter()
            .map(|(name, tween)| (name.clone(), tween.step_summaries()))
            .collect()
    }

    /// 目前为止的标记触发记录
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.borrow().clone()
    }

    /// 全部目标的属性快照
    pub fn snapshot(&self) -> BTreeMap<String, TargetSnapshot> {
        self.targets
            .iter()
            .map(|(name, target)| {
                let snapshot = TargetSnapshot {
                    hidden: target.is_hidden(),
                    props: target.snapshot(),
                };
                (name.clone(), snapshot)
            })
            .collect()
    }
}

/// 单个目标的快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSnapshot {
    pub hidden: bool,
    pub props: PropertyMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"{
        "name": "slide",
        "targets": [{ "name": "box", "props": { "x": 0, "visible": true } }],
        "tweens": [{
            "name": "move",
            "target": "box",
            "commands": [
                { "op": "to", "props": { "x": 100 }, "duration": 100 },
                { "op": "call", "label": "done", "params": ["end", 1] }
            ]
        }]
    }"#;

    #[test]
    fn test_parse_commands() {
        let scene = SceneFile::from_json(SLIDE).unwrap();
        assert_eq!(scene.name, "slide");
        assert_eq!(scene.tweens[0].commands.len(), 2);
        assert!(matches!(
            &scene.tweens[0].commands[1],
            CommandSpec::Call { label, params, .. } if label == "done" && params.len() == 2
        ));
    }

    #[test]
    fn test_build_and_tick() {
        let ticker = Ticker::new();
        let scene = SceneFile::from_json(SLIDE).unwrap().build(&ticker).unwrap();
        let tween = scene.tween("move").unwrap();
        assert_eq!(tween.duration(), 100.0);

        ticker.tick(50.0);
        ticker.tick(50.0);
        let target = scene.target("box").unwrap();
        assert_eq!(target.number("x"), Some(100.0));

        let calls = scene.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].label, "done");
        assert_eq!(calls[0].time, 100.0);
    }

    #[test]
    fn test_unknown_target() {
        let json = r#"{ "tweens": [{ "target": "ghost", "commands": [] }] }"#;
        let err = SceneFile::from_json(json)
            .unwrap()
            .build(&Ticker::new())
            .err()
            .unwrap();
        assert!(matches!(err, SceneError::UnknownTarget(name) if name == "ghost"));
    }

    #[test]
    fn test_duplicate_target() {
        let json = r#"{ "targets": [{ "name": "a" }, { "name": "a" }] }"#;
        let err = SceneFile::from_json(json)
            .unwrap()
            .build(&Ticker::new())
            .err()
            .unwrap();
        assert!(matches!(err, SceneError::DuplicateName(_)));
    }

    #[test]
    fn test_state_on_targeted_tween_is_rejected() {
        let json = r#"{
            "targets": [{ "name": "a", "props": { "x": 0 } }],
            "tweens": [{
                "target": "a",
                "commands": [{ "op": "state", "entries": [{ "target": "a" }] }]
            }]
        }"#;
        let err = SceneFile::from_json(json)
            .unwrap()
            .build(&Ticker::new())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SceneError::Tween(TweenError::TargetNotAllowed { command: "state" })
        ));
    }

    #[test]
    fn test_timeline_unknown_member() {
        let json = r#"{ "timelines": [{ "tweens": ["missing"] }] }"#;
        let err = SceneFile::from_json(json)
            .unwrap()
            .build(&Ticker::new())
            .err()
            .unwrap();
        assert!(matches!(err, SceneError::UnknownTween(name) if name == "missing"));
    }

    #[test]
    fn test_compile_steps() {
        let steps = SceneFile::from_json(SLIDE).unwrap().compile_steps().unwrap();
        assert_eq!(steps["move"].len(), 1);
        assert_eq!(steps["move"][0].duration, 100.0);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            SceneFile::from_json("{ not json"),
            Err(SceneError::Json(_))
        ));
    }
}
