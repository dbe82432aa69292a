//! # Command 模块
//!
//! 尚未编译的 tween 指令。
//!
//! ## 编译流程
//!
//! 1. 每条指令报告自己会触及的属性（[`Command::collect_initial_properties`]），
//!    用目标的属性类型表创建初始属性，写入当前值表
//! 2. 按排队顺序逐条编译（[`Command::compile`]），`time` 是前面指令时长的累计
//! 3. 每条指令返回自己的时长，并可能追加若干 [`Step`]
//!
//! 当前值表在多次编译之间保留：编译后再排入的指令从已编译的时长继续。

mod guide;

pub use guide::{GuideCommand, GuidePath};

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::warn;

use crate::easing::Ease;
use crate::property::{Property, StateEntry, StateProperty, StepProperty};
use crate::step::Step;
use crate::target::{START_POSITION, TargetRef, push_unique_target};
use crate::value::{PropertyMap, PropertyValue};

/// 属性名 -> 当前属性（其终值即编译时的"当前值"）
pub type CurrentMap = BTreeMap<String, Rc<dyn Property>>;

/// 编译时共享的可变状态
pub struct CompileContext<'a> {
    /// tween 的单一目标
    pub target: Option<&'a TargetRef>,
    /// state 形式 tween 收集到的目标
    pub targets: &'a mut Vec<TargetRef>,
    /// 当前值表
    pub current: &'a mut CurrentMap,
    /// 输出步骤
    pub steps: &'a mut Vec<Step>,
    /// 最近一次编译的 state 指令（结束时整体应用）
    pub final_state: &'a mut Option<StateProperty>,
}

/// NaN 或负数时长钳制为零
pub(crate) fn clamp_duration(duration: f64) -> f64 {
    if duration.is_nan() || duration < 0.0 {
        0.0
    } else {
        duration
    }
}

/// 未编译的指令
#[derive(Debug, Clone)]
pub enum Command {
    /// 保持当前值；`passive` 时期间不写入任何属性
    Wait { duration: f64, passive: bool },
    /// 插值到目标值
    To {
        props: PropertyMap,
        duration: f64,
        ease: Option<Ease>,
    },
    /// 沿路径移动
    Guide(GuideCommand),
    /// 多目标状态切换
    State {
        entries: Rc<[StateEntry]>,
        duration: f64,
    },
}

impl Command {
    /// 指令时长
    pub fn duration(&self) -> f64 {
        match self {
            Self::Wait { duration, .. }
            | Self::To { duration, .. }
            | Self::State { duration, .. } => *duration,
            Self::Guide(guide) => guide.duration(),
        }
    }

    /// 指令名（用于错误与日志）
    pub fn name(&self) -> &'static str {
        match self {
            Self::Wait { .. } => "wait",
            Self::To { .. } => "to",
            Self::Guide(_) => "guide",
            Self::State { .. } => "state",
        }
    }

    /// 把本指令触及的属性加入当前值表
    ///
    /// 每个属性只创建一次；目标没有对应属性类型时跳过并告警。
    pub fn collect_initial_properties(&self, target: Option<&TargetRef>, current: &mut CurrentMap) {
        let Some(target) = target else {
            return;
        };
        match self {
            Self::Wait { .. } => {
                if target.setters().contains_key(START_POSITION) {
                    track(target, START_POSITION, current);
                }
            }
            Self::To { props, .. } => {
                for name in props.names() {
                    track(target, name, current);
                }
            }
            Self::Guide(guide) => {
                for name in guide.touched_properties() {
                    track(target, name, current);
                }
            }
            Self::State { .. } => {}
        }
    }

    /// 收集本指令涉及的目标
    ///
    /// 新出现的目标在 `time > 0` 时先隐藏。返回指令时长。
    pub fn collect_targets(&self, time: f64, targets: &mut Vec<TargetRef>) -> f64 {
        if let Self::State { entries, .. } = self {
            for entry in entries.iter() {
                if push_unique_target(targets, &entry.target) {
                    entry.target.set_hidden(time > 0.0);
                }
            }
        }
        self.duration()
    }

    /// 编译为步骤，返回指令时长
    pub fn compile(&self, time: f64, cx: &mut CompileContext<'_>) -> f64 {
        match self {
            Self::Wait { duration, passive } => compile_wait(time, *duration, *passive, cx),
            Self::To {
                props,
                duration,
                ease,
            } => compile_to(time, props, *duration, ease.as_ref(), cx),
            Self::Guide(guide) => guide.compile(time, cx),
            Self::State { entries, duration } => {
                self.collect_targets(time, cx.targets);
                let state = StateProperty::new(entries.clone());
                if *duration > 0.0 {
                    cx.steps.push(Step::new(
                        time,
                        *duration,
                        vec![StepProperty::State(state.clone())],
                        None,
                    ));
                }
                *cx.final_state = Some(state);
                *duration
            }
        }
    }
}

fn track(target: &TargetRef, name: &str, current: &mut CurrentMap) {
    if current.contains_key(name) {
        return;
    }
    let property = target
        .setters()
        .get(name)
        .and_then(|setter| setter.create(name, target));
    match property {
        Some(property) => {
            current.insert(name.to_string(), property);
        }
        None => warn!(name = target.name(), property = name, "目标没有该属性，已忽略"),
    }
}

/// 保持当前值的副本
pub(crate) fn hold(property: &Rc<dyn Property>, cx: &CompileContext<'_>) -> Option<Rc<dyn Property>> {
    let value = property.value()?;
    Some(property.clone_to(cx.target, cx.targets.as_slice(), value))
}

fn compile_wait(time: f64, duration: f64, passive: bool, cx: &mut CompileContext<'_>) -> f64 {
    if passive {
        cx.steps.push(Step::new(time, duration, Vec::new(), None));
        return duration;
    }

    let mut properties = Vec::with_capacity(cx.current.len());
    let names: Vec<String> = cx.current.keys().cloned().collect();
    for name in names {
        let Some(property) = cx.current.get(&name).cloned() else {
            continue;
        };
        let next = if name == START_POSITION {
            let advanced = property.clone_to(
                cx.target,
                cx.targets.as_slice(),
                PropertyValue::Number(time + duration),
            );
            cx.current.insert(name, advanced.clone());
            Some(advanced)
        } else {
            hold(&property, cx)
        };
        if let Some(next) = next {
            properties.push(StepProperty::Tracked(next));
        }
    }
    cx.steps.push(Step::new(time, duration, properties, None));
    duration
}

/// `to` 编译：被指定的属性指向新值并更新当前值表，其余属性保持
pub(crate) fn compile_to(
    time: f64,
    props: &PropertyMap,
    duration: f64,
    ease: Option<&Ease>,
    cx: &mut CompileContext<'_>,
) -> f64 {
    let mut properties = Vec::with_capacity(cx.current.len());
    let names: Vec<String> = cx.current.keys().cloned().collect();
    for name in names {
        let Some(property) = cx.current.get(&name).cloned() else {
            continue;
        };
        let next = match props.get(&name) {
            Some(value) => {
                let moved = property.clone_to(cx.target, cx.targets.as_slice(), value.clone());
                cx.current.insert(name, moved.clone());
                Some(moved)
            }
            None => hold(&property, cx),
        };
        if let Some(next) = next {
            properties.push(StepProperty::Tracked(next));
        }
    }
    if duration > 0.0 {
        cx.steps
            .push(Step::new(time, duration, properties, ease.cloned()));
    }
    duration
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::SimpleTarget;

    struct Fixture {
        target: TargetRef,
        targets: Vec<TargetRef>,
        current: CurrentMap,
        steps: Vec<Step>,
        final_state: Option<StateProperty>,
    }

    impl Fixture {
        fn new(props: PropertyMap) -> Self {
            Self {
                target: SimpleTarget::shared("box", &props),
                targets: Vec::new(),
                current: CurrentMap::new(),
                steps: Vec::new(),
                final_state: None,
            }
        }

        fn run(&mut self, commands: &[Command]) -> f64 {
            for command in commands {
                command.collect_initial_properties(Some(&self.target), &mut self.current);
            }
            let mut cx = CompileContext {
                target: Some(&self.target),
                targets: &mut self.targets,
                current: &mut self.current,
                steps: &mut self.steps,
                final_state: &mut self.final_state,
            };
            let mut time = 0.0;
            for command in commands {
                time += command.compile(time, &mut cx);
            }
            time
        }

        fn current_number(&self, name: &str) -> Option<f64> {
            self.current.get(name)?.value()?.as_number()
        }
    }

    fn to(props: PropertyMap, duration: f64) -> Command {
        Command::To {
            props,
            duration,
            ease: None,
        }
    }

    #[test]
    fn test_duration_is_additive() {
        let mut fx = Fixture::new(PropertyMap::new().with("x", 0.0).with("alpha", 1.0));
        let total = fx.run(&[
            to(PropertyMap::new().with("x", 100.0), 300.0),
            Command::Wait {
                duration: 200.0,
                passive: false,
            },
            to(PropertyMap::new().with("alpha", 0.0), 0.0),
        ]);
        assert_eq!(total, 500.0);
        assert_eq!(fx.steps.len(), 2);
        assert_eq!(fx.current_number("alpha"), Some(0.0));
        assert_eq!(fx.current_number("x"), Some(100.0));
    }

    #[test]
    fn test_steps_are_ordered() {
        let mut fx = Fixture::new(PropertyMap::new().with("x", 0.0));
        fx.run(&[
            to(PropertyMap::new().with("x", 10.0), 100.0),
            to(PropertyMap::new().with("x", 20.0), 100.0),
            to(PropertyMap::new().with("x", 30.0), 50.0),
        ]);
        let starts: Vec<f64> = fx.steps.iter().map(Step::start_time).collect();
        assert_eq!(starts, vec![0.0, 100.0, 200.0]);
    }

    #[test]
    fn test_wait_advances_start_position() {
        let mut fx = Fixture::new(PropertyMap::new().with(START_POSITION, 0.0));
        fx.run(&[
            Command::Wait {
                duration: 300.0,
                passive: false,
            },
            Command::Wait {
                duration: 200.0,
                passive: false,
            },
        ]);
        assert_eq!(fx.current_number(START_POSITION), Some(500.0));
    }

    #[test]
    fn test_passive_wait_writes_nothing() {
        let mut fx = Fixture::new(PropertyMap::new().with("x", 0.0));
        fx.run(&[
            to(PropertyMap::new().with("x", 10.0), 100.0),
            Command::Wait {
                duration: 100.0,
                passive: true,
            },
        ]);
        assert!(fx.steps[1].properties().is_empty());
    }

    #[test]
    fn test_unknown_property_is_skipped() {
        let mut fx = Fixture::new(PropertyMap::new().with("x", 0.0));
        fx.run(&[to(PropertyMap::new().with("scale", 2.0), 100.0)]);
        assert!(!fx.current.contains_key("scale"));
        assert_eq!(fx.steps[0].summary().properties, vec!["x".to_string()]);
    }

    #[test]
    fn test_compiled_layout_snapshot() {
        let mut fx = Fixture::new(
            PropertyMap::new()
                .with("x", 0.0)
                .with("visible", true),
        );
        fx.run(&[
            to(PropertyMap::new().with("x", 100.0), 250.0),
            Command::Wait {
                duration: 250.0,
                passive: true,
            },
            to(PropertyMap::new().with("visible", false), 100.0),
        ]);
        let summaries: Vec<_> = fx.steps.iter().map(Step::summary).collect();
        insta::assert_debug_snapshot!(summaries, @r###"
        [
            StepSummary {
                start: 0.0,
                duration: 250.0,
                properties: [
                    "visible",
                    "x",
                ],
                eased: false,
                numeric: true,
            },
            StepSummary {
                start: 250.0,
                duration: 250.0,
                properties: [],
                eased: false,
                numeric: false,
            },
            StepSummary {
                start: 500.0,
                duration: 100.0,
                properties: [
                    "visible",
                    "x",
                ],
                eased: false,
                numeric: true,
            },
        ]
        "###);
    }
}
