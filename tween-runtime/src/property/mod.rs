//! # Property 模块
//!
//! 可插值属性的抽象。
//!
//! ## 核心概念
//!
//! - [`Property`]：由目标侧提供的属性接口（克隆、区间插值、写入）
//! - [`ValueProperty`]：内置实现，覆盖数值、离散值和 `startPosition`
//! - [`StepProperty`]：编译后步骤中保存的属性，额外包含路径、旋转和状态三种内部属性
//!
//! 属性实例本身不可变：每次克隆都产生一个新的"起始值 -> 终值"区间。

mod path;
mod state;

pub use path::{OrientMode, PathProperty, RotationProperty};
pub use state::{StateEntry, StateProperty};

use std::fmt;
use std::rc::Rc;

use crate::target::TargetRef;
use crate::tween::TweenId;
use crate::value::PropertyValue;

/// 写入属性时的上下文
pub struct SetContext<'a> {
    /// tween 的单一目标
    pub target: Option<&'a TargetRef>,
    /// state 形式 tween 收集到的全部目标
    pub targets: &'a [TargetRef],
    /// 发起写入的 tween
    pub owner: TweenId,
}

/// 可插值属性接口
pub trait Property: fmt::Debug {
    /// 属性名
    fn name(&self) -> &str;

    /// 区间终值（即编译时的"当前值"）
    fn value(&self) -> Option<PropertyValue>;

    /// 以当前终值为起点，创建指向 `value` 的新区间
    fn clone_to(
        &self,
        target: Option<&TargetRef>,
        targets: &[TargetRef],
        value: PropertyValue,
    ) -> Rc<dyn Property>;

    /// 取 `当前终值 -> value` 这一整段中 `[r0, r1]` 的子区间
    fn interpolate(&self, value: &PropertyValue, r0: f64, r1: f64) -> Rc<dyn Property>;

    /// 写入目标
    ///
    /// `ratio` 是缓动后的比例，`step_ratio` 是步骤内的原始线性进度，
    /// 用于区分精确的起点/终点与中间插值。
    fn set_value(&self, cx: &SetContext<'_>, ratio: f64, step_ratio: f64);

    /// 是否为数值属性
    fn is_number(&self) -> bool;
}

/// 内置属性的插值方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    /// 两端都是数值时线性插值
    #[default]
    Interpolated,
    /// 只在步骤终点切换
    Discrete,
}

/// 内置属性实现
#[derive(Debug, Clone, PartialEq)]
pub struct ValueProperty {
    name: Rc<str>,
    kind: ValueKind,
    from: PropertyValue,
    to: PropertyValue,
}

impl ValueProperty {
    /// 创建起止值相同的属性
    pub fn new(name: &str, value: PropertyValue) -> Self {
        Self::with_kind(name, value, ValueKind::Interpolated)
    }

    /// 指定插值方式创建属性
    pub fn with_kind(name: &str, value: PropertyValue, kind: ValueKind) -> Self {
        Self {
            name: Rc::from(name),
            kind,
            from: value.clone(),
            to: value,
        }
    }

    fn span(&self, from: PropertyValue, to: PropertyValue) -> Rc<dyn Property> {
        Rc::new(Self {
            name: self.name.clone(),
            kind: self.kind,
            from,
            to,
        })
    }

    /// 区间起始值
    pub fn from_value(&self) -> &PropertyValue {
        &self.from
    }

    fn value_at(&self, ratio: f64, step_ratio: f64) -> PropertyValue {
        match self.kind {
            ValueKind::Interpolated => self.from.lerp(&self.to, ratio),
            ValueKind::Discrete if step_ratio >= 1.0 => self.to.clone(),
            ValueKind::Discrete => self.from.clone(),
        }
    }
}

impl Property for ValueProperty {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Option<PropertyValue> {
        Some(self.to.clone())
    }

    fn clone_to(
        &self,
        _target: Option<&TargetRef>,
        _targets: &[TargetRef],
        value: PropertyValue,
    ) -> Rc<dyn Property> {
        self.span(self.to.clone(), value)
    }

    fn interpolate(&self, value: &PropertyValue, r0: f64, r1: f64) -> Rc<dyn Property> {
        let whole = ValueProperty {
            name: self.name.clone(),
            kind: self.kind,
            from: self.to.clone(),
            to: value.clone(),
        };
        self.span(whole.value_at(r0, r0), whole.value_at(r1, r1))
    }

    fn set_value(&self, cx: &SetContext<'_>, ratio: f64, step_ratio: f64) {
        if let Some(target) = cx.target {
            target.set_property(&self.name, self.value_at(ratio, step_ratio));
        }
    }

    fn is_number(&self) -> bool {
        self.kind == ValueKind::Interpolated && self.from.is_number() && self.to.is_number()
    }
}

/// 编译后步骤中的属性
#[derive(Debug, Clone)]
pub enum StepProperty {
    /// 目标侧属性
    Tracked(Rc<dyn Property>),
    /// 沿贝塞尔曲线段的位置
    Path(PathProperty),
    /// 沿曲线切线的旋转
    Rotation(RotationProperty),
    /// 多目标状态
    State(StateProperty),
}

impl StepProperty {
    /// 属性名（用于调试摘要）
    pub fn name(&self) -> &str {
        match self {
            Self::Tracked(p) => p.name(),
            Self::Path(_) => "path",
            Self::Rotation(_) => "rotation",
            Self::State(_) => "state",
        }
    }

    /// 写入目标
    pub fn set_value(&self, cx: &SetContext<'_>, ratio: f64, step_ratio: f64) {
        match self {
            Self::Tracked(p) => p.set_value(cx, ratio, step_ratio),
            Self::Path(p) => p.set_value(cx, ratio),
            Self::Rotation(p) => p.set_value(cx, ratio),
            Self::State(p) => p.set_value(cx, step_ratio),
        }
    }

    /// 是否为数值属性
    pub fn is_number(&self) -> bool {
        match self {
            Self::Tracked(p) => p.is_number(),
            Self::Path(_) | Self::Rotation(_) => true,
            Self::State(_) => false,
        }
    }
}
