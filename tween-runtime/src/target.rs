//! # Target 模块
//!
//! 可动画目标的接口定义。
//!
//! 场景图、显示对象和渲染后端都在本库之外。Tween 只通过 [`Animatable`]
//! 读写属性、登记自身，并在需要时通知目标同步子时间轴。
//!
//! ## 核心概念
//!
//! - [`Animatable`]：可动画目标接口
//! - [`Setter`] / [`SetterTable`]：属性名到属性类型的映射，用于创建初始属性
//! - [`SimpleTarget`]：基于属性表的通用目标实现，自行驱动登记的 tween

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::property::{Property, ValueKind, ValueProperty};
use crate::tween::{Tween, TweenId, UpdateMode};
use crate::value::{PropertyMap, PropertyValue};

/// 子时间轴起始偏移属性名
///
/// 它的值是绝对时间轴偏移，而不是插值量；等待指令会推进它。
pub const START_POSITION: &str = "startPosition";

/// 目标引用
pub type TargetRef = Rc<dyn Animatable>;

/// 自定义属性工厂：`(属性名, 目标) -> 初始属性`
pub type PropertyFactory = Rc<dyn Fn(&str, &TargetRef) -> Option<Rc<dyn Property>>>;

/// 目标的播放模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    /// 独立播放
    #[default]
    Independent,
    /// 与父时间轴同步
    Synchronized,
}

/// 属性类型描述
///
/// 目标用它声明每个可动画属性应如何创建初始属性实例。
#[derive(Clone)]
pub enum Setter {
    /// 数值属性，线性插值
    Number,
    /// 离散属性（布尔、文本），只在步骤边界切换
    Discrete,
    /// 子时间轴偏移，见 [`START_POSITION`]
    StartPosition,
    /// 目标自定义的属性实现
    Custom(PropertyFactory),
}

impl Setter {
    /// 为目标创建初始属性
    ///
    /// 目标上读不到当前值时返回 `None`。
    pub fn create(&self, name: &str, target: &TargetRef) -> Option<Rc<dyn Property>> {
        let kind = match self {
            Self::Custom(factory) => return factory(name, target),
            Self::Discrete => ValueKind::Discrete,
            Self::Number | Self::StartPosition => ValueKind::Interpolated,
        };
        let value = target.get_property(name)?;
        Some(Rc::new(ValueProperty::with_kind(name, value, kind)))
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => f.write_str("Number"),
            Self::Discrete => f.write_str("Discrete"),
            Self::StartPosition => f.write_str("StartPosition"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// 属性名 -> 属性类型
pub type SetterTable = BTreeMap<String, Setter>;

/// 可动画目标接口
///
/// 所有方法都接收 `&self`：目标通常被多个 tween 共享，实现方用
/// `RefCell`/`Cell` 提供内部可变性。
pub trait Animatable {
    /// 目标名称（用于日志）
    fn name(&self) -> &str {
        ""
    }

    /// 可动画属性表
    fn setters(&self) -> &SetterTable;

    /// 读取属性当前值
    fn get_property(&self, name: &str) -> Option<PropertyValue>;

    /// 写入属性
    ///
    /// 属性不存在或写入失败时返回 `false`。
    fn set_property(&self, name: &str, value: PropertyValue) -> bool;

    /// 设置隐藏标记
    fn set_hidden(&self, hidden: bool);

    /// 登记由该目标驱动的 tween
    fn register_tween(&self, tween: &Tween);

    /// 注销 tween
    fn unregister_tween(&self, tween: &Tween);

    /// 是否还有登记的 tween
    fn has_tweens(&self) -> bool;

    /// 播放模式
    fn play_mode(&self) -> PlayMode {
        PlayMode::Independent
    }

    /// 与另一个目标建立或解除同步关系
    fn synchronize(&self, other: &TargetRef, enable: bool) {
        let _ = (other, enable);
    }

    /// 父时间轴位置变化时的通知（仅同步模式目标）
    fn sync_position(&self, position: f64) {
        let _ = position;
    }
}

/// 两个目标引用是否指向同一对象
pub fn same_target(a: &TargetRef, b: &TargetRef) -> bool {
    Rc::ptr_eq(a, b)
}

/// 按对象身份去重追加
///
/// # 返回
/// - `true`: 目标是新出现的
pub fn push_unique_target(targets: &mut Vec<TargetRef>, target: &TargetRef) -> bool {
    if targets.iter().any(|t| same_target(t, target)) {
        false
    } else {
        targets.push(target.clone());
        true
    }
}

/// 通用属性表目标
///
/// 属性类型按初始值推断：数值为 [`Setter::Number`]，`startPosition`
/// 为 [`Setter::StartPosition`]，其余为 [`Setter::Discrete`]。
///
/// 登记到它上面的 tween 由 [`SimpleTarget::advance`] 驱动，结束后自动移除。
pub struct SimpleTarget {
    name: String,
    setters: SetterTable,
    values: RefCell<BTreeMap<String, PropertyValue>>,
    hidden: Cell<bool>,
    play_mode: PlayMode,
    synced_position: Cell<Option<f64>>,
    synchronized: RefCell<Vec<TargetRef>>,
    tweens: RefCell<Vec<Tween>>,
}

impl SimpleTarget {
    /// 创建目标
    pub fn new(name: impl Into<String>, props: &PropertyMap) -> Self {
        let mut setters = SetterTable::new();
        let mut values = BTreeMap::new();
        for (key, value) in props.iter() {
            let setter = match value {
                _ if key == START_POSITION => Setter::StartPosition,
                PropertyValue::Number(_) => Setter::Number,
                _ => Setter::Discrete,
            };
            setters.insert(key.to_string(), setter);
            values.insert(key.to_string(), value.clone());
        }

        Self {
            name: name.into(),
            setters,
            values: RefCell::new(values),
            hidden: Cell::new(false),
            play_mode: PlayMode::Independent,
            synced_position: Cell::new(None),
            synchronized: RefCell::new(Vec::new()),
            tweens: RefCell::new(Vec::new()),
        }
    }

    /// 创建共享目标引用
    pub fn shared(name: impl Into<String>, props: &PropertyMap) -> Rc<Self> {
        Rc::new(Self::new(name, props))
    }

    /// 设置播放模式
    pub fn with_play_mode(mut self, mode: PlayMode) -> Self {
        self.play_mode = mode;
        self
    }

    /// 注册自定义属性类型
    pub fn with_setter(mut self, name: impl Into<String>, setter: Setter) -> Self {
        self.setters.insert(name.into(), setter);
        self
    }

    /// 读取数值属性
    pub fn number(&self, name: &str) -> Option<f64> {
        self.values.borrow().get(name).and_then(PropertyValue::as_number)
    }

    /// 当前属性快照
    pub fn snapshot(&self) -> PropertyMap {
        self.values
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// 是否隐藏
    pub fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    /// 最近一次由父时间轴同步的位置
    pub fn synced_position(&self) -> Option<f64> {
        self.synced_position.get()
    }

    /// 已建立同步关系的目标数量
    pub fn synchronized_count(&self) -> usize {
        self.synchronized.borrow().len()
    }

    /// 登记的 tween 数量
    pub fn tween_count(&self) -> usize {
        self.tweens.borrow().len()
    }

    /// 驱动登记的 tween
    ///
    /// 按 tween 的计时方式选择毫秒或帧数；已结束的 tween 被移除。
    ///
    /// # 返回
    /// 本次移除的 tween
    pub fn advance(&self, time_ms: f64, ticks: u64) -> Vec<TweenId> {
        // 克隆列表：动作回调可能登记或注销 tween
        let tweens: Vec<Tween> = self.tweens.borrow().clone();
        let mode = match self.play_mode {
            PlayMode::Independent => UpdateMode::Normal,
            PlayMode::Synchronized => UpdateMode::Synchronized,
        };
        for tween in &tweens {
            let time = if tween.use_ticks() {
                ticks as f64
            } else {
                time_ms
            };
            tween.update_tween(time, mode, None);
        }
        let mut finished = Vec::new();
        self.tweens.borrow_mut().retain(|t| {
            if t.is_ended() {
                finished.push(t.id());
                false
            } else {
                true
            }
        });
        finished
    }
}

impl fmt::Debug for SimpleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleTarget")
            .field("name", &self.name)
            .field("values", &self.values.borrow())
            .field("hidden", &self.hidden.get())
            .field("tweens", &self.tweens.borrow().len())
            .finish()
    }
}

impl Animatable for SimpleTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn setters(&self) -> &SetterTable {
        &self.setters
    }

    fn get_property(&self, name: &str) -> Option<PropertyValue> {
        self.values.borrow().get(name).cloned()
    }

    fn set_property(&self, name: &str, value: PropertyValue) -> bool {
        match self.values.borrow_mut().get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
    }

    fn register_tween(&self, tween: &Tween) {
        let mut tweens = self.tweens.borrow_mut();
        if !tweens.iter().any(|t| t.id() == tween.id()) {
            tweens.push(tween.clone());
        }
    }

    fn unregister_tween(&self, tween: &Tween) {
        self.tweens.borrow_mut().retain(|t| t.id() != tween.id());
    }

    fn has_tweens(&self) -> bool {
        !self.tweens.borrow().is_empty()
    }

    fn play_mode(&self) -> PlayMode {
        self.play_mode
    }

    fn synchronize(&self, other: &TargetRef, enable: bool) {
        let mut synchronized = self.synchronized.borrow_mut();
        if enable {
            push_unique_target(&mut synchronized, other);
        } else {
            synchronized.retain(|t| !same_target(t, other));
        }
    }

    fn sync_position(&self, position: f64) {
        self.synced_position.set(Some(position));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> PropertyMap {
        PropertyMap::new()
            .with("x", 0.0)
            .with("visible", true)
            .with(START_POSITION, 0.0)
    }

    #[test]
    fn test_setter_inference() {
        let target = SimpleTarget::new("box", &props());
        let setters = target.setters();
        assert!(matches!(setters.get("x"), Some(Setter::Number)));
        assert!(matches!(setters.get("visible"), Some(Setter::Discrete)));
        assert!(matches!(
            setters.get(START_POSITION),
            Some(Setter::StartPosition)
        ));
    }

    #[test]
    fn test_get_set_property() {
        let target = SimpleTarget::new("box", &props());
        assert!(target.set_property("x", PropertyValue::Number(5.0)));
        assert_eq!(target.number("x"), Some(5.0));
        assert!(!target.set_property("unknown", PropertyValue::Number(1.0)));
    }

    #[test]
    fn test_push_unique_target() {
        let a: TargetRef = SimpleTarget::shared("a", &props());
        let b: TargetRef = SimpleTarget::shared("b", &props());
        let mut targets = Vec::new();
        assert!(push_unique_target(&mut targets, &a));
        assert!(!push_unique_target(&mut targets, &a));
        assert!(push_unique_target(&mut targets, &b));
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn test_synchronize_toggle() {
        let parent = SimpleTarget::new("parent", &props());
        let child: TargetRef = SimpleTarget::shared("child", &props());
        parent.synchronize(&child, true);
        parent.synchronize(&child, true);
        assert_eq!(parent.synchronized_count(), 1);
        parent.synchronize(&child, false);
        assert_eq!(parent.synchronized_count(), 0);
    }

    #[test]
    fn test_setter_create_reads_current_value() {
        let target: TargetRef = SimpleTarget::shared("box", &props());
        let property = Setter::Number.create("x", &target).unwrap();
        assert_eq!(property.value(), Some(PropertyValue::Number(0.0)));
        assert!(Setter::Number.create("missing", &target).is_none());
    }
}
