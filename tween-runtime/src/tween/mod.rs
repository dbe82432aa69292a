//! # Tween 模块
//!
//! 时间轴控制器：排队指令，惰性编译为步骤，并逐帧驱动目标属性。
//!
//! ## 生命周期
//!
//! ```text
//! 未编译 ──首帧/跳转/挂到代理──▶ 播放中 ──▶ 暂停 / 结束
//! ```
//!
//! [`Tween`] 是共享句柄：目标、时钟、父时间轴和动作回调都持有同一个 tween，
//! 内部状态用 `Cell`/`RefCell` 保存，回调可以在更新过程中重入地修改它。
//!
//! ## 驱动方式
//!
//! - 有目标：登记到目标，由目标驱动（[`crate::SimpleTarget::advance`]）
//! - 无目标：登记到时钟（[`crate::Ticker`]）
//! - 挂到代理（[`crate::Timeline`]）后由代理统一驱动，不再自行登记

mod playback;
mod proxy;

pub use proxy::TweenProxy;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{Action, ActionContext};
use crate::command::{
    Command, CompileContext, CurrentMap, GuideCommand, GuidePath, clamp_duration,
};
use crate::easing::Ease;
use crate::error::{TweenError, TweenResult};
use crate::property::{StateEntry, StateProperty};
use crate::step::{Step, StepSummary};
use crate::target::TargetRef;
use crate::ticker::{Ticker, TickerInner};
use crate::value::{PropertyMap, PropertyValue};

static NEXT_TWEEN_ID: AtomicU64 = AtomicU64::new(1);

/// Tween 唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TweenId(u64);

impl TweenId {
    #[cfg(test)]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    fn next() -> Self {
        Self(NEXT_TWEEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// 数值形式
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TweenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tween({})", self.0)
    }
}

/// 更新方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// 推进并执行动作
    #[default]
    Normal,
    /// 由父时间轴同步：推进但不执行动作
    Synchronized,
    /// 只应用 `next` 指定的位置后立即返回
    UpdateOnly,
}

/// 播放事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenEvent {
    /// 非循环 tween 播放到末尾
    Completed(TweenId),
}

/// 构造选项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweenOptions {
    /// 循环播放
    #[serde(rename = "loop")]
    pub looping: bool,
    /// 创建时暂停（不登记到任何驱动）
    pub paused: bool,
    /// 按帧计数推进而不是毫秒
    pub use_ticks: bool,
    /// 初始位置
    pub position: f64,
    /// 单帧锁定：只在跳转时更新
    pub single_frame: bool,
}

/// 当前驱动者
enum Driver {
    Detached,
    Target,
    Clock,
    Proxy(Weak<dyn TweenProxy>),
}

pub(crate) struct TweenInner {
    id: TweenId,
    target: Option<TargetRef>,
    targets: RefCell<Vec<TargetRef>>,

    duration: Cell<f64>,
    compiled_duration: Cell<f64>,
    position: Cell<f64>,
    previous_position: Cell<f64>,
    looping: Cell<bool>,
    paused: Cell<bool>,
    ended: Cell<bool>,
    use_ticks: Cell<bool>,
    single_frame: Cell<bool>,

    seek: Cell<bool>,
    updating: Cell<bool>,
    last_time: Cell<Option<f64>>,
    /// 活动步骤索引 + 1
    step_cursor: Cell<usize>,
    last_step: Cell<Option<usize>>,
    /// 下一个待检查的动作索引
    action_cursor: Cell<usize>,

    pending: RefCell<Vec<Command>>,
    steps: RefCell<Vec<Step>>,
    current: RefCell<CurrentMap>,
    final_state: RefCell<Option<StateProperty>>,
    actions: RefCell<Vec<Rc<Action>>>,

    driver: RefCell<Driver>,
    clock: RefCell<Weak<TickerInner>>,
}

/// Tween 句柄
#[derive(Clone)]
pub struct Tween {
    inner: Rc<TweenInner>,
}

impl Tween {
    /// 创建 tween，但不登记到任何驱动
    pub fn new(target: Option<TargetRef>, options: TweenOptions) -> Self {
        let inner = TweenInner {
            id: TweenId::next(),
            target,
            targets: RefCell::new(Vec::new()),
            duration: Cell::new(0.0),
            compiled_duration: Cell::new(0.0),
            position: Cell::new(0.0),
            previous_position: Cell::new(0.0),
            looping: Cell::new(options.looping),
            paused: Cell::new(options.paused),
            ended: Cell::new(false),
            use_ticks: Cell::new(options.use_ticks),
            single_frame: Cell::new(options.single_frame),
            seek: Cell::new(false),
            updating: Cell::new(false),
            last_time: Cell::new(None),
            step_cursor: Cell::new(1),
            last_step: Cell::new(None),
            action_cursor: Cell::new(0),
            pending: RefCell::new(Vec::new()),
            steps: RefCell::new(Vec::new()),
            current: RefCell::new(CurrentMap::new()),
            final_state: RefCell::new(None),
            actions: RefCell::new(Vec::new()),
            driver: RefCell::new(Driver::Detached),
            clock: RefCell::new(Weak::new()),
        };
        let tween = Self {
            inner: Rc::new(inner),
        };
        if options.position > 0.0 {
            tween.set_position(options.position, false);
        }
        tween
    }

    /// 创建 tween 并立即登记播放（除非以暂停状态创建）
    ///
    /// 有目标时登记到目标，否则登记到时钟。时间从登记时刻起算。
    pub fn create(target: Option<TargetRef>, options: TweenOptions, ticker: &Ticker) -> Self {
        let tween = Self::new(target, options);
        *tween.inner.clock.borrow_mut() = ticker.downgrade();
        if !tween.is_paused() {
            tween.register();
        }
        tween
    }

    pub fn id(&self) -> TweenId {
        self.inner.id
    }

    pub fn target(&self) -> Option<&TargetRef> {
        self.inner.target.as_ref()
    }

    /// state 形式 tween 收集到的目标
    pub fn targets(&self) -> Vec<TargetRef> {
        self.inner.targets.borrow().clone()
    }

    /// 已排队指令的总时长
    pub fn duration(&self) -> f64 {
        self.inner.duration.get()
    }

    pub fn position(&self) -> f64 {
        self.inner.position.get()
    }

    pub fn previous_position(&self) -> f64 {
        self.inner.previous_position.get()
    }

    pub fn is_looping(&self) -> bool {
        self.inner.looping.get()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.get()
    }

    pub fn is_ended(&self) -> bool {
        self.inner.ended.get()
    }

    pub fn use_ticks(&self) -> bool {
        self.inner.use_ticks.get()
    }

    /// 是否挂在代理上
    pub fn is_proxied(&self) -> bool {
        matches!(&*self.inner.driver.borrow(), Driver::Proxy(_))
    }

    /// 等待 `duration`，期间保持当前值
    ///
    /// NaN 或非正时长被忽略。
    pub fn wait(&self, duration: f64) -> &Self {
        self.queue_wait(duration, false)
    }

    /// 被动等待：期间不写入任何属性
    pub fn wait_passive(&self, duration: f64) -> &Self {
        self.queue_wait(duration, true)
    }

    fn queue_wait(&self, duration: f64, passive: bool) -> &Self {
        if duration.is_nan() || duration <= 0.0 {
            return self;
        }
        self.queue(Command::Wait { duration, passive });
        self
    }

    /// 在 `duration` 内插值到 `props`
    ///
    /// 零时长只更新当前值，不产生步骤。
    pub fn to(&self, props: PropertyMap, duration: f64, ease: Option<Ease>) -> TweenResult<&Self> {
        self.require_target("to")?;
        self.queue(Command::To {
            props,
            duration: clamp_duration(duration),
            ease,
        });
        Ok(self)
    }

    /// 沿路径移动，同时把 `props` 插值到目标值
    pub fn guide(
        &self,
        path: GuidePath,
        props: PropertyMap,
        duration: f64,
        ease: Option<Ease>,
    ) -> TweenResult<&Self> {
        self.require_target("guide")?;
        let command = GuideCommand::new(path, props, clamp_duration(duration), ease);
        self.queue(Command::Guide(command));
        Ok(self)
    }

    /// 切换到一组目标各自的状态（仅无目标 tween）
    pub fn state(&self, entries: Vec<StateEntry>, duration: f64) -> TweenResult<&Self> {
        if self.inner.target.is_some() {
            return Err(TweenError::TargetNotAllowed { command: "state" });
        }
        self.queue(Command::State {
            entries: Rc::from(entries),
            duration: clamp_duration(duration),
        });
        Ok(self)
    }

    /// 在当前时长处插入回调
    pub fn call(
        &self,
        callback: impl Fn(&ActionContext<'_>) + 'static,
        params: Vec<PropertyValue>,
        scope: Option<TargetRef>,
    ) -> TweenResult<&Self> {
        let action = Action::new(self.duration(), Rc::new(callback), params, scope)?;
        self.inner.actions.borrow_mut().push(Rc::new(action));
        Ok(self)
    }

    fn require_target(&self, command: &'static str) -> TweenResult<()> {
        match self.inner.target {
            Some(_) => Ok(()),
            None => Err(TweenError::TargetRequired { command }),
        }
    }

    fn queue(&self, command: Command) {
        let inner = &self.inner;
        inner.duration.set(inner.duration.get() + command.duration());
        inner.pending.borrow_mut().push(command);
        // 追加指令可能让已结束的 tween 重新有内容可播
        if inner.ended.get() && inner.position.get() < inner.duration.get() {
            inner.ended.set(false);
            self.resume_driver();
        }
    }

    /// 结束时已被驱动移除的 tween 重新登记
    fn resume_driver(&self) {
        let inner = &self.inner;
        let dropped = matches!(&*inner.driver.borrow(), Driver::Target | Driver::Clock);
        if !dropped || inner.paused.get() {
            return;
        }
        if let Some(now) = self.clock_now() {
            inner.last_time.set(Some(now));
        }
        self.register();
        debug!(tween = %inner.id, "追加指令，重新登记");
    }

    /// 编译排队的指令
    ///
    /// 没有待编译指令时什么都不做。
    pub fn compile(&self) {
        let inner = &self.inner;
        let commands = std::mem::take(&mut *inner.pending.borrow_mut());
        if commands.is_empty() {
            return;
        }

        let mut current = inner.current.borrow_mut();
        let target = inner.target.as_ref();
        for command in &commands {
            command.collect_initial_properties(target, &mut current);
        }

        let mut targets = inner.targets.borrow_mut();
        let mut steps = inner.steps.borrow_mut();
        let mut final_state = inner.final_state.borrow_mut();
        let mut cx = CompileContext {
            target,
            targets: &mut targets,
            current: &mut current,
            steps: &mut steps,
            final_state: &mut final_state,
        };
        let mut time = inner.compiled_duration.get();
        for command in &commands {
            time += command.compile(time, &mut cx);
        }
        inner.compiled_duration.set(time);
        debug!(
            tween = %inner.id,
            commands = commands.len(),
            steps = steps.len(),
            duration = time,
            "编译 tween 指令"
        );
    }

    /// 编译后的步骤摘要
    pub fn step_summaries(&self) -> Vec<StepSummary> {
        self.compile();
        self.inner.steps.borrow().iter().map(Step::summary).collect()
    }

    /// 暂停或继续
    ///
    /// 继续时重置计时基准，暂停期间流逝的时间不计入。
    pub fn set_paused(&self, paused: bool) -> &Self {
        let inner = &self.inner;
        inner.paused.set(paused);
        if paused {
            self.unregister();
        } else {
            inner.last_time.set(self.clock_now());
            self.register();
        }
        self
    }

    /// 设置循环、位置和单帧锁定
    ///
    /// 位置变化作为待应用的跳转记录，下一次更新时生效。
    pub fn set_properties(&self, looping: bool, position: f64, single_frame: bool) -> &Self {
        let inner = &self.inner;
        inner.looping.set(looping);
        inner.single_frame.set(single_frame);
        if position != inner.position.get() {
            self.set_position(position, false);
        }
        self
    }

    /// 中止：注销并清空所有内容
    pub fn reset(&self) {
        let inner = &self.inner;
        self.unregister();
        *inner.driver.borrow_mut() = Driver::Detached;
        inner.pending.borrow_mut().clear();
        inner.steps.borrow_mut().clear();
        inner.actions.borrow_mut().clear();
        inner.action_cursor.set(0);
        inner.current.borrow_mut().clear();
        *inner.final_state.borrow_mut() = None;
        inner.duration.set(0.0);
        inner.compiled_duration.set(0.0);
        inner.position.set(0.0);
        inner.seek.set(false);
        inner.paused.set(true);
        inner.ended.set(true);
        debug!(tween = %inner.id, "tween 已中止");
    }

    /// 当前驱动时钟的时间基准
    fn clock_now(&self) -> Option<f64> {
        let ticker = Ticker::upgrade(&self.inner.clock.borrow())?;
        Some(if self.use_ticks() {
            ticker.ticks() as f64
        } else {
            ticker.time()
        })
    }

    /// 登记到目标或时钟
    ///
    /// 挂在代理上时不登记。重复登记是安全的。
    fn register(&self) {
        let inner = &self.inner;
        if matches!(&*inner.driver.borrow(), Driver::Proxy(_)) {
            return;
        }
        let driver = if let Some(target) = &inner.target {
            target.register_tween(self);
            Driver::Target
        } else if let Some(ticker) = Ticker::upgrade(&inner.clock.borrow()) {
            ticker.add_tween(self);
            Driver::Clock
        } else {
            Driver::Detached
        };
        if inner.last_time.get().is_none() {
            inner.last_time.set(self.clock_now());
        }
        *inner.driver.borrow_mut() = driver;
    }

    /// 从当前驱动注销（代理除外）
    fn unregister(&self) {
        let inner = &self.inner;
        let driver = std::mem::replace(&mut *inner.driver.borrow_mut(), Driver::Detached);
        match driver {
            Driver::Target => {
                if let Some(target) = &inner.target {
                    target.unregister_tween(self);
                }
            }
            Driver::Clock => {
                if let Some(ticker) = Ticker::upgrade(&inner.clock.borrow()) {
                    ticker.remove_tween(inner.id);
                }
            }
            Driver::Proxy(proxy) => *inner.driver.borrow_mut() = Driver::Proxy(proxy),
            Driver::Detached => {}
        }
    }
}

impl PartialEq for Tween {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Tween {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;
        f.debug_struct("Tween")
            .field("id", &inner.id)
            .field("target", &inner.target.as_ref().map(|t| t.name().to_string()))
            .field("duration", &inner.duration.get())
            .field("position", &inner.position.get())
            .field("loop", &inner.looping.get())
            .field("paused", &inner.paused.get())
            .field("ended", &inner.ended.get())
            .finish()
    }
}
