//! # Timeline 模块
//!
//! 父时间轴：作为代理统一驱动一组 tween。
//!
//! 时间轴维护自己的位置，每次更新把同一位置推给所有子 tween（只应用，不推进），
//! 再按时间轴的区间执行子 tween 的动作。同步模式目标在位置变化时收到通知。

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::target::{TargetRef, push_unique_target};
use crate::tween::{Tween, TweenOptions, TweenProxy, UpdateMode};

struct TimelineInner {
    owner: Option<TargetRef>,
    tweens: RefCell<Vec<Tween>>,
    targets: RefCell<Vec<TargetRef>>,
    synchronized: RefCell<Vec<TargetRef>>,
    duration: Cell<f64>,
    position: Cell<f64>,
    looping: Cell<bool>,
    paused: Cell<bool>,
    ended: Cell<bool>,
    use_ticks: bool,
    last_time: Cell<Option<f64>>,
    updating: Cell<bool>,
    seek: Cell<Option<f64>>,
}

impl TweenProxy for TimelineInner {
    fn add_targets(&self, targets: &[TargetRef]) {
        let mut known = self.targets.borrow_mut();
        for target in targets {
            push_unique_target(&mut known, target);
        }
    }

    fn synchronize(&self, target: &TargetRef) {
        if push_unique_target(&mut self.synchronized.borrow_mut(), target) {
            if let Some(owner) = &self.owner {
                owner.synchronize(target, true);
            }
        }
    }
}

/// 父时间轴句柄
#[derive(Clone)]
pub struct Timeline {
    inner: Rc<TimelineInner>,
}

impl Timeline {
    /// 创建时间轴
    ///
    /// `owner` 是拥有该时间轴的目标（例如影片剪辑），同步模式子目标会与它建立同步。
    pub fn new(owner: Option<TargetRef>, options: TweenOptions) -> Self {
        let inner = TimelineInner {
            owner,
            tweens: RefCell::new(Vec::new()),
            targets: RefCell::new(Vec::new()),
            synchronized: RefCell::new(Vec::new()),
            duration: Cell::new(0.0),
            position: Cell::new(options.position.max(0.0)),
            looping: Cell::new(options.looping),
            paused: Cell::new(options.paused),
            ended: Cell::new(false),
            use_ticks: options.use_ticks,
            last_time: Cell::new(None),
            updating: Cell::new(false),
            seek: Cell::new(None),
        };
        Self {
            inner: Rc::new(inner),
        }
    }

    /// 加入 tween，返回其时长
    pub fn add_tween(&self, tween: &Tween) -> f64 {
        let proxy: Rc<dyn TweenProxy> = self.inner.clone();
        let mut known = self.inner.targets.borrow().clone();
        let duration = tween.set_proxy(&proxy, &mut known);

        let mut tweens = self.inner.tweens.borrow_mut();
        if !tweens.iter().any(|t| t == tween) {
            tweens.push(tween.clone());
        }
        if duration > self.inner.duration.get() {
            self.inner.duration.set(duration);
        }
        debug!(tween = %tween.id(), duration, "时间轴加入 tween");
        duration
    }

    /// 移除 tween
    pub fn remove_tween(&self, tween: &Tween) -> bool {
        let mut tweens = self.inner.tweens.borrow_mut();
        let before = tweens.len();
        tweens.retain(|t| t != tween);
        let removed = tweens.len() != before;
        if removed {
            tween.clear_proxy();
            let duration = tweens.iter().map(Tween::duration).fold(0.0, f64::max);
            self.inner.duration.set(duration);
        }
        removed
    }

    pub fn duration(&self) -> f64 {
        self.inner.duration.get()
    }

    pub fn position(&self) -> f64 {
        self.inner.position.get()
    }

    pub fn is_ended(&self) -> bool {
        self.inner.ended.get()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.get()
    }

    pub fn use_ticks(&self) -> bool {
        self.inner.use_ticks
    }

    pub fn tween_count(&self) -> usize {
        self.inner.tweens.borrow().len()
    }

    /// 子 tween 涉及的全部目标
    pub fn targets(&self) -> Vec<TargetRef> {
        self.inner.targets.borrow().clone()
    }

    /// 已建立同步的目标
    pub fn synchronized_targets(&self) -> Vec<TargetRef> {
        self.inner.synchronized.borrow().clone()
    }

    pub fn set_looping(&self, looping: bool) {
        self.inner.looping.set(looping);
    }

    /// 暂停或继续；继续时重置计时基准
    pub fn set_paused(&self, paused: bool) {
        self.inner.paused.set(paused);
        if !paused {
            self.inner.last_time.set(None);
        }
    }

    /// 推进时间轴
    ///
    /// 首次调用只建立时间基准。动作中对时间轴的跳转在本次更新末尾应用。
    pub fn update(&self, time: f64) -> f64 {
        let inner = &self.inner;
        if inner.updating.get() || inner.paused.get() || inner.ended.get() {
            return inner.position.get();
        }
        let delta = match inner.last_time.get() {
            Some(last) => (time - last).max(0.0),
            None => 0.0,
        };
        inner.last_time.set(Some(time));

        let start = inner.position.get();
        let end = start + delta;
        inner.updating.set(true);
        let mut applied = self.apply_position(end);
        if delta > 0.0 {
            self.run_actions(start, end);
        }
        if let Some(seek) = inner.seek.take() {
            trace!(position = seek, "时间轴动作跳转");
            applied = self.apply_position(seek);
        }
        inner.updating.set(false);
        applied
    }

    /// 跳转；所有子 tween 在本次调用内移动到同一位置
    pub fn set_position(&self, position: f64) -> f64 {
        let inner = &self.inner;
        if inner.updating.get() {
            inner.seek.set(Some(position));
            return position;
        }
        self.apply_position(position)
    }

    fn apply_position(&self, position: f64) -> f64 {
        let inner = &self.inner;
        let duration = inner.duration.get();
        let mut position = if position.is_nan() { 0.0 } else { position.max(0.0) };
        if duration <= 0.0 {
            position = 0.0;
            inner.ended.set(!inner.looping.get());
        } else if position >= duration && !inner.looping.get() {
            position = duration;
            inner.ended.set(true);
        } else {
            position %= duration;
            inner.ended.set(false);
        }
        inner.position.set(position);

        let time = inner.last_time.get().unwrap_or(0.0);
        let tweens = inner.tweens.borrow().clone();
        for tween in &tweens {
            tween.update_tween(time, UpdateMode::UpdateOnly, Some(position));
        }
        let synchronized = inner.synchronized.borrow().clone();
        for target in &synchronized {
            target.sync_position(position);
        }
        position
    }

    /// 按时间轴区间执行子 tween 的动作，循环回绕时分两段
    fn run_actions(&self, start: f64, end: f64) {
        let inner = &self.inner;
        let duration = inner.duration.get();
        let tweens = inner.tweens.borrow().clone();
        let wrapped = inner.looping.get() && duration > 0.0 && end >= duration;
        for tween in &tweens {
            let interrupted = if wrapped {
                tween.run_actions_between(start, duration, false)
                    || self.has_seek()
                    || tween.run_actions_between(0.0, end % duration, true)
            } else {
                tween.run_actions_between(start, end, false)
            };
            if interrupted || self.has_seek() {
                break;
            }
        }
    }

    fn has_seek(&self) -> bool {
        self.inner.seek.get().is_some()
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("tweens", &self.inner.tweens.borrow().len())
            .field("duration", &self.inner.duration.get())
            .field("position", &self.inner.position.get())
            .field("loop", &self.inner.looping.get())
            .finish()
    }
}
