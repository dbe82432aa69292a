//! # Ticker 模块
//!
//! 帧时钟：驱动无目标 tween、父时间轴和登记在其上的目标。
//!
//! 时钟只累计时间和帧数，不关心真实时间；宿主每帧调用 [`Ticker::tick`]
//! 或 [`Ticker::advance_frame`]。

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::target::SimpleTarget;
use crate::timeline::Timeline;
use crate::tween::{Tween, TweenEvent, TweenId, UpdateMode};

/// 默认帧率
pub const DEFAULT_FRAMERATE: f64 = 60.0;

pub(crate) struct TickerInner {
    time_ms: Cell<f64>,
    ticks: Cell<u64>,
    framerate: Cell<f64>,
    tweens: RefCell<Vec<Tween>>,
    timelines: RefCell<Vec<Timeline>>,
    targets: RefCell<Vec<Rc<SimpleTarget>>>,
}

/// 帧时钟句柄
#[derive(Clone)]
pub struct Ticker {
    inner: Rc<TickerInner>,
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

impl Ticker {
    pub fn new() -> Self {
        Self::with_framerate(DEFAULT_FRAMERATE)
    }

    /// 指定帧率创建；非正或 NaN 帧率使用默认值
    pub fn with_framerate(framerate: f64) -> Self {
        let framerate = if framerate > 0.0 {
            framerate
        } else {
            DEFAULT_FRAMERATE
        };
        Self {
            inner: Rc::new(TickerInner {
                time_ms: Cell::new(0.0),
                ticks: Cell::new(0),
                framerate: Cell::new(framerate),
                tweens: RefCell::new(Vec::new()),
                timelines: RefCell::new(Vec::new()),
                targets: RefCell::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<TickerInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<TickerInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// 累计时间（毫秒）
    pub fn time(&self) -> f64 {
        self.inner.time_ms.get()
    }

    /// 累计帧数
    pub fn ticks(&self) -> u64 {
        self.inner.ticks.get()
    }

    pub fn framerate(&self) -> f64 {
        self.inner.framerate.get()
    }

    /// 登记的无目标 tween 数量
    pub fn tween_count(&self) -> usize {
        self.inner.tweens.borrow().len()
    }

    /// 登记无目标 tween；重复登记被忽略
    pub fn add_tween(&self, tween: &Tween) {
        let mut tweens = self.inner.tweens.borrow_mut();
        if !tweens.iter().any(|t| t.id() == tween.id()) {
            tweens.push(tween.clone());
        }
    }

    pub fn remove_tween(&self, id: TweenId) {
        self.inner.tweens.borrow_mut().retain(|t| t.id() != id);
    }

    /// 登记父时间轴
    pub fn add_timeline(&self, timeline: &Timeline) {
        self.inner.timelines.borrow_mut().push(timeline.clone());
    }

    /// 登记目标，每帧驱动其 tween
    pub fn add_target(&self, target: Rc<SimpleTarget>) {
        let mut targets = self.inner.targets.borrow_mut();
        if !targets.iter().any(|t| Rc::ptr_eq(t, &target)) {
            targets.push(target);
        }
    }

    /// 推进一帧
    ///
    /// # 返回
    /// 本帧结束的 tween
    pub fn tick(&self, delta_ms: f64) -> Vec<TweenEvent> {
        let inner = &self.inner;
        let delta = if delta_ms > 0.0 { delta_ms } else { 0.0 };
        let time = inner.time_ms.get() + delta;
        let ticks = inner.ticks.get() + 1;
        inner.time_ms.set(time);
        inner.ticks.set(ticks);

        let mut events = Vec::new();

        // 克隆列表：回调可能登记或注销
        let targets = inner.targets.borrow().clone();
        for target in &targets {
            for id in target.advance(time, ticks) {
                events.push(TweenEvent::Completed(id));
            }
        }

        let tweens = inner.tweens.borrow().clone();
        for tween in &tweens {
            let now = if tween.use_ticks() { ticks as f64 } else { time };
            tween.update_tween(now, UpdateMode::Normal, None);
        }
        inner.tweens.borrow_mut().retain(|tween| {
            if tween.is_ended() && !tween.is_looping() {
                events.push(TweenEvent::Completed(tween.id()));
                false
            } else {
                true
            }
        });

        let timelines = inner.timelines.borrow().clone();
        for timeline in &timelines {
            let now = if timeline.use_ticks() {
                ticks as f64
            } else {
                time
            };
            timeline.update(now);
        }

        for event in &events {
            let TweenEvent::Completed(id) = event;
            debug!(tween = %id, "tween 播放完成");
        }
        events
    }

    /// 按帧率推进一帧
    pub fn advance_frame(&self) -> Vec<TweenEvent> {
        self.tick(1000.0 / self.framerate())
    }
}
