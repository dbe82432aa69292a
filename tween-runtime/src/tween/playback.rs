//! 播放状态机。
//!
//! 每次更新：解析新位置 -> 定位活动步骤 -> 计算比例写入属性 -> 执行经过的动作。
//! 动作回调可以重入地跳转本 tween：更新期间的跳转只被记录，外层在动作扫描
//! 被打断后从跳转位置重放一次更新。

use tracing::trace;

use crate::property::SetContext;
use crate::step::Step;

use super::{Tween, UpdateMode};

impl Tween {
    /// 推进播放
    ///
    /// - `time`: 驱动时间（毫秒或帧数，取决于 `use_ticks`）
    /// - `mode`: 更新方式，见 [`UpdateMode`]
    /// - `next`: 父时间轴指定的位置；给出时先跳转到该位置
    ///
    /// # 返回
    /// 应用后的位置
    pub fn update_tween(&self, time: f64, mode: UpdateMode, next: Option<f64>) -> f64 {
        let inner = &self.inner;
        if let Some(next) = next.filter(|n| *n >= 0.0) {
            inner.action_cursor.set(0);
            if inner.position.get() != next || inner.seek.get() {
                self.set_position(next, true);
            }
            if mode == UpdateMode::UpdateOnly {
                inner.last_time.set(Some(time));
                return inner.position.get();
            }
        }

        if inner.updating.get() {
            return inner.position.get();
        }

        let seek = inner.seek.get();
        let idle = inner.last_time.get() == Some(time)
            || inner.paused.get()
            || inner.single_frame.get()
            || inner.ended.get();
        if idle && !seek {
            return inner.position.get();
        }

        self.compile();
        let delta = match inner.last_time.get() {
            Some(last) if !seek => (time - last).max(0.0),
            _ => 0.0,
        };
        inner.last_time.set(Some(time));

        let start = inner.position.get();
        let end = start + delta;
        inner.previous_position.set(start);
        inner.seek.set(false);
        inner.updating.set(true);

        let mut applied = self.update_animation(end, seek);
        if mode == UpdateMode::Normal && self.run_actions(start, end) {
            // 动作中发生了跳转：从跳转位置重放
            inner.seek.set(false);
            applied = self.update_animation(inner.position.get(), true);
        }

        inner.updating.set(false);
        applied
    }

    /// 跳转到指定位置
    ///
    /// `apply` 为真时立即写入属性；否则记录为待应用的跳转，下一次更新时生效。
    /// 更新过程中（例如动作回调里）调用时总是只记录。
    pub fn set_position(&self, position: f64, apply: bool) -> f64 {
        let inner = &self.inner;
        let position = if position.is_nan() {
            0.0
        } else {
            position.max(0.0)
        };
        inner.previous_position.set(inner.position.get());
        inner.position.set(position);
        inner.seek.set(true);
        inner.action_cursor.set(0);

        if inner.updating.get() {
            trace!(tween = %inner.id, position, "更新中跳转，推迟到本次更新末尾");
            return position;
        }
        if !apply {
            return position;
        }

        self.compile();
        inner.seek.set(false);
        self.update_animation(position, true)
    }

    /// 钳制/回绕位置并写入活动步骤
    pub(super) fn update_animation(&self, position: f64, seek: bool) -> f64 {
        let inner = &self.inner;
        let duration = inner.compiled_duration.get();
        let looping = inner.looping.get();
        let mut position = if position.is_nan() { 0.0 } else { position.max(0.0) };

        let finished = if duration <= 0.0 {
            position = 0.0;
            true
        } else if position >= duration && !looping {
            position = duration;
            true
        } else {
            if position >= duration {
                position %= duration;
                inner.step_cursor.set(1);
            }
            false
        };
        inner.position.set(position);
        inner.ended.set(finished);

        if finished {
            self.apply_final_state();
            return position;
        }

        if seek {
            inner.step_cursor.set(1);
        }
        let steps = inner.steps.borrow();
        if steps.is_empty() {
            return position;
        }

        let index = self.get_step(&steps, position);
        let step = &steps[index];
        let step_ratio = step.ratio_at(position);
        let boundary = step_ratio == 0.0 || step_ratio == 1.0 || seek;
        let moved = inner.last_step.get() != Some(index);
        if !boundary && !step.has_numeric_property() && !moved {
            return position;
        }
        inner.last_step.set(Some(index));

        let ratio = step.eased(step_ratio);
        let targets = inner.targets.borrow();
        let cx = SetContext {
            target: inner.target.as_ref(),
            targets: &targets,
            owner: inner.id,
        };
        trace!(tween = %inner.id, step = index, ratio = step_ratio, "写入步骤");
        for property in step.properties() {
            property.set_value(&cx, ratio, step_ratio);
        }
        position
    }

    /// 从游标向前扫描，返回活动步骤索引
    fn get_step(&self, steps: &[Step], position: f64) -> usize {
        let mut cursor = self.inner.step_cursor.get().clamp(1, steps.len());
        while cursor < steps.len() && steps[cursor].start_time() <= position {
            cursor += 1;
        }
        self.inner.step_cursor.set(cursor);
        cursor - 1
    }

    /// 结束时整体写入最终值（含末尾零时长指令的值）
    fn apply_final_state(&self) {
        let inner = &self.inner;
        let targets = inner.targets.borrow();
        let cx = SetContext {
            target: inner.target.as_ref(),
            targets: &targets,
            owner: inner.id,
        };
        for property in inner.current.borrow().values() {
            property.set_value(&cx, 1.0, 1.0);
        }
        if let Some(state) = inner.final_state.borrow().as_ref() {
            state.set_value(&cx, 1.0);
        }
        inner.last_step.set(None);
    }

    /// 执行 `(start, end]` 内的动作
    ///
    /// 循环且越过末尾时，再执行 `[0, end % duration]` 内的动作。
    ///
    /// # 返回
    /// - `true`: 某个动作跳转了本 tween，扫描已停止
    pub(crate) fn run_actions(&self, start: f64, end: f64) -> bool {
        if end <= start {
            return false;
        }
        let duration = self.inner.compiled_duration.get();
        if self.inner.looping.get() && duration > 0.0 && end >= duration {
            self.fire_actions(start, duration, false) || self.fire_actions(0.0, end % duration, true)
        } else {
            self.fire_actions(start, end, false)
        }
    }

    /// 执行 `[from, to]`（`include_from` 为假时为 `(from, to]`）内的动作
    ///
    /// 由父时间轴调用：回调里的跳转被推迟，扫描结束后从跳转位置重放。
    pub(crate) fn run_actions_between(&self, from: f64, to: f64, include_from: bool) -> bool {
        let inner = &self.inner;
        if inner.updating.get() {
            return false;
        }
        inner.updating.set(true);
        let interrupted = self.fire_actions(from, to, include_from);
        if interrupted {
            inner.seek.set(false);
            self.update_animation(inner.position.get(), true);
        }
        inner.updating.set(false);
        interrupted
    }

    /// 从动作游标继续扫描
    ///
    /// `include_from` 为真的扫描从 0 开始（循环回绕），游标先归零。
    fn fire_actions(&self, from: f64, to: f64, include_from: bool) -> bool {
        let inner = &self.inner;
        let passed = |time: f64| if include_from { time < from } else { time <= from };
        if include_from {
            inner.action_cursor.set(0);
        }
        let mut index = {
            let actions = inner.actions.borrow();
            let mut index = inner.action_cursor.get().min(actions.len());
            // 游标越过了 from：位置被外部改动过，从头定位
            if index > 0 && !passed(actions[index - 1].time()) {
                index = 0;
            }
            while index < actions.len() && passed(actions[index].time()) {
                index += 1;
            }
            index
        };
        inner.action_cursor.set(index);
        loop {
            let action = match inner.actions.borrow().get(index) {
                Some(action) if action.time() <= to => action.clone(),
                _ => break,
            };
            index += 1;
            inner.action_cursor.set(index);
            action.run(self);
            if inner.seek.get() {
                trace!(tween = %inner.id, time = action.time(), "动作跳转，停止扫描");
                return true;
            }
        }
        false
    }
}
