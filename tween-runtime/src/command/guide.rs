//! 路径引导指令。
//!
//! 路径是扁平化的二次贝塞尔控制点序列 `[x0, y0, cx0, cy0, x1, y1, cx1, cy1, x2, y2, ...]`，
//! 相邻曲线段共享端点。起止位置以"段"为单位，取值 `[0, 段数]`，
//! 终点小于起点时反向行走。

use serde::{Deserialize, Serialize};

use crate::easing::Ease;
use crate::geometry::{QuadBezier, Vec2};
use crate::property::{OrientMode, PathProperty, RotationProperty, StepProperty};
use crate::step::Step;
use crate::value::{PropertyMap, PropertyValue};

use super::{CompileContext, compile_to, hold};

fn default_end() -> f64 {
    1.0
}

/// 引导路径
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidePath {
    /// 扁平化控制点
    pub points: Vec<f64>,
    /// 起始位置（段）
    #[serde(default)]
    pub start: f64,
    /// 结束位置（段）
    #[serde(default = "default_end")]
    pub end: f64,
    /// 朝向模式
    #[serde(default)]
    pub orient: OrientMode,
}

impl GuidePath {
    /// 创建路径，默认走完第一段
    pub fn new(points: Vec<f64>) -> Self {
        Self {
            points,
            start: 0.0,
            end: default_end(),
            orient: OrientMode::None,
        }
    }

    /// 设置起止位置
    pub fn with_range(mut self, start: f64, end: f64) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// 设置朝向模式
    pub fn with_orient(mut self, orient: OrientMode) -> Self {
        self.orient = orient;
        self
    }

    /// 曲线段数量
    pub fn segment_count(&self) -> usize {
        if self.points.len() < 6 {
            0
        } else {
            (self.points.len() - 2) / 4
        }
    }

    /// 第 `index` 段曲线
    pub fn segment(&self, index: usize) -> Option<QuadBezier> {
        if index >= self.segment_count() {
            return None;
        }
        let p = &self.points[index * 4..index * 4 + 6];
        Some(QuadBezier::new(
            Vec2::new(p[0], p[1]),
            Vec2::new(p[2], p[3]),
            Vec2::new(p[4], p[5]),
        ))
    }

    fn clamp_fraction(&self, fraction: f64) -> f64 {
        if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, self.segment_count() as f64)
        }
    }

    /// 路径上某位置（段）处的点
    pub fn point_at(&self, fraction: f64) -> Option<Vec2> {
        let count = self.segment_count();
        if count == 0 {
            return None;
        }
        let fraction = self.clamp_fraction(fraction);
        let index = (fraction.floor() as usize).min(count - 1);
        self.segment(index)
            .map(|segment| segment.point(fraction - index as f64))
    }
}

/// 路径引导指令
#[derive(Debug, Clone)]
pub struct GuideCommand {
    path: GuidePath,
    props: PropertyMap,
    duration: f64,
    ease: Option<Ease>,
}

impl GuideCommand {
    pub fn new(path: GuidePath, props: PropertyMap, duration: f64, ease: Option<Ease>) -> Self {
        Self {
            path,
            props,
            duration,
            ease,
        }
    }

    pub fn path(&self) -> &GuidePath {
        &self.path
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// 本指令需要跟踪的属性名
    pub(crate) fn touched_properties(&self) -> Vec<&str> {
        let mut names = vec!["x", "y"];
        if self.path.orient.is_active() {
            names.push("rotation");
        }
        for name in self.props.names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// 路径被沿途接管的属性
    fn is_path_driven(&self, name: &str) -> bool {
        name == "x" || name == "y" || (name == "rotation" && self.path.orient.is_active())
    }

    pub(crate) fn compile(&self, time: f64, cx: &mut CompileContext<'_>) -> f64 {
        let duration = self.duration;
        let path = &self.path;
        if path.segment_count() == 0 {
            return compile_to(time, &self.props, duration, self.ease.as_ref(), cx);
        }

        let start = path.clamp_fraction(path.start);
        let end = path.clamp_fraction(path.end);
        if start == end {
            let mut props = self.props.clone();
            if let Some(point) = path.point_at(start) {
                props.insert("x", point.x);
                props.insert("y", point.y);
            }
            return compile_to(time, &props, duration, self.ease.as_ref(), cx);
        }

        let span = (end - start).abs();
        let forward = end > start;
        let last = path.segment_count() - 1;
        let segments: Vec<usize> = if forward {
            (start.floor() as usize..end.ceil() as usize).collect()
        } else {
            (end.floor() as usize..start.ceil() as usize).rev().collect()
        };

        let mut rotation = cx
            .current
            .get("rotation")
            .and_then(|p| p.value())
            .and_then(|v| v.as_number())
            .unwrap_or(0.0);
        let mut step_time = time;

        for index in segments.into_iter().filter(|i| *i <= last) {
            let Some(segment) = path.segment(index) else {
                continue;
            };
            let base = index as f64;
            let t0 = (start - base).clamp(0.0, 1.0);
            let t1 = (end - base).clamp(0.0, 1.0);
            if t0 == t1 {
                continue;
            }
            let seg_duration = duration * (t1 - t0).abs() / span;
            let r0 = (base + t0 - start).abs() / span;
            let r1 = (base + t1 - start).abs() / span;

            let mut properties = Vec::new();
            if seg_duration == 1.0 {
                let from = segment.point(t0);
                let to = segment.point(t1);
                for (axis, a, b) in [("x", from.x, to.x), ("y", from.y, to.y)] {
                    if let Some(property) = cx.current.get(axis) {
                        let targets = cx.targets.as_slice();
                        let first = property.clone_to(cx.target, targets, PropertyValue::Number(a));
                        let moved = first.clone_to(cx.target, targets, PropertyValue::Number(b));
                        properties.push(StepProperty::Tracked(moved));
                    }
                }
            } else {
                properties.push(StepProperty::Path(PathProperty::new(segment, t0, t1)));
            }

            if path.orient.is_active() {
                let property = RotationProperty::new(segment, t0, t1, path.orient, rotation);
                rotation = property.end_rotation();
                properties.push(StepProperty::Rotation(property));
            }

            for (name, property) in cx.current.iter() {
                if self.is_path_driven(name) {
                    continue;
                }
                let next = match self.props.get(name) {
                    Some(value) => Some(property.interpolate(value, r0, r1)),
                    None => hold(property, cx),
                };
                if let Some(next) = next {
                    properties.push(StepProperty::Tracked(next));
                }
            }

            if seg_duration > 0.0 {
                cx.steps.push(Step::new(
                    step_time,
                    seg_duration,
                    properties,
                    self.ease.clone(),
                ));
            }
            step_time += seg_duration;
        }

        self.snapshot_end(end, rotation, cx);
        duration
    }

    /// 把路径终点状态写回当前值表
    fn snapshot_end(&self, end: f64, rotation: f64, cx: &mut CompileContext<'_>) {
        let mut finals: Vec<(String, PropertyValue)> = Vec::new();
        if let Some(point) = self.path.point_at(end) {
            finals.push(("x".to_string(), PropertyValue::Number(point.x)));
            finals.push(("y".to_string(), PropertyValue::Number(point.y)));
        }
        if self.path.orient.is_active() {
            finals.push(("rotation".to_string(), PropertyValue::Number(rotation)));
        }
        for (name, value) in self.props.iter() {
            if !self.is_path_driven(name) {
                finals.push((name.to_string(), value.clone()));
            }
        }

        for (name, value) in finals {
            let Some(property) = cx.current.get(&name).cloned() else {
                continue;
            };
            let next = property.clone_to(cx.target, cx.targets.as_slice(), value);
            cx.current.insert(name, next);
        }
    }
}
