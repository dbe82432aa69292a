//! 路径引导属性：沿二次贝塞尔曲线段写入位置和朝向。

use crate::geometry::QuadBezier;
use crate::value::PropertyValue;

use super::SetContext;

/// 朝向模式
///
/// 决定路径引导期间 `rotation` 如何跟随切线。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientMode {
    /// 不改变旋转
    #[default]
    None,
    /// 跟随切线，取最短转向
    Auto,
    /// 跟随切线，只顺时针转
    Clockwise,
    /// 跟随切线，只逆时针转
    Counterclockwise,
    /// 相对页面保持固定
    Fixed,
}

impl OrientMode {
    /// 是否输出旋转属性
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// 把角度差规整到本模式允许的转向区间
    fn normalize(&self, delta: f64) -> f64 {
        const EPS: f64 = 1e-9;
        let d = delta.rem_euclid(360.0);
        match self {
            Self::None | Self::Fixed => 0.0,
            Self::Auto if d > 180.0 => d - 360.0,
            Self::Auto => d,
            Self::Clockwise if d > 360.0 - EPS => 0.0,
            Self::Clockwise => d,
            Self::Counterclockwise if d < EPS => 0.0,
            Self::Counterclockwise => d - 360.0,
        }
    }
}

/// 曲线段上 `[t0, t1]` 区间内的位置
#[derive(Debug, Clone, PartialEq)]
pub struct PathProperty {
    segment: QuadBezier,
    t0: f64,
    t1: f64,
}

impl PathProperty {
    pub fn new(segment: QuadBezier, t0: f64, t1: f64) -> Self {
        Self { segment, t0, t1 }
    }

    /// 比例对应的曲线参数
    fn param(&self, ratio: f64) -> f64 {
        if ratio >= 1.0 {
            self.t1
        } else {
            self.t0 + (self.t1 - self.t0) * ratio
        }
    }

    pub(crate) fn set_value(&self, cx: &SetContext<'_>, ratio: f64) {
        let Some(target) = cx.target else {
            return;
        };
        let point = self.segment.point(self.param(ratio));
        target.set_property("x", PropertyValue::Number(point.x));
        target.set_property("y", PropertyValue::Number(point.y));
    }
}

/// 曲线段上 `[t0, t1]` 区间内的切线朝向
///
/// 旋转值 = 段起点旋转 + 切线相对段起点切线转过的角度。
/// 反向行走时切线取反。
#[derive(Debug, Clone, PartialEq)]
pub struct RotationProperty {
    segment: QuadBezier,
    t0: f64,
    t1: f64,
    mode: OrientMode,
    reversed: bool,
    base: f64,
    start_angle: f64,
}

impl RotationProperty {
    pub fn new(segment: QuadBezier, t0: f64, t1: f64, mode: OrientMode, base: f64) -> Self {
        let reversed = t1 < t0;
        let mut property = Self {
            segment,
            t0,
            t1,
            mode,
            reversed,
            base,
            start_angle: 0.0,
        };
        property.start_angle = property.tangent_angle(t0);
        property
    }

    fn tangent_angle(&self, t: f64) -> f64 {
        let angle = self.segment.angle(t);
        if self.reversed { angle + 180.0 } else { angle }
    }

    /// 比例对应的旋转值
    pub fn rotation_at(&self, ratio: f64) -> f64 {
        let t = if ratio >= 1.0 {
            self.t1
        } else {
            self.t0 + (self.t1 - self.t0) * ratio
        };
        self.base + self.mode.normalize(self.tangent_angle(t) - self.start_angle)
    }

    /// 段终点的旋转值
    pub fn end_rotation(&self) -> f64 {
        self.rotation_at(1.0)
    }

    pub(crate) fn set_value(&self, cx: &SetContext<'_>, ratio: f64) {
        if let Some(target) = cx.target {
            target.set_property("rotation", PropertyValue::Number(self.rotation_at(ratio)));
        }
    }
}
