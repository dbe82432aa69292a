//! # Geometry 模块
//!
//! 二维向量与二次贝塞尔曲线，供路径引导（guide）指令使用。

/// 二维向量
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// 创建新的向量
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 线性插值
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// 向量差
    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// 向量长度的平方
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }
}

impl From<(f64, f64)> for Vec2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// 二次贝塞尔曲线段
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadBezier {
    pub start: Vec2,
    pub control: Vec2,
    pub end: Vec2,
}

impl QuadBezier {
    pub const fn new(start: Vec2, control: Vec2, end: Vec2) -> Self {
        Self {
            start,
            control,
            end,
        }
    }

    /// 参数 `t` 处的点
    ///
    /// `(1-t)^2 * P0 + 2(1-t)t * C + t^2 * P1`，`t = 0` 和 `t = 1` 精确落在端点上。
    pub fn point(&self, t: f64) -> Vec2 {
        let u = 1.0 - t;
        let a = u * u;
        let b = 2.0 * u * t;
        let c = t * t;
        Vec2::new(
            a * self.start.x + b * self.control.x + c * self.end.x,
            a * self.start.y + b * self.control.y + c * self.end.y,
        )
    }

    /// 参数 `t` 处的切向量
    ///
    /// 控制点与端点重合时导数为零，此时退化为弦方向。
    pub fn tangent(&self, t: f64) -> Vec2 {
        let u = 1.0 - t;
        let d0 = self.control.sub(self.start);
        let d1 = self.end.sub(self.control);
        let tangent = Vec2::new(2.0 * (u * d0.x + t * d1.x), 2.0 * (u * d0.y + t * d1.y));
        if tangent.length_squared() > f64::EPSILON {
            tangent
        } else {
            self.end.sub(self.start)
        }
    }

    /// 参数 `t` 处切线的角度（度）
    pub fn angle(&self, t: f64) -> f64 {
        let tangent = self.tangent(t);
        tangent.y.atan2(tangent.x).to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> QuadBezier {
        QuadBezier::new(
            Vec2::new(0.0, 0.0),
            Vec2::new(50.0, 100.0),
            Vec2::new(100.0, 0.0),
        )
    }

    #[test]
    fn test_vec2_lerp() {
        let v1 = Vec2::new(0.0, 0.0);
        let v2 = Vec2::new(10.0, 20.0);
        let mid = v1.lerp(v2, 0.5);
        assert_eq!(mid.x, 5.0);
        assert_eq!(mid.y, 10.0);
    }

    #[test]
    fn test_bezier_endpoints_exact() {
        let c = curve();
        assert_eq!(c.point(0.0), c.start);
        assert_eq!(c.point(1.0), c.end);
    }

    #[test]
    fn test_bezier_midpoint() {
        let p = curve().point(0.5);
        assert_eq!(p, Vec2::new(50.0, 50.0));
    }

    #[test]
    fn test_tangent_angle() {
        let c = curve();
        assert!((c.angle(0.0) - 63.434948822922).abs() < 1e-6);
        assert!(c.angle(0.5).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_tangent_uses_chord() {
        let c = QuadBezier::new(
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 10.0),
        );
        assert!((c.angle(0.0) - 90.0).abs() < 1e-9);
    }
}
