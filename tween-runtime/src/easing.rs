//! # Easing 模块
//!
//! 缓动函数库，把步骤内的线性进度映射为插值比例。

use std::f64::consts::PI;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// 预置缓动函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingFunction {
    /// 线性（匀速）
    #[default]
    Linear,
    /// 二次缓入
    QuadIn,
    /// 二次缓出
    QuadOut,
    /// 二次缓入缓出
    QuadInOut,
    /// 三次缓入
    CubicIn,
    /// 三次缓出
    CubicOut,
    /// 三次缓入缓出
    CubicInOut,
    /// 正弦缓入
    SineIn,
    /// 正弦缓出
    SineOut,
    /// 正弦缓入缓出
    SineInOut,
    /// 弹性缓出
    ElasticOut,
    /// 弹跳缓出
    BounceOut,
}

impl EasingFunction {
    /// 计算缓动值
    ///
    /// `t` 会被限制在 `[0, 1]`。两端点精确映射到 0 和 1。
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Self::CubicIn => t * t * t,
            Self::CubicOut => 1.0 - (1.0 - t).powi(3),
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::SineIn => 1.0 - (t * PI / 2.0).cos(),
            Self::SineOut => (t * PI / 2.0).sin(),
            Self::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Self::ElasticOut => elastic_out(t),
            Self::BounceOut => bounce_out(t),
        }
    }
}

fn elastic_out(t: f64) -> f64 {
    if t == 0.0 || t == 1.0 {
        t
    } else {
        let c4 = (2.0 * PI) / 3.0;
        2.0_f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
    }
}

fn bounce_out(t: f64) -> f64 {
    let n1 = 7.5625;
    let d1 = 2.75;

    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984375
    }
}

/// 步骤使用的缓动
///
/// 预置函数或调用方提供的闭包。闭包不做钳制，允许回弹类曲线越界。
#[derive(Clone)]
pub enum Ease {
    /// 预置缓动
    Preset(EasingFunction),
    /// 自定义缓动
    Custom(Rc<dyn Fn(f64) -> f64>),
}

impl Ease {
    /// 从闭包创建自定义缓动
    pub fn custom(f: impl Fn(f64) -> f64 + 'static) -> Self {
        Self::Custom(Rc::new(f))
    }

    /// 计算缓动值
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Self::Preset(preset) => preset.apply(t),
            Self::Custom(f) => f(t),
        }
    }
}

impl From<EasingFunction> for Ease {
    fn from(preset: EasingFunction) -> Self {
        Self::Preset(preset)
    }
}

impl fmt::Debug for Ease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preset(preset) => write!(f, "Ease::{:?}", preset),
            Self::Custom(_) => f.write_str("Ease::Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear() {
        let easing = EasingFunction::Linear;
        assert_eq!(easing.apply(0.0), 0.0);
        assert_eq!(easing.apply(0.5), 0.5);
        assert_eq!(easing.apply(1.0), 1.0);
    }

    #[test]
    fn test_endpoints_are_exact() {
        let presets = [
            EasingFunction::QuadIn,
            EasingFunction::QuadInOut,
            EasingFunction::CubicOut,
            EasingFunction::CubicInOut,
            EasingFunction::ElasticOut,
        ];
        for preset in presets {
            assert_eq!(preset.apply(0.0), 0.0, "{:?}", preset);
            assert!((preset.apply(1.0) - 1.0).abs() < 1e-12, "{:?}", preset);
        }
    }

    #[test]
    fn test_clamp() {
        let easing = EasingFunction::Linear;
        assert_eq!(easing.apply(-0.5), 0.0);
        assert_eq!(easing.apply(1.5), 1.0);
    }

    #[test]
    fn test_bounce_out_end() {
        assert!((EasingFunction::BounceOut.apply(1.0) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_custom_ease() {
        let ease = Ease::custom(|t| t * t);
        assert_eq!(ease.apply(0.5), 0.25);
        assert_eq!(format!("{:?}", ease), "Ease::Custom");
    }

    #[test]
    fn test_serde_names() {
        let easing: EasingFunction = serde_json::from_str("\"cubic_in_out\"").unwrap();
        assert_eq!(easing, EasingFunction::CubicInOut);
    }
}
