//! # Step 模块
//!
//! 编译后的时间片。
//!
//! 每个 [`Step`] 覆盖 `[start_time, start_time + duration)`，保存一组要写入的属性
//! 和可选缓动。步骤构造后不再修改；时长必须大于零，零时长指令只更新当前值表。

use serde::Serialize;

use crate::easing::Ease;
use crate::property::StepProperty;

/// 编译后的步骤
#[derive(Debug, Clone)]
pub struct Step {
    start_time: f64,
    duration: f64,
    inverse_duration: f64,
    properties: Vec<StepProperty>,
    ease: Option<Ease>,
    has_numeric_property: bool,
}

impl Step {
    /// 创建步骤
    pub fn new(
        start_time: f64,
        duration: f64,
        properties: Vec<StepProperty>,
        ease: Option<Ease>,
    ) -> Self {
        debug_assert!(duration > 0.0, "步骤时长必须大于零");
        let has_numeric_property = properties.iter().any(StepProperty::is_number);
        Self {
            start_time,
            duration,
            inverse_duration: 1.0 / duration,
            properties,
            ease,
            has_numeric_property,
        }
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// 位置在本步骤内的线性进度，钳制到 `[0, 1]`
    pub fn ratio_at(&self, position: f64) -> f64 {
        ((position - self.start_time) * self.inverse_duration).clamp(0.0, 1.0)
    }

    /// 应用缓动
    ///
    /// 端点不经过缓动函数，保证 0 和 1 精确。
    pub fn eased(&self, ratio: f64) -> f64 {
        match &self.ease {
            Some(ease) if ratio > 0.0 && ratio < 1.0 => ease.apply(ratio),
            _ => ratio,
        }
    }

    pub fn properties(&self) -> &[StepProperty] {
        &self.properties
    }

    /// 是否含数值属性（决定中间帧能否跳过写入）
    pub fn has_numeric_property(&self) -> bool {
        self.has_numeric_property
    }

    /// 调试摘要
    pub fn summary(&self) -> StepSummary {
        StepSummary {
            start: self.start_time,
            duration: self.duration,
            properties: self.properties.iter().map(|p| p.name().to_string()).collect(),
            eased: self.ease.is_some(),
            numeric: self.has_numeric_property,
        }
    }
}

/// 步骤摘要（调试与快照测试用）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSummary {
    pub start: f64,
    pub duration: f64,
    pub properties: Vec<String>,
    pub eased: bool,
    pub numeric: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::EasingFunction;
    use crate::property::{Property, ValueProperty};
    use crate::value::PropertyValue;
    use std::rc::Rc;

    fn numeric_step(ease: Option<Ease>) -> Step {
        let x: Rc<dyn Property> = ValueProperty::new("x", PropertyValue::Number(0.0))
            .clone_to(None, &[], PropertyValue::Number(10.0));
        Step::new(100.0, 200.0, vec![StepProperty::Tracked(x)], ease)
    }

    #[test]
    fn test_ratio_is_clamped() {
        let step = numeric_step(None);
        assert_eq!(step.ratio_at(50.0), 0.0);
        assert_eq!(step.ratio_at(200.0), 0.5);
        assert_eq!(step.ratio_at(400.0), 1.0);
        assert_eq!(step.end_time(), 300.0);
    }

    #[test]
    fn test_eased_keeps_endpoints() {
        let step = numeric_step(Some(Ease::custom(|t| t * 2.0 + 1.0)));
        assert_eq!(step.eased(0.0), 0.0);
        assert_eq!(step.eased(1.0), 1.0);
        assert_eq!(step.eased(0.5), 2.0);
    }

    #[test]
    fn test_numeric_flag() {
        assert!(numeric_step(None).has_numeric_property());
        let empty = Step::new(0.0, 10.0, Vec::new(), None);
        assert!(!empty.has_numeric_property());
    }

    #[test]
    fn test_summary() {
        let step = numeric_step(Some(EasingFunction::QuadIn.into()));
        let summary = step.summary();
        assert_eq!(summary.properties, vec!["x".to_string()]);
        assert!(summary.eased);
        assert!(summary.numeric);
    }
}
