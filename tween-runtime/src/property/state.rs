//! 多目标状态属性。

use std::fmt;
use std::rc::Rc;

use crate::target::{TargetRef, same_target};
use crate::value::PropertyMap;

use super::SetContext;

/// 状态条目：一个目标及其在该状态下的属性
#[derive(Clone)]
pub struct StateEntry {
    pub target: TargetRef,
    pub props: PropertyMap,
}

impl StateEntry {
    pub fn new(target: TargetRef, props: PropertyMap) -> Self {
        Self { target, props }
    }
}

impl fmt::Debug for StateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateEntry")
            .field("target", &self.target.name())
            .field("props", &self.props)
            .finish()
    }
}

/// 把一组属性分发到各条目目标
///
/// 写入时，tween 已知但不在本状态中的目标会被隐藏。
#[derive(Debug, Clone)]
pub struct StateProperty {
    entries: Rc<[StateEntry]>,
}

impl StateProperty {
    pub fn new(entries: Rc<[StateEntry]>) -> Self {
        Self { entries }
    }

    /// 状态条目
    pub fn entries(&self) -> &[StateEntry] {
        &self.entries
    }

    fn contains(&self, target: &TargetRef) -> bool {
        self.entries.iter().any(|e| same_target(&e.target, target))
    }

    pub(crate) fn set_value(&self, cx: &SetContext<'_>, _step_ratio: f64) {
        for target in cx.targets {
            target.set_hidden(!self.contains(target));
        }
        for entry in self.entries.iter() {
            entry.target.set_hidden(false);
            for (name, value) in entry.props.iter() {
                entry.target.set_property(name, value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{Animatable, SimpleTarget};
    use crate::tween::TweenId;
    use crate::value::PropertyValue;

    #[test]
    fn test_state_fans_out_and_hides_absent_targets() {
        let a = SimpleTarget::shared("a", &PropertyMap::new().with("x", 0.0));
        let b = SimpleTarget::shared("b", &PropertyMap::new().with("x", 0.0));
        let a_ref: TargetRef = a.clone();
        let b_ref: TargetRef = b.clone();

        let state = StateProperty::new(Rc::from(vec![StateEntry::new(
            a_ref.clone(),
            PropertyMap::new().with("x", 42.0),
        )]));
        let targets = vec![a_ref, b_ref];
        let cx = SetContext {
            target: None,
            targets: &targets,
            owner: TweenId::new(1),
        };
        state.set_value(&cx, 0.0);

        assert_eq!(a.get_property("x"), Some(PropertyValue::Number(42.0)));
        assert!(!a.is_hidden());
        assert!(b.is_hidden());
    }
}
