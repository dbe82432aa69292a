//! 代理驱动。
//!
//! 挂到代理（通常是父时间轴）后，tween 从原驱动注销，由代理统一推进。

use std::rc::Rc;

use tracing::debug;

use crate::target::{PlayMode, TargetRef, push_unique_target};

use super::{Driver, Tween};

/// 代理驱动接口
pub trait TweenProxy {
    /// 新加入的目标
    fn add_targets(&self, targets: &[TargetRef]);

    /// 与同步模式目标建立同步
    fn synchronize(&self, target: &TargetRef);
}

impl Tween {
    /// 挂到代理
    ///
    /// 把本 tween 涉及且 `targets` 中尚未出现的目标交给代理，并让代理与其中的
    /// 同步模式目标建立同步；随后编译。同一代理重复挂载不做任何事。
    ///
    /// # 返回
    /// tween 时长
    pub fn set_proxy(&self, proxy: &Rc<dyn TweenProxy>, targets: &mut Vec<TargetRef>) -> f64 {
        let inner = &self.inner;
        if let Driver::Proxy(current) = &*inner.driver.borrow() {
            if std::ptr::addr_eq(current.as_ptr(), Rc::as_ptr(proxy)) {
                return inner.duration.get();
            }
        }

        self.unregister();
        *inner.driver.borrow_mut() = Driver::Proxy(Rc::downgrade(proxy));

        let collected: Vec<TargetRef> = match &inner.target {
            Some(target) => vec![target.clone()],
            None => {
                let pending = inner.pending.borrow();
                let mut own = inner.targets.borrow_mut();
                let mut time = inner.compiled_duration.get();
                for command in pending.iter() {
                    time += command.collect_targets(time, &mut own);
                }
                own.clone()
            }
        };

        let fresh: Vec<TargetRef> = collected
            .iter()
            .filter(|t| push_unique_target(targets, t))
            .cloned()
            .collect();
        proxy.add_targets(&fresh);
        for target in &collected {
            if target.play_mode() == PlayMode::Synchronized {
                proxy.synchronize(target);
            }
        }

        self.compile();
        debug!(
            tween = %inner.id,
            targets = collected.len(),
            duration = inner.duration.get(),
            "tween 挂到代理"
        );
        inner.duration.get()
    }

    /// 从代理摘下，回到未登记状态
    pub fn clear_proxy(&self) {
        let mut driver = self.inner.driver.borrow_mut();
        if matches!(&*driver, Driver::Proxy(_)) {
            *driver = Driver::Detached;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::property::StateEntry;
    use crate::target::SimpleTarget;
    use crate::tween::TweenOptions;
    use crate::value::PropertyMap;

    #[derive(Default)]
    struct Recorder {
        added: RefCell<Vec<String>>,
        synced: RefCell<Vec<String>>,
    }

    impl TweenProxy for Recorder {
        fn add_targets(&self, targets: &[TargetRef]) {
            self.added
                .borrow_mut()
                .extend(targets.iter().map(|t| t.name().to_string()));
        }

        fn synchronize(&self, target: &TargetRef) {
            self.synced.borrow_mut().push(target.name().to_string());
        }
    }

    fn props() -> PropertyMap {
        PropertyMap::new().with("x", 0.0)
    }

    #[test]
    fn test_same_proxy_is_noop() {
        let recorder = Rc::new(Recorder::default());
        let proxy: Rc<dyn TweenProxy> = recorder.clone();
        let target: TargetRef = SimpleTarget::shared("a", &props());
        let tween = Tween::new(Some(target), TweenOptions::default());
        tween.to(props().with("x", 5.0), 100.0, None).unwrap();

        let mut known = Vec::new();
        assert_eq!(tween.set_proxy(&proxy, &mut known), 100.0);
        assert_eq!(tween.set_proxy(&proxy, &mut known), 100.0);
        assert_eq!(*recorder.added.borrow(), vec!["a".to_string()]);
        assert!(tween.is_proxied());
    }

    #[test]
    fn test_state_targets_and_synchronization() {
        let recorder = Rc::new(Recorder::default());
        let proxy: Rc<dyn TweenProxy> = recorder.clone();
        let a: TargetRef = SimpleTarget::shared("a", &props());
        let b: TargetRef = Rc::new(
            SimpleTarget::new("b", &props()).with_play_mode(PlayMode::Synchronized),
        );
        let tween = Tween::new(None, TweenOptions::default());
        tween
            .state(vec![StateEntry::new(a.clone(), props())], 100.0)
            .unwrap()
            .state(vec![StateEntry::new(b.clone(), props())], 100.0)
            .unwrap();

        let mut known = vec![a.clone()];
        tween.set_proxy(&proxy, &mut known);
        assert_eq!(known.len(), 2);
        assert_eq!(*recorder.added.borrow(), vec!["b".to_string()]);
        assert_eq!(*recorder.synced.borrow(), vec!["b".to_string()]);
        assert_eq!(tween.targets().len(), 2);
    }

    #[test]
    fn test_proxy_unregisters_from_target() {
        let ticker = crate::Ticker::new();
        let simple = SimpleTarget::shared("a", &props());
        let target: TargetRef = simple.clone();
        let tween = Tween::create(Some(target), TweenOptions::default(), &ticker);
        assert_eq!(simple.tween_count(), 1);

        let proxy: Rc<dyn TweenProxy> = Rc::new(Recorder::default());
        tween.set_proxy(&proxy, &mut Vec::new());
        assert_eq!(simple.tween_count(), 0);

        // 挂在代理上时继续播放不会重新登记
        tween.set_paused(false);
        assert_eq!(simple.tween_count(), 0);
    }
}
