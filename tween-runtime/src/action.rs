//! # Action 模块
//!
//! 排在时间轴上的回调。
//!
//! 动作在播放经过其时间点时执行；同一轮播放中最多执行一次，循环回绕后
//! 可以再次执行。回调可以重入地修改自己所在的 tween（例如跳转位置）。

use std::fmt;
use std::rc::Rc;

use crate::error::{TweenError, TweenResult};
use crate::target::TargetRef;
use crate::tween::Tween;
use crate::value::PropertyValue;

/// 动作参数上限
pub const MAX_ACTION_PARAMS: usize = 3;

/// 动作回调
pub type ActionFn = Rc<dyn Fn(&ActionContext<'_>)>;

/// 回调执行时可见的上下文
pub struct ActionContext<'a> {
    /// 触发动作的 tween
    pub tween: &'a Tween,
    /// 动作的计划时间
    pub time: f64,
    /// 位置参数
    pub params: &'a [PropertyValue],
    /// 作用域目标
    pub scope: Option<&'a TargetRef>,
}

/// 时间轴动作
pub struct Action {
    time: f64,
    callback: ActionFn,
    params: Vec<PropertyValue>,
    scope: Option<TargetRef>,
}

impl Action {
    /// 创建动作
    ///
    /// 参数超过 [`MAX_ACTION_PARAMS`] 个时返回错误。
    pub fn new(
        time: f64,
        callback: ActionFn,
        params: Vec<PropertyValue>,
        scope: Option<TargetRef>,
    ) -> TweenResult<Self> {
        if params.len() > MAX_ACTION_PARAMS {
            return Err(TweenError::TooManyActionParams {
                count: params.len(),
                max: MAX_ACTION_PARAMS,
            });
        }
        Ok(Self {
            time,
            callback,
            params,
            scope,
        })
    }

    /// 计划时间
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn params(&self) -> &[PropertyValue] {
        &self.params
    }

    pub(crate) fn run(&self, tween: &Tween) {
        let cx = ActionContext {
            tween,
            time: self.time,
            params: &self.params,
            scope: self.scope.as_ref(),
        };
        (self.callback)(&cx);
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("time", &self.time)
            .field("params", &self.params)
            .field("scope", &self.scope.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}
