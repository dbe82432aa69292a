//! # Error 模块
//!
//! 定义 tween-runtime 中使用的错误类型。
//!
//! 播放过程本身不会产生错误：退化输入（NaN 或负数时长、空路径）一律静默
//! 钳制或忽略。只有排队指令时违反目标基数约定的调用才会返回错误。

use thiserror::Error;

/// Tween 指令排队错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TweenError {
    /// 指令需要单一目标，但 tween 没有目标（state 形式）
    #[error("tween 没有目标对象，无法排入 '{command}' 指令")]
    TargetRequired { command: &'static str },

    /// 指令只能用于无目标的 tween
    #[error("tween 已绑定目标对象，'{command}' 指令只能用于无目标的 tween")]
    TargetNotAllowed { command: &'static str },

    /// 动作参数过多
    #[error("动作参数最多 {max} 个，实际传入 {count} 个")]
    TooManyActionParams { count: usize, max: usize },
}

/// Result 类型别名
pub type TweenResult<T> = Result<T, TweenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TweenError::TargetRequired { command: "to" };
        assert!(err.to_string().contains("'to'"));

        let err = TweenError::TooManyActionParams { count: 4, max: 3 };
        assert!(err.to_string().contains('4'));
    }
}
