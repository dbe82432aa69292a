//! # Tween Runtime
//!
//! 补间时间轴的编译器与播放引擎。
//!
//! ## 架构概述
//!
//! `tween-runtime` 是纯逻辑核心，不依赖任何 IO 或渲染引擎。
//! 目标对象（场景图节点、显示对象）只通过 [`Animatable`] 接口被读写：
//!
//! ```text
//! 调用方                 Tween                      目标
//!   │ wait/to/guide/call   │                          │
//!   │────────────────────►│ 排队指令                   │
//!   │                      │                          │
//!   │ 时钟/父时间轴 tick    │ 首帧编译 -> Step 列表     │
//!   │────────────────────►│──── set_property ───────►│
//!   │                      │ 执行经过的 Action         │
//! ```
//!
//! ## 核心类型
//!
//! - [`Tween`]：时间轴控制器
//! - [`Command`]：未编译的指令（Wait / To / Guide / State）
//! - [`Step`]：编译后的时间片
//! - [`Property`]：可插值属性
//! - [`Action`]：时间轴上的回调
//! - [`Timeline`]：驱动多个 tween 的父时间轴
//! - [`Ticker`]：帧时钟
//!
//! ## 使用示例
//!
//! ```ignore
//! use tween_runtime::{PropertyMap, SimpleTarget, TargetRef, Ticker, Tween, TweenOptions};
//!
//! let ticker = Ticker::new();
//! let sprite = SimpleTarget::shared("sprite", &PropertyMap::new().with("x", 0.0));
//! ticker.add_target(sprite.clone());
//!
//! let target: TargetRef = sprite.clone();
//! let tween = Tween::create(Some(target), TweenOptions::default(), &ticker);
//! tween.to(PropertyMap::new().with("x", 100.0), 1000.0, None)?;
//!
//! loop {
//!     for event in ticker.advance_frame() {
//!         // TweenEvent::Completed(id)
//!     }
//! }
//! ```

pub mod action;
pub mod command;
pub mod easing;
pub mod error;
pub mod geometry;
pub mod property;
pub mod step;
pub mod target;
pub mod ticker;
pub mod timeline;
pub mod tween;
pub mod value;

// 重导出核心类型
pub use action::{Action, ActionContext, ActionFn, MAX_ACTION_PARAMS};
pub use command::{Command, GuideCommand, GuidePath};
pub use easing::{Ease, EasingFunction};
pub use error::{TweenError, TweenResult};
pub use geometry::{QuadBezier, Vec2};
pub use property::{
    OrientMode, PathProperty, Property, RotationProperty, SetContext, StateEntry, StateProperty,
    StepProperty, ValueKind, ValueProperty,
};
pub use step::{Step, StepSummary};
pub use target::{
    Animatable, PlayMode, PropertyFactory, START_POSITION, Setter, SetterTable, SimpleTarget,
    TargetRef,
};
pub use ticker::Ticker;
pub use timeline::Timeline;
pub use tween::{Tween, TweenEvent, TweenId, TweenOptions, TweenProxy, UpdateMode};
pub use value::{PropertyMap, PropertyValue};
