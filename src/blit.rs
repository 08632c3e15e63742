//! ### English
//! Blit engines: composite a source slot onto the display target with
//! aspect-correct, rotation-aware scaling.
//!
//! Two interchangeable backends, selected at configuration time behind one
//! trait: a GPU shader blit ([`gpu::GpuBlitter`]) and a fixed-function 2D
//! hardware blitter ([`hardware::HardwareBlitter`]).
//!
//! ### 中文
//! blit 引擎：以等比且感知旋转的缩放，把源槽位合成到显示目标上。
//!
//! 两个可互换的后端在配置期选择，共用一个 trait：GPU 着色器 blit
//!（[`gpu::GpuBlitter`]）与固定功能 2D 硬件 blitter
//!（[`hardware::HardwareBlitter`]）。

pub mod gpu;
pub mod hardware;

use crate::error::PresentError;

pub use gpu::GpuBlitter;
pub use hardware::HardwareBlitter;

/// ### English
/// A presentation backend. Construction carries the `Init` semantics
/// (fallible, aborts the session on error); teardown happens on drop, on
/// the presenter thread.
///
/// ### 中文
/// 呈现后端。构造即承担 `Init` 语义（可失败，出错则中止会话）；
/// 销毁在 drop 时于 presenter 线程进行。
pub trait BlitEngine {
    /// ### English
    /// Composites slot `slot` onto the display target. Stateless per
    /// call: blitting the same slot twice without an intervening role
    /// rotation produces identical output.
    ///
    /// ### 中文
    /// 将槽位 `slot` 合成到显示目标。每次调用无状态：在没有角色轮换
    /// 的情况下对同一槽位 blit 两次，输出完全一致。
    fn blit(&mut self, slot: usize) -> Result<(), PresentError>;

    /// ### English
    /// Submits/flips the composited output to the display.
    ///
    /// ### 中文
    /// 将合成输出提交/翻页到显示器。
    fn present(&mut self) -> Result<(), PresentError>;
}

/// ### English
/// Deferred engine constructor, run on the presenter thread. GL contexts
/// and objects must be created on the thread that uses them.
///
/// ### 中文
/// 延迟的引擎构造器，在 presenter 线程上运行。GL 上下文与对象必须在
/// 使用它们的线程上创建。
pub type EngineFactory = Box<dyn FnOnce() -> Result<Box<dyn BlitEngine>, PresentError> + Send>;
