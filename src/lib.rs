//! ### English
//! `tribuf_present` — a triple-buffered frame presentation pipeline.
//!
//! A producer thread renders into one of three platform-allocated slots
//! and hands finished frames (slot + GPU completion fence) to a dedicated
//! presenter thread, which rotates the slot roles, waits for the fence,
//! composites the slot onto the display with aspect-correct,
//! rotation-aware scaling, and presents. Two interchangeable blit
//! backends are provided: a GPU shader blit and a fixed-function 2D
//! hardware blitter.
//!
//! The crate owns synchronization and policy only; buffer allocation,
//! graphics bootstrap, and display control stay with the embedder behind
//! the traits in [`platform`].
//!
//! ### 中文
//! `tribuf_present` —— 三缓冲帧呈现管线。
//!
//! 生产者线程向三个平台分配槽位之一渲染，并把完成的帧（槽位 + GPU
//! 完成 fence）交给专职的 presenter 线程；后者轮换槽位角色、等待
//! fence、以等比且感知旋转的缩放把槽位合成到显示器上并呈现。提供两个
//! 可互换的 blit 后端：GPU 着色器 blit 与固定功能 2D 硬件 blitter。
//!
//! 本 crate 只拥有同步与策略；缓冲区分配、图形引导与显示控制由宿主
//! 通过 [`platform`] 中的 trait 承担。

pub mod blit;
pub mod config;
pub mod error;
pub mod geometry;
mod handoff;
pub mod platform;
mod presenter;
pub mod session;
pub mod slots;

pub use blit::{BlitEngine, EngineFactory, GpuBlitter, HardwareBlitter};
pub use config::{ScalingPolicy, SessionConfig};
pub use error::PresentError;
pub use geometry::{BlitGeometry, Rect, Rotation};
pub use handoff::SwapMessage;
pub use platform::{
    Blit2dDescriptor, BlitContext, DisplayTiming, FenceDevice, FenceToken, FenceWaitStatus,
    HardwareBlitUnit, RenderTargetBinder, SharedFenceDevice,
};
pub use session::PresentSession;
pub use slots::{BufferDescriptor, FrameSlot, PixelFormat, SLOT_COUNT, SlotRole};
