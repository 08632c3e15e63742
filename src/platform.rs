//! ### English
//! Collaborator seams consumed by the pipeline. The pipeline never
//! allocates buffers, bootstraps graphics libraries, or talks to the
//! display timing hardware itself; embedders implement these traits over
//! their platform stack (EGL, fbdev ioctls, a 2D blit unit, ...).
//!
//! ### 中文
//! 管线消费的协作者接口。管线自身从不分配缓冲区、不引导图形库、
//! 也不直接操作显示时序硬件；宿主基于其平台栈（EGL、fbdev ioctl、
//! 2D blit 单元等）实现这些 trait。

use std::sync::Arc;
use std::time::Duration;

use crate::error::PresentError;
use crate::geometry::Rect;
use crate::slots::BufferDescriptor;

/// ### English
/// Opaque GPU completion-fence handle (a native sync object cast to
/// `u64`, 0 = no fence). Produced once per submitted frame by the
/// producer, waited on exactly once and then destroyed by the
/// coordinator. A device may hand out a null token when the frame has
/// nothing to synchronize on; the coordinator then neither waits nor
/// destroys.
///
/// ### 中文
/// 不透明的 GPU 完成 fence 句柄（原生 sync 对象转为 `u64`，0 表示
/// 无 fence）。由生产者对每个提交的帧创建一次，由协调器等待恰好一次
/// 后销毁。当帧没有需要同步的工作时，设备可以交出空句柄；此时协调器
/// 既不等待也不销毁。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FenceToken(pub u64);

impl FenceToken {
    /// ### English
    /// Whether the token refers to no fence at all.
    ///
    /// ### 中文
    /// 该句柄是否不指向任何 fence。
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// ### English
/// Outcome of a completion-fence wait.
///
/// ### 中文
/// 完成 fence 等待的结果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FenceWaitStatus {
    /// ### English
    /// The submitted GPU work completed.
    ///
    /// ### 中文
    /// 提交的 GPU 工作已完成。
    Signaled,
    /// ### English
    /// The bounded wait expired before completion.
    ///
    /// ### 中文
    /// 有界等待在完成前到期。
    TimedOut,
    /// ### English
    /// The wait itself failed.
    ///
    /// ### 中文
    /// 等待本身失败。
    Failed(String),
}

/// ### English
/// Fence creation/wait/destruction, shared by both threads (create on the
/// producer, wait + destroy on the presenter). An EGL implementation maps
/// this onto `eglCreateSyncKHR` / `eglClientWaitSyncKHR` /
/// `eglDestroySyncKHR`.
///
/// ### 中文
/// fence 的创建/等待/销毁，被两个线程共享（生产者创建，presenter 等待并
/// 销毁）。EGL 实现可映射到 `eglCreateSyncKHR` / `eglClientWaitSyncKHR` /
/// `eglDestroySyncKHR`。
pub trait FenceDevice: Send + Sync {
    /// ### English
    /// Creates a fence for the GPU work submitted so far on the calling
    /// (producer) context.
    ///
    /// ### 中文
    /// 为调用方（生产者）上下文中迄今提交的 GPU 工作创建 fence。
    fn create(&self) -> Result<FenceToken, PresentError>;

    /// ### English
    /// Blocks until the fence signals, flushing pending commands first.
    /// `timeout = None` waits forever where the backend supports it.
    ///
    /// #### Parameters
    /// - `fence`: Token to wait on; consumed by exactly one wait.
    /// - `timeout`: Optional wait bound.
    ///
    /// ### 中文
    /// 阻塞直到 fence 被触发（先冲刷未决命令）。`timeout = None` 且后端
    /// 支持时表示无限等待。
    ///
    /// #### 参数
    /// - `fence`：要等待的句柄；恰好被一次等待消费。
    /// - `timeout`：可选的等待上限。
    fn client_wait(&self, fence: FenceToken, timeout: Option<Duration>) -> FenceWaitStatus;

    /// ### English
    /// Destroys a fence. Safe to call after a timed-out wait.
    ///
    /// ### 中文
    /// 销毁 fence。在等待超时后调用也是安全的。
    fn destroy(&self, fence: FenceToken);
}

/// ### English
/// Shared fence-device handle used across both threads.
///
/// ### 中文
/// 跨两个线程共享的 fence 设备句柄。
pub type SharedFenceDevice = Arc<dyn FenceDevice>;

/// ### English
/// Graphics context of the presenter thread, as created by the embedder's
/// context provider. Always constructed *on* the presenter thread (the
/// blit engine factory runs there); the pipeline only requests current
/// binding, buffer attachment, presentation, and implicit teardown on
/// drop.
///
/// ### 中文
/// presenter 线程的图形上下文，由宿主的上下文提供者创建。总是在
/// presenter 线程上构造（blit 引擎工厂在该线程运行）；管线只请求
/// current 绑定、缓冲区挂接、呈现，以及 drop 时的隐式销毁。
pub trait BlitContext {
    /// ### English
    /// Makes the blitter surface/context pair current on this thread.
    ///
    /// ### 中文
    /// 使 blitter 的 surface/context 在当前线程变为 current。
    fn make_current(&self) -> Result<(), PresentError>;

    /// ### English
    /// Returns the glow GL API for this context (cheap `Arc` clone).
    ///
    /// ### 中文
    /// 返回该上下文的 glow GL API（`Arc` 的低成本 clone）。
    fn gl(&self) -> Arc<glow::Context>;

    /// ### English
    /// Attaches a shared platform buffer to the texture currently bound to
    /// `TEXTURE_2D` (the `eglCreateImageKHR` +
    /// `glEGLImageTargetTexture2DOES` seam).
    ///
    /// ### 中文
    /// 将共享平台缓冲区挂接到当前绑定在 `TEXTURE_2D` 上的纹理
    ///（即 `eglCreateImageKHR` + `glEGLImageTargetTexture2DOES` 接缝）。
    fn attach_buffer(&self, buffer: &BufferDescriptor) -> Result<(), PresentError>;

    /// ### English
    /// Submits the composited output to the display (`eglSwapBuffers`).
    ///
    /// ### 中文
    /// 将合成输出提交到显示器（`eglSwapBuffers`）。
    fn swap_buffers(&self) -> Result<(), PresentError>;
}

/// ### English
/// Display timing device: vsync wait and swap-interval programming.
/// Invoked only when the swap interval is nonzero (or changes).
///
/// ### 中文
/// 显示时序设备：vsync 等待与 swap interval 设置。
/// 仅在 swap interval 非零（或发生变化）时被调用。
pub trait DisplayTiming: Send {
    /// ### English
    /// Programs the number of vsync periods between presented frames.
    ///
    /// ### 中文
    /// 设置相邻呈现帧之间的 vsync 周期数。
    fn set_swap_interval(&mut self, interval: u32) -> Result<(), PresentError>;

    /// ### English
    /// Blocks until the next vertical sync.
    ///
    /// ### 中文
    /// 阻塞到下一次垂直同步。
    fn wait_vsync(&mut self) -> Result<(), PresentError>;
}

/// ### English
/// Descriptor programmed into the fixed-function 2D copy/scale/rotate
/// unit before a stretch blit: destination target and orientation, source
/// buffer identity.
///
/// ### 中文
/// 在 stretch blit 之前写入固定功能 2D 拷贝/缩放/旋转单元的描述符：
/// 目标缓冲与朝向、源缓冲身份。
#[derive(Clone, Copy, Debug)]
pub struct Blit2dDescriptor {
    /// ### English
    /// Destination (display) buffer.
    ///
    /// ### 中文
    /// 目标（显示）缓冲区。
    pub target: BufferDescriptor,
    /// ### English
    /// Source slot buffer.
    ///
    /// ### 中文
    /// 源槽位缓冲区。
    pub source: BufferDescriptor,
    /// ### English
    /// Swap the destination axes (part of the rotation decomposition).
    ///
    /// ### 中文
    /// 交换目标轴（旋转分解的一部分）。
    pub axis_swap: bool,
    /// ### English
    /// Mirror horizontally.
    ///
    /// ### 中文
    /// 水平镜像。
    pub flip_horizontal: bool,
    /// ### English
    /// Mirror vertically.
    ///
    /// ### 中文
    /// 垂直镜像。
    pub flip_vertical: bool,
}

/// ### English
/// The fixed-function 2D blit unit. Control-request failures surface as
/// [`PresentError::HardwareControl`] and are recoverable (the frame is
/// skipped).
///
/// ### 中文
/// 固定功能 2D blit 单元。控制请求失败以
/// [`PresentError::HardwareControl`] 上报，且可恢复（跳过该帧）。
pub trait HardwareBlitUnit {
    /// ### English
    /// Programs the unit with a blit descriptor.
    ///
    /// ### 中文
    /// 将 blit 描述符写入该单元。
    fn configure(&mut self, descriptor: &Blit2dDescriptor) -> Result<(), PresentError>;

    /// ### English
    /// Issues one stretch blit from `source` to `dest` pixels.
    ///
    /// ### 中文
    /// 发起一次从 `source` 到 `dest` 像素范围的 stretch blit。
    fn stretch_blit(&mut self, source: Rect, dest: Rect) -> Result<(), PresentError>;

    /// ### English
    /// Commits the blitted destination to the display (page flip).
    ///
    /// ### 中文
    /// 将已 blit 的目标提交到显示器（翻页）。
    fn commit(&mut self) -> Result<(), PresentError>;
}

/// ### English
/// Producer-side surface binding: makes the render context current on the
/// slot that will receive the next frame (typically `eglMakeCurrent` on
/// the slot's pixmap surface).
///
/// ### 中文
/// 生产者侧的 surface 绑定：使渲染上下文在将接收下一帧的槽位上变为
/// current（通常是对该槽位 pixmap surface 的 `eglMakeCurrent`）。
pub trait RenderTargetBinder: Send {
    /// ### English
    /// Binds the producer's rendering context to slot `slot`.
    ///
    /// ### 中文
    /// 将生产者的渲染上下文绑定到槽位 `slot`。
    fn bind_render_target(&mut self, slot: usize) -> Result<(), PresentError>;
}
