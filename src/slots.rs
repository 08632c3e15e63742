//! ### English
//! Buffer Slot Manager: the fixed ring of three frame slots and their role
//! assignment, shared between the producer and the presenter behind one
//! lock.
//!
//! ### 中文
//! 缓冲槽位管理器：固定的三帧槽位环及其角色分配，由生产者与 presenter
//! 通过同一把锁共享。

use dpi::PhysicalSize;
use parking_lot::{Condvar, Mutex};

use crate::error::PresentError;

/// ### English
/// Fixed slot count of the presentation ring (always 3).
///
/// ### 中文
/// 呈现环的固定槽位数量（始终为 3）。
pub const SLOT_COUNT: usize = 3;

/// ### English
/// Pixel format of a platform buffer.
///
/// ### 中文
/// 平台缓冲区的像素格式。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Argb8888,
    Xrgb8888,
}

impl PixelFormat {
    /// ### English
    /// DRM-style fourcc code for this format.
    ///
    /// ### 中文
    /// 该格式对应的 DRM 风格 fourcc 码。
    pub fn fourcc(self) -> u32 {
        match self {
            Self::Argb8888 => fourcc(b"AR24"),
            Self::Xrgb8888 => fourcc(b"XR24"),
        }
    }
}

fn fourcc(code: &[u8; 4]) -> u32 {
    (code[0] as u32)
        | ((code[1] as u32) << 8)
        | ((code[2] as u32) << 16)
        | ((code[3] as u32) << 24)
}

/// ### English
/// Descriptor of one platform-allocated pixel buffer. The pipeline never
/// allocates or frees these; the platform allocator owns the memory.
///
/// ### 中文
/// 单个平台分配像素缓冲区的描述符。管线从不分配或释放它们；
/// 内存由平台分配器持有。
#[derive(Clone, Copy, Debug)]
pub struct BufferDescriptor {
    /// ### English
    /// Buffer size in pixels.
    ///
    /// ### 中文
    /// 缓冲区尺寸（像素）。
    pub size: PhysicalSize<u32>,
    /// ### English
    /// Row stride in bytes.
    ///
    /// ### 中文
    /// 行距（字节）。
    pub stride: u32,
    /// ### English
    /// Pixel format of the buffer.
    ///
    /// ### 中文
    /// 缓冲区像素格式。
    pub format: PixelFormat,
    /// ### English
    /// Shared-memory handle (dma-buf style file descriptor).
    ///
    /// ### 中文
    /// 共享内存句柄（dma-buf 风格的文件描述符）。
    pub share_fd: i32,
}

/// ### English
/// One slot of the presentation ring.
///
/// ### 中文
/// 呈现环中的单个槽位。
#[derive(Clone, Copy, Debug)]
pub struct FrameSlot {
    /// ### English
    /// Ring index, 0..2.
    ///
    /// ### 中文
    /// 环索引，0..2。
    pub index: usize,
    /// ### English
    /// Platform buffer backing this slot.
    ///
    /// ### 中文
    /// 支撑该槽位的平台缓冲区。
    pub buffer: BufferDescriptor,
}

/// ### English
/// Current assignment of a slot. Exactly one slot holds each role.
///
/// ### 中文
/// 槽位的当前角色分配。每个角色恰好由一个槽位持有。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotRole {
    /// ### English
    /// The producer renders into this slot.
    ///
    /// ### 中文
    /// 生产者正在向该槽位渲染。
    RenderTarget,
    /// ### English
    /// This slot is (about to be) composited onto the display.
    ///
    /// ### 中文
    /// 该槽位正在（或即将）被合成到显示器。
    Displaying,
    /// ### English
    /// Neither rendering nor displaying; next in line to render.
    ///
    /// ### 中文
    /// 既不在渲染也不在显示；下一个成为渲染目标。
    Spare,
}

/// ### English
/// Slot pair returned by a producer handoff: `ready` holds the frame that
/// was just finished (to be signalled for display), `render` is the next
/// render target.
///
/// ### 中文
/// 生产者交接返回的槽位对：`ready` 为刚完成的帧（将被通知用于显示），
/// `render` 为下一个渲染目标。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandoffSlots {
    pub ready: usize,
    pub render: usize,
}

/// ### English
/// Role indices of the ring: `current` is displaying, `flip` is the render
/// target, `new` is the spare. `handoffs`/`rotations` implement the
/// producer throttle: at most one handoff may be unconsumed.
///
/// ### 中文
/// 环的角色索引：`current` 在显示，`flip` 为渲染目标，`new` 为备用。
/// `handoffs`/`rotations` 实现生产者节流：最多允许一次未被消费的交接。
#[derive(Debug)]
struct SlotRing {
    current: usize,
    flip: usize,
    new: usize,
    handoffs: u64,
    rotations: u64,
    closed: bool,
}

impl SlotRing {
    fn role_of(&self, index: usize) -> SlotRole {
        debug_assert!(index < SLOT_COUNT);
        if index == self.current {
            SlotRole::Displaying
        } else if index == self.flip {
            SlotRole::RenderTarget
        } else {
            SlotRole::Spare
        }
    }

    fn slot_for(&self, role: SlotRole) -> usize {
        match role {
            SlotRole::Displaying => self.current,
            SlotRole::RenderTarget => self.flip,
            SlotRole::Spare => self.new,
        }
    }
}

/// ### English
/// The shared role state, jointly owned by producer and presenter behind a
/// single mutex (plus the throttle condition).
///
/// ### 中文
/// 共享角色状态，由生产者与 presenter 经由单一互斥锁（加节流条件变量）
/// 共同持有。
pub struct SharedSlots {
    ring: Mutex<SlotRing>,
    rotated: Condvar,
}

impl SharedSlots {
    /// ### English
    /// Creates the ring in its initial assignment: slot 0 displaying,
    /// slot 1 render target, slot 2 spare.
    ///
    /// ### 中文
    /// 以初始分配创建环：槽位 0 显示、槽位 1 渲染目标、槽位 2 备用。
    pub fn new() -> Self {
        Self {
            ring: Mutex::new(SlotRing {
                current: 0,
                flip: 1,
                new: 2,
                handoffs: 0,
                rotations: 0,
                closed: false,
            }),
            rotated: Condvar::new(),
        }
    }

    /// ### English
    /// Producer side of the swap: blocks while the previous handoff has
    /// not been consumed by the presenter (true triple-buffer
    /// backpressure), then swaps the flip/new indices and records the
    /// handoff.
    ///
    /// Returns the slot that is now ready to display and the slot that
    /// becomes the next render target.
    ///
    /// ### 中文
    /// 交换的生产者侧：若上一次交接尚未被 presenter 消费则阻塞
    ///（真正的三缓冲背压），随后交换 flip/new 索引并记录本次交接。
    ///
    /// 返回现在可供显示的槽位，以及成为下一个渲染目标的槽位。
    pub fn begin_handoff(&self) -> Result<HandoffSlots, PresentError> {
        let mut ring = self.ring.lock();
        while ring.handoffs > ring.rotations {
            if ring.closed {
                return Err(PresentError::Disconnected);
            }
            self.rotated.wait(&mut ring);
        }
        if ring.closed {
            return Err(PresentError::Disconnected);
        }

        let page = ring.new;
        ring.new = ring.flip;
        ring.flip = page;
        ring.handoffs += 1;
        Ok(HandoffSlots {
            ready: ring.new,
            render: ring.flip,
        })
    }

    /// ### English
    /// Presenter side of the swap: atomically swaps the current/new
    /// indices and returns the page id selected for display. Both sides
    /// observe this rotation as the single source of truth for what is
    /// now displaying.
    ///
    /// ### 中文
    /// 交换的 presenter 侧：原子地交换 current/new 索引并返回被选中
    /// 用于显示的页号。双方都以此次轮换作为「当前显示内容」的唯一依据。
    pub fn rotate_for_display(&self) -> usize {
        let mut ring = self.ring.lock();
        let page = ring.current;
        ring.current = ring.new;
        ring.new = page;
        ring.rotations += 1;
        self.rotated.notify_one();
        ring.current
    }

    /// ### English
    /// Marks the ring closed and wakes any producer blocked in
    /// [`SharedSlots::begin_handoff`]. Called by the presenter on its way
    /// out.
    ///
    /// ### 中文
    /// 标记环已关闭并唤醒阻塞在 [`SharedSlots::begin_handoff`] 中的
    /// 生产者。由 presenter 退出时调用。
    pub fn close(&self) {
        let mut ring = self.ring.lock();
        ring.closed = true;
        self.rotated.notify_all();
    }

    /// ### English
    /// Returns the slot index currently holding `role`.
    ///
    /// ### 中文
    /// 返回当前持有 `role` 的槽位索引。
    pub fn slot_for(&self, role: SlotRole) -> usize {
        self.ring.lock().slot_for(role)
    }

    /// ### English
    /// Returns the role currently assigned to slot `index`.
    ///
    /// ### 中文
    /// 返回槽位 `index` 当前被分配的角色。
    pub fn role_of(&self, index: usize) -> SlotRole {
        self.ring.lock().role_of(index)
    }
}

impl Default for SharedSlots {
    fn default() -> Self {
        Self::new()
    }
}
