//! ### English
//! Fixed-function blit backend: drives a dedicated 2D copy/scale/rotate
//! unit instead of the GPU. One descriptor per slot is precomputed at
//! construction; each frame is a configure + single stretch blit + page
//! flip.
//!
//! ### 中文
//! 固定功能 blit 后端：驱动专用的 2D 拷贝/缩放/旋转单元而非 GPU。
//! 构造时为每个槽位预先算好一个描述符；每帧执行一次 configure、一次
//! stretch blit、一次翻页。

use crate::config::SessionConfig;
use crate::error::PresentError;
use crate::geometry::{Rect, Rotation, aspect_correct_geometry};
use crate::platform::{Blit2dDescriptor, HardwareBlitUnit};
use crate::slots::{BufferDescriptor, FrameSlot, SLOT_COUNT};

use super::BlitEngine;

/// ### English
/// Decomposes a display rotation into the unit's (axis swap, horizontal
/// flip, vertical flip) controls.
///
/// ### 中文
/// 将显示旋转分解为该单元的（轴交换、水平翻转、垂直翻转）控制位。
fn rotation_flips(rotation: Rotation) -> (bool, bool, bool) {
    match rotation {
        Rotation::Deg0 => (false, false, false),
        Rotation::Deg90 => (true, true, false),
        Rotation::Deg180 => (false, true, true),
        Rotation::Deg270 => (true, false, true),
    }
}

/// ### English
/// The 2D-hardware presentation backend. Holds one precomputed descriptor
/// per slot and the aspect-correct destination rectangle; the source
/// rectangle is always the full plane.
///
/// ### 中文
/// 2D 硬件呈现后端。持有每槽位一个预计算的描述符以及等比的目标矩形；
/// 源矩形始终为整个 plane。
pub struct HardwareBlitter {
    unit: Box<dyn HardwareBlitUnit>,
    descriptors: [Blit2dDescriptor; SLOT_COUNT],
    source: Rect,
    dest: Rect,
}

impl HardwareBlitter {
    /// ### English
    /// Precomputes the per-slot descriptors and blit rectangles. Infallible
    /// beyond the type signature today; the `Result` keeps construction
    /// symmetric with the GPU backend behind [`EngineFactory`].
    ///
    /// #### Parameters
    /// - `config`: Session configuration (viewport, rotation).
    /// - `slots`: The three source slot buffers.
    /// - `target`: The display (destination) buffer.
    /// - `unit`: The embedder's 2D blit unit.
    ///
    /// ### 中文
    /// 预计算每槽位描述符与 blit 矩形。目前除类型签名外不会失败；保留
    /// `Result` 是为了与 [`EngineFactory`] 之后的 GPU 后端构造保持对称。
    ///
    /// #### 参数
    /// - `config`：会话配置（viewport、旋转）。
    /// - `slots`：三个源槽位缓冲区。
    /// - `target`：显示（目标）缓冲区。
    /// - `unit`：宿主的 2D blit 单元。
    ///
    /// [`EngineFactory`]: super::EngineFactory
    pub fn new(
        config: &SessionConfig,
        slots: &[FrameSlot; SLOT_COUNT],
        target: BufferDescriptor,
        unit: Box<dyn HardwareBlitUnit>,
    ) -> Result<Self, PresentError> {
        let plane = slots[0].buffer.size;
        let geometry = aspect_correct_geometry(config.viewport, plane, config.rotation);
        let (axis_swap, flip_horizontal, flip_vertical) = rotation_flips(config.rotation);

        let descriptors = slots.each_ref().map(|slot| Blit2dDescriptor {
            target,
            source: slot.buffer,
            axis_swap,
            flip_horizontal,
            flip_vertical,
        });

        let source = Rect {
            x: 0,
            y: 0,
            width: plane.width as i32,
            height: plane.height as i32,
        };

        Ok(Self {
            unit,
            descriptors,
            source,
            dest: geometry.dest,
        })
    }
}

impl BlitEngine for HardwareBlitter {
    fn blit(&mut self, slot: usize) -> Result<(), PresentError> {
        self.unit.configure(&self.descriptors[slot])?;
        self.unit.stretch_blit(self.source, self.dest)
    }

    fn present(&mut self) -> Result<(), PresentError> {
        self.unit.commit()
    }
}
