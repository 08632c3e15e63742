//! ### English
//! Rotation and aspect-correct scaling math shared by both blit backends.
//!
//! Pure functions: an orthographic projection for the destination viewport
//! and the letterboxed destination rectangle / scale factor for a
//! (viewport, plane, rotation) triple.
//!
//! ### 中文
//! 两个 blit 后端共享的旋转与等比缩放数学。
//!
//! 均为纯函数：目标 viewport 的正交投影矩阵，以及给定
//! (viewport, plane, rotation) 三元组的 letterbox 目标矩形与缩放因子。

use dpi::PhysicalSize;

use crate::error::PresentError;

/// ### English
/// Physical display rotation, one of four fixed quarter turns.
///
/// ### 中文
/// 物理显示旋转，四个固定的四分之一圈之一。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// ### English
    /// Parses a rotation from degrees. Any value outside
    /// {0, 90, 180, 270} is a configuration error.
    ///
    /// #### Parameters
    /// - `degrees`: Rotation in degrees as configured for the display.
    ///
    /// ### 中文
    /// 从角度解析旋转。{0, 90, 180, 270} 之外的值均为配置错误。
    ///
    /// #### 参数
    /// - `degrees`：显示器配置的旋转角度。
    pub fn from_degrees(degrees: i32) -> Result<Self, PresentError> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(PresentError::UnsupportedRotation(other)),
        }
    }

    /// ### English
    /// Whether the rotation swaps the display axes (90° or 270°).
    ///
    /// ### 中文
    /// 该旋转是否交换显示轴（90° 或 270°）。
    pub fn is_sideways(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// ### English
/// Integer rectangle in destination (display) pixel coordinates.
///
/// ### 中文
/// 目标（显示）像素坐标系下的整数矩形。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// ### English
/// Blit placement computed once at engine initialization: interleaved
/// vertex data (position + texel-space UV per vertex, triangle-strip
/// order), the per-axis scale factor, and the destination rectangle.
///
/// ### 中文
/// 引擎初始化时一次性计算的 blit 布局：交错顶点数据（每顶点位置 +
/// 纹素空间 UV，triangle-strip 顺序）、逐轴缩放因子与目标矩形。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlitGeometry {
    /// ### English
    /// Four vertices of `[x, y, u, v]`, UVs in full texel units.
    ///
    /// ### 中文
    /// 四个 `[x, y, u, v]` 顶点，UV 以完整纹素为单位。
    pub vertices: [[f32; 4]; 4],
    /// ### English
    /// Displayed size divided by source size, per axis.
    ///
    /// ### 中文
    /// 逐轴的「显示尺寸 / 源尺寸」比值。
    pub scale: [f32; 2],
    /// ### English
    /// Letterboxed destination rectangle inside the viewport.
    ///
    /// ### 中文
    /// viewport 内经 letterbox 处理的目标矩形。
    pub dest: Rect,
}

/// ### English
/// Builds a column-major orthographic projection mapping
/// `[left, right] x [bottom, top]` onto clip space.
///
/// ### 中文
/// 构建列主序正交投影矩阵，将 `[left, right] x [bottom, top]`
/// 映射到裁剪空间。
pub fn ortho_projection(left: f32, right: f32, bottom: f32, top: f32) -> [f32; 16] {
    let mut m = [0.0f32; 16];
    m[0] = 2.0 / (right - left);
    m[5] = 2.0 / (top - bottom);
    m[10] = -1.0;
    m[12] = -(right + left) / (right - left);
    m[13] = -(top + bottom) / (top - bottom);
    m[15] = 1.0;
    m
}

/// ### English
/// Computes the aspect-correct, centered destination for blitting a source
/// plane onto a viewport under a display rotation.
///
/// If the viewport is wider than the (rotation-adjusted) plane, the plane
/// is scaled to viewport height and centered horizontally; otherwise it is
/// scaled to viewport width and centered vertically. Sizes and shifts are
/// truncated to whole pixels.
///
/// #### Parameters
/// - `viewport`: Output size in display pixels.
/// - `plane`: Source buffer size in pixels (unrotated).
/// - `rotation`: Display rotation; sideways rotations swap the plane axes
///   before fitting.
///
/// ### 中文
/// 计算在给定显示旋转下，将源 plane blit 到 viewport 的等比居中目标。
///
/// 若 viewport 比（按旋转调整后的）plane 更宽，则按 viewport 高度缩放并
/// 水平居中；否则按 viewport 宽度缩放并垂直居中。尺寸与偏移截断到整像素。
///
/// #### 参数
/// - `viewport`：显示像素下的输出尺寸。
/// - `plane`：源缓冲区尺寸（未旋转）。
/// - `rotation`：显示旋转；横置旋转会先交换 plane 的两轴再做适配。
pub fn aspect_correct_geometry(
    viewport: PhysicalSize<u32>,
    plane: PhysicalSize<u32>,
    rotation: Rotation,
) -> BlitGeometry {
    let viewport = [viewport.width as f32, viewport.height as f32];
    let mut plane = [plane.width as f32, plane.height as f32];

    /*
    ### English
    When sideways, the plane occupies the display transposed.

    ### 中文
    横置时，plane 以转置后的方向占据显示器。
    */
    if rotation.is_sideways() {
        plane.swap(0, 1);
    }

    let aspect_plane = plane[0] / plane[1];
    let aspect_viewport = viewport[0] / viewport[1];

    let (ratio_x, ratio_y, shift_x, shift_y);
    if aspect_viewport > aspect_plane {
        // viewport wider than plane
        ratio_x = plane[0] * (viewport[1] / plane[1]);
        ratio_y = viewport[1];
        shift_x = ((viewport[0] - ratio_x) / 2.0) as i32;
        shift_y = 0;
    } else {
        // plane wider than viewport
        ratio_x = viewport[0];
        ratio_y = plane[1] * (viewport[0] / plane[0]);
        shift_x = 0;
        shift_y = ((viewport[1] - ratio_y) / 2.0) as i32;
    }

    let dest = Rect {
        x: shift_x,
        y: shift_y,
        width: ratio_x as i32,
        height: ratio_y as i32,
    };

    /*
    ### English
    UVs carry full texel counts, not normalized coordinates; the vertex
    stage (or the sharp-bilinear fragment stage) divides by the texture
    size.

    ### 中文
    UV 采用完整纹素数而非归一化坐标；由顶点阶段（或 sharp-bilinear
    片元阶段）再除以纹理尺寸。
    */
    let x0 = shift_x as f32;
    let y0 = shift_y as f32;
    let x1 = ratio_x as i32 as f32 + shift_x as f32;
    let y1 = ratio_y as i32 as f32 + shift_y as f32;
    let vertices = [
        [x0, y0, 0.0, 0.0],
        [x0, y1, 0.0, plane[1]],
        [x1, y0, plane[0], 0.0],
        [x1, y1, plane[0], plane[1]],
    ];

    BlitGeometry {
        vertices,
        scale: [ratio_x / plane[0], ratio_y / plane[1]],
        dest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROTATIONS: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    fn size(w: u32, h: u32) -> PhysicalSize<u32> {
        PhysicalSize::new(w, h)
    }

    #[test]
    fn rejects_unsupported_rotation_degrees() {
        assert!(Rotation::from_degrees(90).is_ok());
        assert!(matches!(
            Rotation::from_degrees(45),
            Err(PresentError::UnsupportedRotation(45))
        ));
        assert!(matches!(
            Rotation::from_degrees(-90),
            Err(PresentError::UnsupportedRotation(-90))
        ));
    }

    #[test]
    fn ortho_maps_viewport_corners_to_clip_corners() {
        let m = ortho_projection(0.0, 1920.0, 0.0, 1080.0);
        // column-major: clip.x = m[0] * x + m[12], clip.y = m[5] * y + m[13]
        let clip = |x: f32, y: f32| (m[0] * x + m[12], m[5] * y + m[13]);
        assert_eq!(clip(0.0, 0.0), (-1.0, -1.0));
        assert_eq!(clip(1920.0, 1080.0), (1.0, 1.0));
        assert_eq!(clip(960.0, 540.0), (0.0, 0.0));
    }

    #[test]
    fn wide_viewport_height_fills_and_centers_horizontally() {
        // 1920x1080 viewport, 640x480 plane, 0 degrees
        let g = aspect_correct_geometry(size(1920, 1080), size(640, 480), Rotation::Deg0);
        assert_eq!(
            g.dest,
            Rect {
                x: 240,
                y: 0,
                width: 1440,
                height: 1080
            }
        );
        assert_eq!(g.scale, [1440.0 / 640.0, 1080.0 / 480.0]);
        assert_eq!(g.scale, [2.25, 2.25]);
    }

    #[test]
    fn tall_viewport_width_fills_and_centers_vertically() {
        let g = aspect_correct_geometry(size(480, 854), size(320, 240), Rotation::Deg0);
        assert_eq!(g.dest.x, 0);
        assert_eq!(g.dest.width, 480);
        assert_eq!(g.dest.height, 360);
        assert_eq!(g.dest.y, (854 - 360) / 2);
    }

    #[test]
    fn sideways_rotation_fits_the_transposed_plane() {
        let g = aspect_correct_geometry(size(480, 320), size(480, 320), Rotation::Deg90);
        // transposed plane is 320x480; fit to 480x320 -> height-filled
        assert_eq!(g.dest.height, 320);
        assert_eq!(g.dest.width, 320 * 320 / 480);
        // UVs cover the transposed plane extents
        assert_eq!(g.vertices[3][2], 320.0);
        assert_eq!(g.vertices[3][3], 480.0);
    }

    #[test]
    fn dest_fits_viewport_and_preserves_aspect_for_all_rotations() {
        let viewports = [size(1920, 1080), size(640, 480), size(480, 854), size(800, 800)];
        let planes = [size(640, 480), size(1920, 1080), size(256, 224), size(320, 480)];
        for viewport in viewports {
            for plane in planes {
                for rotation in ROTATIONS {
                    let g = aspect_correct_geometry(viewport, plane, rotation);
                    let d = g.dest;
                    assert!(d.x >= 0 && d.y >= 0, "{viewport:?} {plane:?} {rotation:?}");
                    assert!(d.x + d.width <= viewport.width as i32);
                    assert!(d.y + d.height <= viewport.height as i32);

                    let (pw, ph) = if rotation.is_sideways() {
                        (plane.height as f64, plane.width as f64)
                    } else {
                        (plane.width as f64, plane.height as f64)
                    };
                    // truncation moves each edge by at most one pixel
                    let expected_w = pw / ph * d.height as f64;
                    let expected_h = ph / pw * d.width as f64;
                    let ok_w = (d.width as f64 - expected_w).abs() <= 1.5;
                    let ok_h = (d.height as f64 - expected_h).abs() <= 1.5;
                    assert!(
                        ok_w || ok_h,
                        "aspect drift: {viewport:?} {plane:?} {rotation:?} -> {d:?}"
                    );

                    // centered on the padded axis
                    let slack_x = viewport.width as i32 - d.width;
                    let slack_y = viewport.height as i32 - d.height;
                    assert!((2 * d.x - slack_x).abs() <= 1);
                    assert!((2 * d.y - slack_y).abs() <= 1);
                }
            }
        }
    }

    #[test]
    fn scale_matches_dest_over_source() {
        let g = aspect_correct_geometry(size(1280, 720), size(320, 240), Rotation::Deg180);
        assert!((g.scale[0] - g.dest.width as f32 / 320.0).abs() < 1e-3);
        assert!((g.scale[1] - g.dest.height as f32 / 240.0).abs() < 1e-3);
    }
}
