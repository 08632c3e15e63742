//! ### English
//! GPU blit backend: a two-stage GLES2-class shader program drawing one
//! textured quad per frame.
//!
//! The vertex stage applies the display rotation as one of four fixed
//! coordinate remaps; the fragment stage is either a plain sample or the
//! sharp-bilinear filter (ported from TheMaister's
//! sharp-bilinear-simple), which clamps the sampling offset to a
//! scale-adjusted half-texel margin around each texel center.
//!
//! ### 中文
//! GPU blit 后端：GLES2 级别的两阶段着色器程序，每帧绘制一个带纹理
//! 的四边形。
//!
//! 顶点阶段以四个固定坐标重映射之一施加显示旋转；片元阶段要么直接
//! 采样，要么使用 sharp-bilinear 滤波（移植自 TheMaister 的
//! sharp-bilinear-simple）：将采样偏移钳制在每个纹素中心周围、按缩放
//! 因子调整的半纹素边界内。

use std::sync::Arc;

use glow::HasContext as _;

use crate::config::{ScalingPolicy, SessionConfig};
use crate::error::PresentError;
use crate::geometry::{Rotation, aspect_correct_geometry, ortho_projection};
use crate::platform::BlitContext;
use crate::slots::{FrameSlot, SLOT_COUNT};

use super::BlitEngine;

const BLIT_FRAG_STANDARD: &str = "#version 100
precision mediump float;
varying vec2 vTexCoord;
uniform sampler2D uFBOTex;
void main() {
    gl_FragColor = texture2D(uFBOTex, vTexCoord);
}
";

// Ported from TheMaister's sharp-bilinear-simple.slang
const BLIT_FRAG_SHARP: &str = "#version 100
precision mediump float;
varying vec2 vTexCoord;
uniform sampler2D uFBOTex;
uniform vec2 uTexSize;
uniform vec2 uScale;
void main() {
    vec2 texel_floored = floor(vTexCoord);
    vec2 s = fract(vTexCoord);
    vec2 region_range = 0.5 - 0.5 / uScale;
    vec2 center_dist = s - 0.5;
    vec2 f = (center_dist - clamp(center_dist, -region_range, region_range)) * uScale + 0.5;
    vec2 mod_texel = texel_floored + f;
    gl_FragColor = texture2D(uFBOTex, mod_texel / uTexSize);
}
";

/// ### English
/// Vertex-stage rotation remap, one per quarter turn. Negated components
/// resolve through REPEAT wrapping (`-v` samples as `1 - v`).
///
/// ### 中文
/// 顶点阶段的旋转重映射，每个四分之一圈一条。取负的分量经 REPEAT
/// 环绕解析（`-v` 等价于采样 `1 - v`）。
fn rotation_remap(rotation: Rotation) -> &'static str {
    match rotation {
        Rotation::Deg0 => "vTexCoord = aTexCoord;",
        Rotation::Deg90 => "vTexCoord = vec2(aTexCoord.y, -aTexCoord.x);",
        Rotation::Deg180 => "vTexCoord = vec2(-aTexCoord.x, -aTexCoord.y);",
        Rotation::Deg270 => "vTexCoord = vec2(-aTexCoord.y, aTexCoord.x);",
    }
}

/// ### English
/// Builds the vertex stage for a (rotation, policy) pair. The standard
/// path normalizes UVs here; sharp-bilinear keeps texel-space coordinates
/// for the fragment stage.
///
/// ### 中文
/// 为 (rotation, policy) 组合构建顶点阶段。标准路径在此归一化 UV；
/// sharp-bilinear 则为片元阶段保留纹素空间坐标。
fn vertex_shader_source(rotation: Rotation, policy: ScalingPolicy) -> String {
    let remap = rotation_remap(rotation);
    let scaler = if policy == ScalingPolicy::SharpBilinear {
        ""
    } else {
        "vTexCoord = vTexCoord / uTexSize;"
    };
    format!(
        "#version 100
varying vec2 vTexCoord;
attribute vec2 aVertCoord;
attribute vec2 aTexCoord;
uniform mat4 uProj;
uniform vec2 uTexSize;
void main() {{
    {remap}
    {scaler}
    gl_Position = uProj * vec4(aVertCoord, 0.0, 1.0);
}}
"
    )
}

fn fragment_shader_source(policy: ScalingPolicy) -> &'static str {
    match policy {
        ScalingPolicy::SharpBilinear => BLIT_FRAG_SHARP,
        ScalingPolicy::Nearest | ScalingPolicy::Linear => BLIT_FRAG_STANDARD,
    }
}

/// ### English
/// Texture filter chosen once from the scaling policy; sharp-bilinear
/// requires linear filtering to keep the texel fetch count down.
///
/// ### 中文
/// 依缩放策略一次性选定的纹理过滤；sharp-bilinear 需要线性过滤以减少
/// 纹素采样次数。
fn texture_filter(policy: ScalingPolicy) -> i32 {
    match policy {
        ScalingPolicy::Nearest => glow::NEAREST as i32,
        ScalingPolicy::Linear | ScalingPolicy::SharpBilinear => glow::LINEAR as i32,
    }
}

/// ### English
/// The GPU presentation backend. All GL objects are created in
/// [`GpuBlitter::new`] on the presenter thread and deleted on drop.
///
/// ### 中文
/// GPU 呈现后端。所有 GL 对象都在 presenter 线程上由
/// [`GpuBlitter::new`] 创建，并在 drop 时删除。
pub struct GpuBlitter {
    ctx: Box<dyn BlitContext>,
    gl: Arc<glow::Context>,
    program: glow::NativeProgram,
    vao: glow::NativeVertexArray,
    vbo: glow::NativeBuffer,
    /// ### English
    /// One texture per slot, attached to the slot's shared buffer.
    ///
    /// ### 中文
    /// 每槽位一个纹理，已挂接到该槽位的共享缓冲区。
    textures: [glow::NativeTexture; SLOT_COUNT],
}

impl GpuBlitter {
    /// ### English
    /// Compiles and links the blit program, uploads the aspect-correct
    /// quad, and attaches one texture per slot buffer. Must run on the
    /// presenter thread. A failed link (or missing binding) aborts the
    /// session before the coordinator loop starts.
    ///
    /// #### Parameters
    /// - `config`: Session configuration (viewport, rotation, scaling).
    /// - `slots`: The three slot buffers to attach.
    /// - `ctx`: Blitter surface/context created by the embedder.
    ///
    /// ### 中文
    /// 编译并链接 blit 程序，上传等比四边形，并为每个槽位缓冲区挂接
    /// 一个纹理。必须在 presenter 线程运行。链接失败（或缺失绑定）会
    /// 在协调器循环启动前中止会话。
    ///
    /// #### 参数
    /// - `config`：会话配置（viewport、旋转、缩放）。
    /// - `slots`：要挂接的三个槽位缓冲区。
    /// - `ctx`：宿主创建的 blitter surface/context。
    pub fn new(
        config: &SessionConfig,
        slots: &[FrameSlot; SLOT_COUNT],
        ctx: Box<dyn BlitContext>,
    ) -> Result<Self, PresentError> {
        ctx.make_current()?;
        let gl = ctx.gl();

        let plane = slots[0].buffer.size;
        let geometry = aspect_correct_geometry(config.viewport, plane, config.rotation);
        let projection = ortho_projection(
            0.0,
            config.viewport.width as f32,
            0.0,
            config.viewport.height as f32,
        );

        let program = link_program(
            &gl,
            &vertex_shader_source(config.rotation, config.scaling),
            fragment_shader_source(config.scaling),
        )?;

        let (vao, vbo, textures);
        unsafe {
            gl.use_program(Some(program));

            let loc_vert = gl
                .get_attrib_location(program, "aVertCoord")
                .ok_or_else(|| missing_binding("aVertCoord"))?;
            let loc_tex = gl
                .get_attrib_location(program, "aTexCoord")
                .ok_or_else(|| missing_binding("aTexCoord"))?;
            let loc_fbo_tex = gl.get_uniform_location(program, "uFBOTex");
            let loc_proj = gl.get_uniform_location(program, "uProj");
            let loc_tex_size = gl.get_uniform_location(program, "uTexSize");
            let loc_scale = gl.get_uniform_location(program, "uScale");

            gl.uniform_1_i32(loc_fbo_tex.as_ref(), 0);
            gl.viewport(
                0,
                0,
                config.viewport.width as i32,
                config.viewport.height as i32,
            );
            gl.uniform_matrix_4_f32_slice(loc_proj.as_ref(), false, &projection);
            gl.uniform_2_f32(loc_scale.as_ref(), geometry.scale[0], geometry.scale[1]);
            /*
            ### English
            Always the unrotated plane size: the remap algebra divides
            sampled coordinates by the texture's own extents.

            ### 中文
            始终为未旋转的 plane 尺寸：重映射代数要求采样坐标除以纹理
            自身的尺寸。
            */
            gl.uniform_2_f32(
                loc_tex_size.as_ref(),
                plane.width as f32,
                plane.height as f32,
            );

            vbo = gl.create_buffer().map_err(PresentError::Initialization)?;
            vao = gl
                .create_vertex_array()
                .map_err(PresentError::Initialization)?;
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.enable_vertex_attrib_array(loc_vert);
            gl.enable_vertex_attrib_array(loc_tex);
            gl.vertex_attrib_pointer_f32(loc_vert, 2, glow::FLOAT, false, 16, 0);
            gl.vertex_attrib_pointer_f32(loc_tex, 2, glow::FLOAT, false, 16, 8);
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&geometry.vertices),
                glow::STATIC_DRAW,
            );

            let filter = texture_filter(config.scaling);
            let mut created = Vec::with_capacity(SLOT_COUNT);
            for slot in slots.iter() {
                let id = gl.create_texture().map_err(PresentError::Initialization)?;
                gl.active_texture(glow::TEXTURE0);
                gl.bind_texture(glow::TEXTURE_2D, Some(id));
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
                ctx.attach_buffer(&slot.buffer)?;
                created.push(id);
            }
            textures = [created[0], created[1], created[2]];
        }

        Ok(Self {
            ctx,
            gl,
            program,
            vao,
            vbo,
            textures,
        })
    }
}

impl BlitEngine for GpuBlitter {
    fn blit(&mut self, slot: usize) -> Result<(), PresentError> {
        let gl = &self.gl;
        unsafe {
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            gl.bind_vertex_array(Some(self.vao));
            gl.bind_texture(glow::TEXTURE_2D, Some(self.textures[slot]));
            gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);
        }
        Ok(())
    }

    fn present(&mut self) -> Result<(), PresentError> {
        self.ctx.swap_buffers()
    }
}

impl Drop for GpuBlitter {
    /// ### English
    /// Deletes all GL objects on the presenter thread.
    ///
    /// ### 中文
    /// 在 presenter 线程上删除全部 GL 对象。
    fn drop(&mut self) {
        if self.ctx.make_current().is_err() {
            return;
        }
        let gl = &self.gl;
        unsafe {
            for texture in self.textures {
                gl.delete_texture(texture);
            }
            gl.delete_buffer(self.vbo);
            gl.delete_vertex_array(self.vao);
            gl.delete_program(self.program);
        }
    }
}

fn missing_binding(name: &str) -> PresentError {
    PresentError::Initialization(format!("blit program is missing the {name} attribute"))
}

/// ### English
/// Compiles both stages and links the program. Info logs are reported at
/// debug level even on success; driver warnings often show up there.
///
/// ### 中文
/// 编译两个阶段并链接程序。即使成功，info log 也会以 debug 级别输出；
/// 驱动警告常出现在其中。
fn link_program(
    gl: &glow::Context,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<glow::NativeProgram, PresentError> {
    unsafe {
        let vert = compile_shader(gl, glow::VERTEX_SHADER, vertex_source, "vertex")?;
        let frag = compile_shader(gl, glow::FRAGMENT_SHADER, fragment_source, "fragment")?;

        let program = gl.create_program().map_err(PresentError::Initialization)?;
        gl.attach_shader(program, vert);
        gl.attach_shader(program, frag);
        gl.link_program(program);
        gl.delete_shader(vert);
        gl.delete_shader(frag);

        let info = gl.get_program_info_log(program);
        if !info.is_empty() {
            log::debug!("blit program info: {info}");
        }
        if !gl.get_program_link_status(program) {
            gl.delete_program(program);
            return Err(PresentError::Initialization(format!(
                "blit program failed to link: {info}"
            )));
        }
        Ok(program)
    }
}

unsafe fn compile_shader(
    gl: &glow::Context,
    kind: u32,
    source: &str,
    stage: &str,
) -> Result<glow::NativeShader, PresentError> {
    unsafe {
        let shader = gl.create_shader(kind).map_err(PresentError::Initialization)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        let info = gl.get_shader_info_log(shader);
        if !info.is_empty() {
            log::debug!("blit {stage} shader info: {info}");
        }
        if !gl.get_shader_compile_status(shader) {
            gl.delete_shader(shader);
            return Err(PresentError::Initialization(format!(
                "blit {stage} shader failed to compile: {info}"
            )));
        }
        Ok(shader)
    }
}
