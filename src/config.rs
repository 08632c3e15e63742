//! ### English
//! Session configuration: viewport, rotation, scaling policy, swap
//! interval, fence-wait bound.
//!
//! The only process state consulted is two environment variables, read
//! once at session initialization; there is no persisted file state.
//!
//! ### 中文
//! 会话配置：viewport、旋转、缩放策略、swap interval、fence 等待上限。
//!
//! 唯一读取的进程状态是两个环境变量，且仅在会话初始化时读取一次；
//! 不存在持久化文件状态。

use std::time::Duration;

use dpi::PhysicalSize;

use crate::error::PresentError;
use crate::geometry::Rotation;

/// ### English
/// Environment variable selecting the scaling policy
/// (`nearest` | `linear` | `sharp`).
///
/// ### 中文
/// 选择缩放策略的环境变量（`nearest` | `linear` | `sharp`）。
pub const ENV_SCALER: &str = "TRIBUF_PRESENT_SCALER";

/// ### English
/// Environment variable selecting the display rotation in degrees
/// (`0` | `90` | `180` | `270`).
///
/// ### 中文
/// 选择显示旋转角度的环境变量（`0` | `90` | `180` | `270`）。
pub const ENV_ROTATION: &str = "TRIBUF_PRESENT_ROTATION";

/// ### English
/// Scaling policy for the GPU backend, fixed at initialization.
/// `Nearest` and `Linear` use the standard fragment stage with the
/// matching texture filter; `SharpBilinear` uses the sharp-bilinear stage
/// (which requires linear filtering to keep the texel fetch count down).
///
/// ### 中文
/// GPU 后端的缩放策略，初始化时固定。`Nearest` 与 `Linear` 使用标准
/// 片元阶段与对应的纹理过滤；`SharpBilinear` 使用 sharp-bilinear 阶段
///（需要线性过滤以减少纹素采样次数）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScalingPolicy {
    #[default]
    Nearest,
    Linear,
    SharpBilinear,
}

impl ScalingPolicy {
    pub(crate) fn parse(value: &str) -> Result<Self, PresentError> {
        match value {
            "nearest" => Ok(Self::Nearest),
            "linear" => Ok(Self::Linear),
            "sharp" => Ok(Self::SharpBilinear),
            other => Err(PresentError::Configuration {
                name: ENV_SCALER,
                value: other.to_owned(),
            }),
        }
    }
}

/// ### English
/// Immutable per-session configuration. Created via [`SessionConfig::new`]
/// and optionally overridden from the environment via
/// [`SessionConfig::from_env`].
///
/// ### 中文
/// 会话级不可变配置。通过 [`SessionConfig::new`] 创建，可经
/// [`SessionConfig::from_env`] 以环境变量覆盖。
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// ### English
    /// Output size of the physical display, in pixels.
    ///
    /// ### 中文
    /// 物理显示器的输出尺寸（像素）。
    pub viewport: PhysicalSize<u32>,
    /// ### English
    /// Display rotation applied by the blit backends.
    ///
    /// ### 中文
    /// 由 blit 后端施加的显示旋转。
    pub rotation: Rotation,
    /// ### English
    /// Scaling policy for the GPU backend.
    ///
    /// ### 中文
    /// GPU 后端的缩放策略。
    pub scaling: ScalingPolicy,
    /// ### English
    /// Initial swap interval in vsync periods; 0 disables the vsync wait.
    ///
    /// ### 中文
    /// 初始 swap interval（以 vsync 周期计）；0 表示不等待 vsync。
    pub swap_interval: u32,
    /// ### English
    /// Bound for the per-frame fence wait; `None` waits forever.
    ///
    /// ### 中文
    /// 每帧 fence 等待的上限；`None` 表示无限等待。
    pub fence_wait: Option<Duration>,
}

impl SessionConfig {
    /// ### English
    /// Default fence-wait bound: generous against real GPU load, short
    /// enough that a wedged submission only costs one frame slot.
    ///
    /// ### 中文
    /// 默认 fence 等待上限：对真实 GPU 负载足够宽裕，又足够短，
    /// 使卡死的提交只损失一个帧槽位。
    pub const DEFAULT_FENCE_WAIT: Duration = Duration::from_millis(500);

    /// ### English
    /// Creates a configuration with defaults: no rotation, nearest
    /// scaling, swap interval 1, bounded fence wait.
    ///
    /// #### Parameters
    /// - `viewport`: Physical display output size.
    ///
    /// ### 中文
    /// 以默认值创建配置：无旋转、nearest 缩放、swap interval 为 1、
    /// 有界 fence 等待。
    ///
    /// #### 参数
    /// - `viewport`：物理显示器输出尺寸。
    pub fn new(viewport: PhysicalSize<u32>) -> Self {
        Self {
            viewport,
            rotation: Rotation::Deg0,
            scaling: ScalingPolicy::Nearest,
            swap_interval: 1,
            fence_wait: Some(Self::DEFAULT_FENCE_WAIT),
        }
    }

    /// ### English
    /// Applies the two documented environment overrides. Unset variables
    /// keep the current values; set-but-invalid values are configuration
    /// errors rejected here, before any session starts.
    ///
    /// ### 中文
    /// 应用两个已定义的环境变量覆盖。未设置的变量保持当前值；
    /// 已设置但非法的值在此处（任何会话启动之前）即被拒绝。
    pub fn from_env(viewport: PhysicalSize<u32>) -> Result<Self, PresentError> {
        let mut config = Self::new(viewport);
        if let Ok(value) = std::env::var(ENV_SCALER) {
            config.scaling = ScalingPolicy::parse(&value)?;
        }
        if let Ok(value) = std::env::var(ENV_ROTATION) {
            let degrees = value
                .trim()
                .parse::<i32>()
                .map_err(|_| PresentError::Configuration {
                    name: ENV_ROTATION,
                    value: value.clone(),
                })?;
            config.rotation = Rotation::from_degrees(degrees)?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scaling_policy_values() {
        assert_eq!(ScalingPolicy::parse("nearest").unwrap(), ScalingPolicy::Nearest);
        assert_eq!(ScalingPolicy::parse("linear").unwrap(), ScalingPolicy::Linear);
        assert_eq!(
            ScalingPolicy::parse("sharp").unwrap(),
            ScalingPolicy::SharpBilinear
        );
        assert!(matches!(
            ScalingPolicy::parse("cubic"),
            Err(PresentError::Configuration { name, .. }) if name == ENV_SCALER
        ));
    }

    #[test]
    fn defaults_are_complete() {
        let config = SessionConfig::new(PhysicalSize::new(640, 480));
        assert_eq!(config.rotation, Rotation::Deg0);
        assert_eq!(config.scaling, ScalingPolicy::Nearest);
        assert_eq!(config.swap_interval, 1);
        assert_eq!(config.fence_wait, Some(SessionConfig::DEFAULT_FENCE_WAIT));
    }
}
