//! ### English
//! Error taxonomy for the presentation pipeline.
//!
//! Initialization failures abort a session before the presenter loop starts;
//! everything the presenter hits mid-loop degrades by skipping the frame.
//!
//! ### 中文
//! 呈现管线的错误分类。
//!
//! 初始化失败会在 presenter 循环启动前中止会话；presenter 循环中遇到的错误
//! 一律以跳帧方式降级处理。

use thiserror::Error;

/// ### English
/// Errors reported by the presentation pipeline.
///
/// ### 中文
/// 呈现管线上报的错误。
#[derive(Debug, Error)]
pub enum PresentError {
    /// ### English
    /// Context, surface, shader program, or engine creation failed.
    /// The session must not start its presenter loop after this.
    ///
    /// ### 中文
    /// 上下文、surface、着色器程序或引擎创建失败。
    /// 出现此错误后会话不得启动 presenter 循环。
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// ### English
    /// A bounded completion-fence wait expired. Recoverable: the current
    /// frame is skipped and the loop continues.
    ///
    /// ### 中文
    /// 有界的完成 fence 等待超时。可恢复：跳过当前帧并继续循环。
    #[error("completion fence wait timed out")]
    FenceTimeout,

    /// ### English
    /// A control request to the fixed-function 2D blit unit failed.
    /// Recoverable by policy: logged, the current frame is skipped.
    ///
    /// ### 中文
    /// 对固定功能 2D blit 单元的控制请求失败。
    /// 按策略可恢复：记录日志并跳过当前帧。
    #[error("2d blit unit control request failed: {0}")]
    HardwareControl(String),

    /// ### English
    /// A rotation value outside {0°, 90°, 180°, 270°} was supplied.
    /// Rejected at initialization, never reached in the render path.
    ///
    /// ### 中文
    /// 提供了 {0°, 90°, 180°, 270°} 之外的旋转值。
    /// 在初始化阶段即被拒绝，渲染路径不会遇到。
    #[error("unsupported rotation: {0} degrees")]
    UnsupportedRotation(i32),

    /// ### English
    /// A process-configuration value could not be parsed.
    ///
    /// ### 中文
    /// 无法解析的进程配置值。
    #[error("invalid configuration value for {name}: {value:?}")]
    Configuration {
        /// ### English
        /// Configuration key (environment variable name).
        ///
        /// ### 中文
        /// 配置键（环境变量名）。
        name: &'static str,
        /// ### English
        /// Rejected value as read from the environment.
        ///
        /// ### 中文
        /// 从环境读取到的被拒绝的值。
        value: String,
    },

    /// ### English
    /// The presenter thread has stopped (or was never started); producer
    /// calls can no longer be serviced.
    ///
    /// ### 中文
    /// presenter 线程已停止（或从未启动）；无法再处理生产者调用。
    #[error("presentation pipeline is shut down")]
    Disconnected,
}
