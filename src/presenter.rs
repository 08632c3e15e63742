//! ### English
//! Presentation coordinator: the loop owned by the presenter thread.
//!
//! Each iteration is one pass of a fixed cycle: wait for a producer
//! signal, rotate the slot roles, wait on the frame's completion fence,
//! blit, present. Frame-level failures (fence timeout, hardware control
//! errors) skip the frame and keep the loop alive; only a stop request
//! or a vanished producer ends it.
//!
//! ### 中文
//! 呈现协调器：presenter 线程持有的循环。
//!
//! 每次迭代走一遍固定周期：等待生产者信号、轮换槽位角色、等待该帧的
//! 完成 fence、blit、呈现。帧级失败（fence 超时、硬件控制错误）跳过
//! 该帧并保持循环存活；只有停止请求或生产者消失才会结束循环。

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::blit::{BlitEngine, EngineFactory};
use crate::error::PresentError;
use crate::handoff::{PresenterHandoff, Signal, SwapMessage};
use crate::platform::{DisplayTiming, FenceToken, FenceWaitStatus, SharedFenceDevice};
use crate::slots::SharedSlots;

/// ### English
/// State owned by the presenter thread for the lifetime of a session.
///
/// ### 中文
/// presenter 线程在会话生命周期内持有的状态。
pub(crate) struct Coordinator {
    pub slots: Arc<SharedSlots>,
    pub handoff: PresenterHandoff,
    pub fences: SharedFenceDevice,
    pub timing: Box<dyn DisplayTiming>,
    /// ### English
    /// Swap interval requested by the producer side; re-read every frame.
    ///
    /// ### 中文
    /// 生产者侧请求的 swap interval；每帧重新读取。
    pub swap_interval: Arc<AtomicU32>,
    pub fence_wait: Option<Duration>,
}

impl Coordinator {
    /// ### English
    /// Thread entry point. Builds the blit engine *on this thread* via
    /// `factory`, reports readiness through `ready`, then runs the
    /// presentation loop until shutdown. On exit the ring is closed so a
    /// producer blocked in a handoff wakes with an error instead of
    /// hanging.
    ///
    /// #### Parameters
    /// - `factory`: Deferred engine constructor.
    /// - `ready`: Startup rendezvous; receives the construction outcome.
    ///
    /// ### 中文
    /// 线程入口。通过 `factory` 在*本线程*上构建 blit 引擎，经 `ready`
    /// 上报就绪，然后运行呈现循环直到关停。退出时关闭槽位环，使阻塞在
    /// 交接中的生产者以错误唤醒而不是永久挂起。
    ///
    /// #### 参数
    /// - `factory`：延迟的引擎构造器。
    /// - `ready`：启动会合点；接收构造结果。
    pub fn run(
        mut self,
        factory: EngineFactory,
        ready: crossbeam_channel::Sender<Result<(), PresentError>>,
    ) {
        let mut engine = match factory() {
            Ok(engine) => {
                let _ = ready.send(Ok(()));
                engine
            }
            Err(err) => {
                let _ = ready.send(Err(err));
                self.slots.close();
                return;
            }
        };

        let mut applied_interval = None;
        loop {
            match self.handoff.wait() {
                Signal::Frame(message) => {
                    self.present_frame(engine.as_mut(), message, &mut applied_interval);
                }
                Signal::Shutdown(orphan) => {
                    /*
                    ### English
                    Every signalled fence is destroyed exactly once, even
                    for frames that will never be displayed.

                    ### 中文
                    每个已通知的 fence 恰好被销毁一次，即使其对应的帧
                    永远不会被显示。
                    */
                    if let Some(message) = orphan {
                        self.dispose_fence(message.fence);
                    }
                    self.handoff.drain(|message| self.dispose_fence(message.fence));
                    break;
                }
            }
        }

        self.slots.close();
        log::debug!("presenter loop stopped");
    }

    /// ### English
    /// One full cycle for a signalled frame. Returns after presenting, or
    /// early when the frame is skipped; either way the role rotation has
    /// happened and the producer throttle advances.
    ///
    /// ### 中文
    /// 对一帧信号执行一个完整周期。呈现后返回；跳帧时提前返回。无论
    /// 哪种情况，角色轮换都已发生，生产者节流随之推进。
    fn present_frame(
        &mut self,
        engine: &mut dyn BlitEngine,
        message: SwapMessage,
        applied_interval: &mut Option<u32>,
    ) {
        let page = self.slots.rotate_for_display();
        debug_assert_eq!(page, message.slot, "handoff and ring disagree");

        // a null token means the producer submitted nothing to wait for
        if !message.fence.is_null() {
            let status = self.fences.client_wait(message.fence, self.fence_wait);
            self.fences.destroy(message.fence);
            match status {
                FenceWaitStatus::Signaled => {}
                FenceWaitStatus::TimedOut => {
                    log::warn!("frame {}: fence wait timed out, skipping", message.seq);
                    return;
                }
                FenceWaitStatus::Failed(reason) => {
                    log::error!("frame {}: fence wait failed ({reason}), skipping", message.seq);
                    return;
                }
            }
        }

        if let Err(err) = engine.blit(page) {
            log::warn!("frame {}: blit failed ({err}), skipping", message.seq);
            return;
        }

        let interval = self.swap_interval.load(Ordering::Relaxed);
        if *applied_interval != Some(interval) {
            match self.timing.set_swap_interval(interval) {
                Ok(()) => *applied_interval = Some(interval),
                Err(err) => log::warn!("swap interval {interval} rejected: {err}"),
            }
        }
        if interval != 0 {
            if let Err(err) = self.timing.wait_vsync() {
                log::warn!("frame {}: vsync wait failed ({err})", message.seq);
            }
        }

        if let Err(err) = engine.present() {
            log::warn!("frame {}: present failed ({err})", message.seq);
        }
    }

    /// ### English
    /// Destroys a discarded frame's fence; null tokens carry no sync
    /// object and are passed over.
    ///
    /// ### 中文
    /// 销毁被丢弃帧的 fence；空句柄不携带 sync 对象，直接略过。
    fn dispose_fence(&self, fence: FenceToken) {
        if !fence.is_null() {
            self.fences.destroy(fence);
        }
    }
}
