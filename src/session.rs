//! ### English
//! The presentation session: public producer-side API over the pipeline.
//!
//! [`PresentSession::start`] spawns the presenter thread and waits for
//! its blit engine to come up; [`PresentSession::swap`] hands one
//! finished frame over and rebinds the producer to the next render
//! target; dropping the session (or calling
//! [`PresentSession::shutdown`]) stops and joins the presenter.
//!
//! ### 中文
//! 呈现会话：管线面向生产者侧的公共 API。
//!
//! [`PresentSession::start`] 启动 presenter 线程并等待其 blit 引擎
//! 就绪；[`PresentSession::swap`] 交接一帧已完成的画面并把生产者重新
//! 绑定到下一个渲染目标；drop 会话（或调用
//! [`PresentSession::shutdown`]）会停止并 join presenter。

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;

use crate::blit::EngineFactory;
use crate::config::SessionConfig;
use crate::error::PresentError;
use crate::handoff::{self, ProducerHandoff, SwapMessage};
use crate::platform::{DisplayTiming, RenderTargetBinder, SharedFenceDevice};
use crate::presenter::Coordinator;
use crate::slots::{SharedSlots, SlotRole};

/// ### English
/// A running triple-buffered presentation session. Owned by the producer
/// thread; the presenter thread lives inside.
///
/// ### 中文
/// 运行中的三缓冲呈现会话。由生产者线程持有；presenter 线程在其内部。
pub struct PresentSession {
    slots: Arc<SharedSlots>,
    producer: ProducerHandoff,
    fences: SharedFenceDevice,
    binder: Box<dyn RenderTargetBinder>,
    swap_interval: Arc<AtomicU32>,
    presenter: Option<thread::JoinHandle<()>>,
    seq: u64,
}

impl PresentSession {
    /// ### English
    /// Starts a session: spawns the presenter thread, constructs the blit
    /// engine on it, and binds the producer to the initial render target
    /// (slot 1). Fails if the engine cannot be constructed; the thread is
    /// joined before the error is returned.
    ///
    /// #### Parameters
    /// - `config`: Immutable session configuration.
    /// - `fences`: Fence device shared with the presenter.
    /// - `binder`: Producer-side render-target binding.
    /// - `timing`: Display timing device (vsync, swap interval).
    /// - `engine`: Deferred blit-engine constructor, run on the presenter
    ///   thread.
    ///
    /// ### 中文
    /// 启动会话：生成 presenter 线程、在其上构造 blit 引擎，并把生产者
    /// 绑定到初始渲染目标（槽位 1）。引擎构造失败则整体失败；返回错误
    /// 之前会先 join 该线程。
    ///
    /// #### 参数
    /// - `config`：不可变会话配置。
    /// - `fences`：与 presenter 共享的 fence 设备。
    /// - `binder`：生产者侧的渲染目标绑定。
    /// - `timing`：显示时序设备（vsync、swap interval）。
    /// - `engine`：延迟的 blit 引擎构造器，在 presenter 线程上运行。
    pub fn start(
        config: SessionConfig,
        fences: SharedFenceDevice,
        mut binder: Box<dyn RenderTargetBinder>,
        timing: Box<dyn DisplayTiming>,
        engine: EngineFactory,
    ) -> Result<Self, PresentError> {
        let slots = Arc::new(SharedSlots::new());
        let (producer, presenter_handoff) = handoff::channel();
        let swap_interval = Arc::new(AtomicU32::new(config.swap_interval));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let coordinator = Coordinator {
            slots: Arc::clone(&slots),
            handoff: presenter_handoff,
            fences: Arc::clone(&fences),
            timing,
            swap_interval: Arc::clone(&swap_interval),
            fence_wait: config.fence_wait,
        };
        let presenter = thread::Builder::new()
            .name("tribuf-present".into())
            .spawn(move || coordinator.run(engine, ready_tx))
            .map_err(|err| PresentError::Initialization(err.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = presenter.join();
                return Err(err);
            }
            // presenter died before reporting
            Err(_) => {
                let _ = presenter.join();
                return Err(PresentError::Disconnected);
            }
        }

        binder.bind_render_target(slots.slot_for(SlotRole::RenderTarget))?;
        log::info!(
            "presentation session started ({}x{}, {:?}, {:?})",
            config.viewport.width,
            config.viewport.height,
            config.rotation,
            config.scaling,
        );

        Ok(Self {
            slots,
            producer,
            fences,
            binder,
            swap_interval,
            presenter: Some(presenter),
            seq: 0,
        })
    }

    /// ### English
    /// Hands the just-rendered frame to the presenter and rebinds the
    /// producer to the next render target, whose slot index is returned.
    /// Creates a completion fence for the submitted work first; blocks
    /// while the previous handoff is still unconsumed (triple-buffer
    /// backpressure).
    ///
    /// ### 中文
    /// 将刚渲染完的帧交给 presenter，并把生产者重新绑定到下一个渲染
    /// 目标，返回其槽位索引。先为已提交的工作创建完成 fence；若上一次
    /// 交接尚未被消费则阻塞（三缓冲背压）。
    pub fn swap(&mut self) -> Result<usize, PresentError> {
        let fence = self.fences.create()?;

        let handoff = match self.slots.begin_handoff() {
            Ok(handoff) => handoff,
            Err(err) => {
                self.fences.destroy(fence);
                return Err(err);
            }
        };

        let message = SwapMessage {
            slot: handoff.ready,
            fence,
            seq: self.seq,
        };
        if let Err(err) = self.producer.signal_frame(message) {
            self.fences.destroy(fence);
            return Err(err);
        }
        self.seq += 1;

        self.binder.bind_render_target(handoff.render)?;
        Ok(handoff.render)
    }

    /// ### English
    /// Slot index currently holding `role`.
    ///
    /// ### 中文
    /// 当前持有 `role` 的槽位索引。
    pub fn slot_for(&self, role: SlotRole) -> usize {
        self.slots.slot_for(role)
    }

    /// ### English
    /// Role currently assigned to slot `index`.
    ///
    /// ### 中文
    /// 槽位 `index` 当前被分配的角色。
    pub fn role_of(&self, index: usize) -> SlotRole {
        self.slots.role_of(index)
    }

    /// ### English
    /// Requests the swap interval for subsequent frames. Applied by the
    /// presenter on its next frame; 0 disables the vsync wait.
    ///
    /// ### 中文
    /// 为后续帧请求 swap interval。由 presenter 在下一帧应用；
    /// 0 表示不等待 vsync。
    pub fn set_swap_interval(&self, interval: u32) {
        self.swap_interval.store(interval, Ordering::Relaxed);
    }

    /// ### English
    /// Stops the presenter and joins its thread. Idempotent; called
    /// implicitly on drop. Frames signalled but not yet displayed are
    /// discarded (their fences are destroyed, never leaked).
    ///
    /// ### 中文
    /// 停止 presenter 并 join 其线程。幂等；drop 时隐式调用。已通知但
    /// 尚未显示的帧被丢弃（其 fence 被销毁，不会泄漏）。
    pub fn shutdown(&mut self) {
        if let Some(presenter) = self.presenter.take() {
            self.producer.signal_shutdown();
            if presenter.join().is_err() {
                log::error!("presenter thread panicked during shutdown");
            }
        }
    }
}

impl Drop for PresentSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
