//! ### English
//! Swap Handoff Protocol: the producer-side rendezvous that hands a
//! finished frame (slot index + completion fence) to the presenter.
//!
//! Implemented as a bounded SPSC frame channel plus a separate shutdown
//! channel. Shutdown always wins over a simultaneously-pending frame, so
//! the presenter never starts work after stop was requested.
//!
//! ### 中文
//! 交换交接协议：生产者侧的会合点，把完成的帧（槽位索引 + 完成 fence）
//! 交给 presenter。
//!
//! 由一个有界 SPSC 帧通道加一个独立的关停通道实现。关停总是优先于
//! 同时挂起的帧，因此 presenter 不会在请求停止之后再开始新的工作。

use crossbeam_channel::{Receiver, Sender, bounded, select};

use crate::error::PresentError;
use crate::platform::FenceToken;

/// ### English
/// One signalled frame: which slot is ready to display and the fence that
/// guards its GPU completion.
///
/// ### 中文
/// 一帧信号：哪个槽位已可显示，以及守护其 GPU 完成的 fence。
#[derive(Clone, Copy, Debug)]
pub struct SwapMessage {
    /// ### English
    /// Slot index holding the finished frame.
    ///
    /// ### 中文
    /// 持有已完成帧的槽位索引。
    pub slot: usize,
    /// ### English
    /// Completion fence for the frame's render submission.
    ///
    /// ### 中文
    /// 该帧渲染提交的完成 fence。
    pub fence: FenceToken,
    /// ### English
    /// Monotonic frame sequence number (diagnostics only).
    ///
    /// ### 中文
    /// 单调递增的帧序号（仅用于诊断）。
    pub seq: u64,
}

/// ### English
/// What woke the presenter.
///
/// ### 中文
/// 唤醒 presenter 的事件。
#[derive(Debug)]
pub(crate) enum Signal {
    Frame(SwapMessage),
    /// ### English
    /// Stop requested. Carries a frame that arrived in the same wake, if
    /// any, so its fence can still be destroyed.
    ///
    /// ### 中文
    /// 请求停止。携带同一次唤醒中到达的帧（若有），以便仍能销毁其
    /// fence。
    Shutdown(Option<SwapMessage>),
}

/// ### English
/// Producer endpoint of the handoff.
///
/// ### 中文
/// 交接协议的生产者端。
pub(crate) struct ProducerHandoff {
    frames: Sender<SwapMessage>,
    shutdown: Sender<()>,
}

impl ProducerHandoff {
    /// ### English
    /// Signals one finished frame. Fire-and-forget beyond the channel
    /// bound; fails once the presenter is gone.
    ///
    /// ### 中文
    /// 通知一帧完成。除通道容量外不等待；presenter 不在后返回失败。
    pub fn signal_frame(&self, message: SwapMessage) -> Result<(), PresentError> {
        self.frames
            .send(message)
            .map_err(|_| PresentError::Disconnected)
    }

    /// ### English
    /// Raises the stop signal. Idempotent; ignores a dead presenter.
    ///
    /// ### 中文
    /// 发出停止信号。幂等；presenter 已退出时忽略。
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown.try_send(());
    }
}

/// ### English
/// Presenter endpoint of the handoff.
///
/// ### 中文
/// 交接协议的 presenter 端。
pub(crate) struct PresenterHandoff {
    frames: Receiver<SwapMessage>,
    shutdown: Receiver<()>,
}

impl PresenterHandoff {
    /// ### English
    /// Suspends until the producer signals a frame or shutdown. The stop
    /// signal is re-checked after every wake, before any frame is
    /// returned.
    ///
    /// ### 中文
    /// 挂起直到生产者发出帧或关停信号。每次唤醒后、返回任何帧之前都会
    /// 复查停止信号。
    pub fn wait(&self) -> Signal {
        if self.shutdown_pending() {
            return Signal::Shutdown(None);
        }

        select! {
            recv(self.shutdown) -> _ => Signal::Shutdown(None),
            recv(self.frames) -> message => match message {
                Ok(message) => {
                    /*
                    ### English
                    Stop may arrive together with a frame; it wins, and
                    the frame rides along for fence disposal.

                    ### 中文
                    停止信号可能与帧同时到达；停止优先，该帧随信号带回
                    以便销毁其 fence。
                    */
                    if self.shutdown_pending() {
                        Signal::Shutdown(Some(message))
                    } else {
                        Signal::Frame(message)
                    }
                }
                // producer endpoint dropped
                Err(_) => Signal::Shutdown(None),
            },
        }
    }

    /// ### English
    /// Non-blocking probe of the stop signal.
    ///
    /// ### 中文
    /// 非阻塞地探测停止信号。
    pub fn shutdown_pending(&self) -> bool {
        self.shutdown.try_recv().is_ok()
    }

    /// ### English
    /// Drains frames queued at shutdown, handing each to `dispose` (used
    /// to destroy their fences).
    ///
    /// ### 中文
    /// 清空关停时仍在队列中的帧，将每个交给 `dispose`（用于销毁其
    /// fence）。
    pub fn drain(&self, mut dispose: impl FnMut(SwapMessage)) {
        while let Ok(message) = self.frames.try_recv() {
            dispose(message);
        }
    }
}

/// ### English
/// Creates the connected endpoint pair. The frame channel holds one
/// message: combined with the slot-ring throttle this gives the producer
/// exactly one slot of slack before it must wait.
///
/// ### 中文
/// 创建互联的端点对。帧通道容量为一条消息：配合槽位环节流，生产者
/// 在必须等待之前恰好有一个槽位的余量。
pub(crate) fn channel() -> (ProducerHandoff, PresenterHandoff) {
    let (frames_tx, frames_rx) = bounded(1);
    let (shutdown_tx, shutdown_rx) = bounded(1);
    (
        ProducerHandoff {
            frames: frames_tx,
            shutdown: shutdown_tx,
        },
        PresenterHandoff {
            frames: frames_rx,
            shutdown: shutdown_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(slot: usize) -> SwapMessage {
        SwapMessage {
            slot,
            fence: FenceToken(0xf0 + slot as u64),
            seq: slot as u64,
        }
    }

    #[test]
    fn frames_arrive_in_order() {
        let (producer, presenter) = channel();
        producer.signal_frame(message(1)).unwrap();
        match presenter.wait() {
            Signal::Frame(m) => assert_eq!(m.slot, 1),
            other => panic!("expected frame, got {other:?}"),
        }
        producer.signal_frame(message(2)).unwrap();
        match presenter.wait() {
            Signal::Frame(m) => assert_eq!(m.slot, 2),
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn shutdown_wins_over_a_pending_frame() {
        let (producer, presenter) = channel();
        producer.signal_frame(message(1)).unwrap();
        producer.signal_shutdown();
        assert!(matches!(presenter.wait(), Signal::Shutdown(_)));
    }

    #[test]
    fn dropped_producer_reads_as_shutdown() {
        let (producer, presenter) = channel();
        drop(producer);
        assert!(matches!(presenter.wait(), Signal::Shutdown(None)));
    }

    #[test]
    fn no_fence_is_lost_at_shutdown() {
        let (producer, presenter) = channel();
        producer.signal_frame(message(2)).unwrap();
        producer.signal_shutdown();

        let mut dropped = Vec::new();
        if let Signal::Shutdown(Some(orphan)) = presenter.wait() {
            dropped.push(orphan.fence);
        }
        presenter.drain(|m| dropped.push(m.fence));
        assert_eq!(dropped, vec![FenceToken(0xf2)]);
    }
}
