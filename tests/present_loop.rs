//! ### English
//! End-to-end exercises of the presentation pipeline over mock
//! collaborators: ring-order display, fence-timeout skipping, fence
//! accounting across shutdown, and swap-interval programming.
//!
//! ### 中文
//! 通过 mock 协作者对呈现管线的端到端测试：按环序显示、fence 超时
//! 跳帧、跨关停的 fence 计数，以及 swap interval 设置。

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dpi::PhysicalSize;
use parking_lot::{Condvar, Mutex};

use tribuf_present::{
    BlitEngine, EngineFactory, FenceDevice, FenceToken, FenceWaitStatus, PresentError,
    PresentSession, RenderTargetBinder, SessionConfig,
};
use tribuf_present::platform::DisplayTiming;

struct MockFences {
    next: AtomicU64,
    live: Mutex<HashSet<u64>>,
    created: AtomicU64,
    destroyed: AtomicU64,
    // token values whose wait reports a timeout
    timeout_on: Mutex<HashSet<u64>>,
    // token values whose wait blocks until released
    gated: Mutex<HashSet<u64>>,
    gate: Condvar,
    // token values currently parked in client_wait
    waiting: Mutex<HashSet<u64>>,
}

impl MockFences {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            next: AtomicU64::new(1),
            live: Mutex::new(HashSet::new()),
            created: AtomicU64::new(0),
            destroyed: AtomicU64::new(0),
            timeout_on: Mutex::new(HashSet::new()),
            gated: Mutex::new(HashSet::new()),
            gate: Condvar::new(),
            waiting: Mutex::new(HashSet::new()),
        })
    }

    fn gate_token(&self, token: u64) {
        self.gated.lock().insert(token);
    }

    fn release_token(&self, token: u64) {
        self.gated.lock().remove(&token);
        self.gate.notify_all();
    }

    fn is_waiting_on(&self, token: u64) -> bool {
        self.waiting.lock().contains(&token)
    }

    fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    fn destroyed(&self) -> u64 {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl FenceDevice for MockFences {
    fn create(&self) -> Result<FenceToken, PresentError> {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        self.live.lock().insert(id);
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(FenceToken(id))
    }

    fn client_wait(&self, fence: FenceToken, _timeout: Option<Duration>) -> FenceWaitStatus {
        if self.timeout_on.lock().contains(&fence.0) {
            return FenceWaitStatus::TimedOut;
        }
        let mut gated = self.gated.lock();
        if gated.contains(&fence.0) {
            self.waiting.lock().insert(fence.0);
            while gated.contains(&fence.0) {
                self.gate.wait(&mut gated);
            }
            self.waiting.lock().remove(&fence.0);
        }
        FenceWaitStatus::Signaled
    }

    fn destroy(&self, fence: FenceToken) {
        if self.live.lock().remove(&fence.0) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        } else {
            panic!("fence {} destroyed twice or never created", fence.0);
        }
    }
}

// a device with no sync objects: every frame carries the null token, and
// any wait or destroy against it is a recorded violation
#[derive(Default)]
struct NullFences {
    violations: Mutex<Vec<String>>,
}

impl FenceDevice for NullFences {
    fn create(&self) -> Result<FenceToken, PresentError> {
        Ok(FenceToken(0))
    }

    fn client_wait(&self, fence: FenceToken, _timeout: Option<Duration>) -> FenceWaitStatus {
        self.violations
            .lock()
            .push(format!("waited on null fence {}", fence.0));
        FenceWaitStatus::Signaled
    }

    fn destroy(&self, fence: FenceToken) {
        self.violations
            .lock()
            .push(format!("destroyed null fence {}", fence.0));
    }
}

#[derive(Default)]
struct EngineLog {
    blits: Vec<usize>,
    presents: u32,
}

struct RecordingEngine {
    log: Arc<Mutex<EngineLog>>,
}

impl BlitEngine for RecordingEngine {
    fn blit(&mut self, slot: usize) -> Result<(), PresentError> {
        self.log.lock().blits.push(slot);
        Ok(())
    }

    fn present(&mut self) -> Result<(), PresentError> {
        self.log.lock().presents += 1;
        Ok(())
    }
}

fn recording_factory(log: Arc<Mutex<EngineLog>>) -> EngineFactory {
    Box::new(move || Ok(Box::new(RecordingEngine { log }) as Box<dyn BlitEngine>))
}

#[derive(Default)]
struct TimingLog {
    intervals: Vec<u32>,
    vsyncs: u32,
}

struct MockTiming {
    log: Arc<Mutex<TimingLog>>,
}

impl DisplayTiming for MockTiming {
    fn set_swap_interval(&mut self, interval: u32) -> Result<(), PresentError> {
        self.log.lock().intervals.push(interval);
        Ok(())
    }

    fn wait_vsync(&mut self) -> Result<(), PresentError> {
        self.log.lock().vsyncs += 1;
        Ok(())
    }
}

struct RecordingBinder {
    bound: Arc<Mutex<Vec<usize>>>,
}

impl RenderTargetBinder for RecordingBinder {
    fn bind_render_target(&mut self, slot: usize) -> Result<(), PresentError> {
        self.bound.lock().push(slot);
        Ok(())
    }
}

struct Harness {
    fences: Arc<MockFences>,
    engine: Arc<Mutex<EngineLog>>,
    timing: Arc<Mutex<TimingLog>>,
    bound: Arc<Mutex<Vec<usize>>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            fences: MockFences::new(),
            engine: Arc::new(Mutex::new(EngineLog::default())),
            timing: Arc::new(Mutex::new(TimingLog::default())),
            bound: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn start(&self) -> Result<PresentSession, PresentError> {
        PresentSession::start(
            SessionConfig::new(PhysicalSize::new(1920, 1080)),
            self.fences.clone(),
            Box::new(RecordingBinder {
                bound: Arc::clone(&self.bound),
            }),
            Box::new(MockTiming {
                log: Arc::clone(&self.timing),
            }),
            recording_factory(Arc::clone(&self.engine)),
        )
    }
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn frames_display_in_ring_order() {
    let harness = Harness::new();
    let mut session = harness.start().unwrap();

    let mut render_targets = Vec::new();
    for _ in 0..3 {
        render_targets.push(session.swap().unwrap());
    }
    wait_until("three presents", || harness.engine.lock().presents == 3);
    session.shutdown();

    assert_eq!(render_targets, vec![2, 0, 1]);
    assert_eq!(harness.engine.lock().blits, vec![1, 2, 0]);
    // initial binding to slot 1, then the render target after each swap
    assert_eq!(*harness.bound.lock(), vec![1, 2, 0, 1]);
    assert_eq!(harness.fences.created(), 3);
    assert_eq!(harness.fences.destroyed(), 3);
}

#[test]
fn fence_timeout_skips_the_frame_and_keeps_presenting() {
    let harness = Harness::new();
    // the second created fence (token 2) never signals in time
    harness.fences.timeout_on.lock().insert(2);
    let mut session = harness.start().unwrap();

    for _ in 0..3 {
        session.swap().unwrap();
    }
    wait_until("skip then recovery", || {
        harness.engine.lock().blits == vec![1, 0]
    });
    wait_until("all fences destroyed", || harness.fences.destroyed() == 3);
    session.shutdown();

    assert_eq!(harness.engine.lock().presents, 2);
}

#[test]
fn shutdown_discards_pending_frames_without_leaking_fences() {
    let harness = Harness::new();
    let mut session = harness.start().unwrap();

    session.swap().unwrap();
    session.shutdown();

    assert_eq!(harness.fences.created(), 1);
    assert_eq!(harness.fences.destroyed(), 1);
    // whether the frame made it to the screen depends on timing
    assert!(harness.engine.lock().blits.len() <= 1);
}

#[test]
fn shutdown_at_a_wake_preempts_the_queued_frame() {
    let harness = Harness::new();
    // park the presenter inside the 4th frame's fence wait
    harness.fences.gate_token(4);
    let mut session = harness.start().unwrap();

    for _ in 0..4 {
        session.swap().unwrap();
    }
    wait_until("presenter parked on fence 4", || {
        harness.fences.is_waiting_on(4)
    });

    // the 5th frame queues behind the parked presenter
    session.swap().unwrap();
    let fences = Arc::clone(&harness.fences);
    let stopper = std::thread::spawn(move || {
        // let the stop signal land before the fence releases
        std::thread::sleep(Duration::from_millis(20));
        fences.release_token(4);
    });
    session.shutdown();
    stopper.join().unwrap();

    // frame 5 was never rotated in or blitted; its fence was still destroyed
    assert_eq!(harness.engine.lock().blits, vec![1, 2, 0, 1]);
    assert_eq!(harness.fences.created(), 5);
    assert_eq!(harness.fences.destroyed(), 5);
}

#[test]
fn null_fence_tokens_present_without_a_wait() {
    let harness = Harness::new();
    let fences = Arc::new(NullFences::default());
    let mut session = PresentSession::start(
        SessionConfig::new(PhysicalSize::new(1920, 1080)),
        fences.clone(),
        Box::new(RecordingBinder {
            bound: Arc::clone(&harness.bound),
        }),
        Box::new(MockTiming {
            log: Arc::clone(&harness.timing),
        }),
        recording_factory(Arc::clone(&harness.engine)),
    )
    .unwrap();

    for _ in 0..2 {
        session.swap().unwrap();
    }
    wait_until("two presents", || harness.engine.lock().presents == 2);
    // a queued frame discarded at shutdown must not be "destroyed" either
    session.swap().unwrap();
    session.shutdown();

    assert!(harness.engine.lock().blits.starts_with(&[1, 2]));
    let violations = fences.violations.lock();
    assert!(violations.is_empty(), "{violations:?}");
}

#[test]
fn swap_after_shutdown_returns_disconnected() {
    let harness = Harness::new();
    let mut session = harness.start().unwrap();
    session.shutdown();

    assert!(matches!(session.swap(), Err(PresentError::Disconnected)));
    // the fence created for the failed swap is destroyed, not leaked
    assert_eq!(harness.fences.created(), harness.fences.destroyed());
}

#[test]
fn engine_initialization_failure_aborts_start() {
    let harness = Harness::new();
    let failing: EngineFactory = Box::new(|| {
        Err(PresentError::Initialization(
            "blit program failed to link".into(),
        ))
    });

    let result = PresentSession::start(
        SessionConfig::new(PhysicalSize::new(1920, 1080)),
        harness.fences.clone(),
        Box::new(RecordingBinder {
            bound: Arc::clone(&harness.bound),
        }),
        Box::new(MockTiming {
            log: Arc::clone(&harness.timing),
        }),
        failing,
    );

    assert!(matches!(result, Err(PresentError::Initialization(_))));
    // no render target was ever bound
    assert!(harness.bound.lock().is_empty());
}

#[test]
fn swap_interval_zero_skips_the_vsync_wait() {
    let harness = Harness::new();
    let mut session = harness.start().unwrap();

    session.swap().unwrap();
    wait_until("first present", || harness.engine.lock().presents == 1);
    {
        let timing = harness.timing.lock();
        assert_eq!(timing.intervals, vec![1]);
        assert_eq!(timing.vsyncs, 1);
    }

    session.set_swap_interval(0);
    session.swap().unwrap();
    wait_until("second present", || harness.engine.lock().presents == 2);
    session.shutdown();

    let timing = harness.timing.lock();
    assert_eq!(timing.intervals, vec![1, 0]);
    assert_eq!(timing.vsyncs, 1);
}
