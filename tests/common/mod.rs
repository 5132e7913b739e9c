#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use jvmti_host::jni::{jint, jmethodID, jthread, JNIEnv};
use jvmti_host::jvmti::{self, jvmtiEnv};
use jvmti_host::{Environment, Error, EventKind, FrameKind, HostRuntime, JvmtiConfig, JvmtiHost, Phase, Result, StackFrame};
use parking_lot::Mutex;
use proptest::test_runner::Config as ProptestConfig;

static INIT_LOGGING: Once = Once::new();

/// Routes crate logs to the test writer.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_thread_ids(true)
            .with_ansi(false)
            .try_init();
    });
}

pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    ProptestConfig::with_cases(cases)
}

pub fn thread(id: usize) -> jthread {
    id as jthread
}

pub fn method(id: usize) -> jmethodID {
    id as jmethodID
}

pub fn visible(method_id: usize, location: i64) -> StackFrame {
    StackFrame { method: method(method_id), location, kind: FrameKind::Visible }
}

pub fn internal(method_id: usize) -> StackFrame {
    StackFrame { method: method(method_id), location: -1, kind: FrameKind::Internal }
}

pub fn throwable_init(method_id: usize) -> StackFrame {
    StackFrame { method: method(method_id), location: 0, kind: FrameKind::ThrowableInit }
}

struct FakeThread {
    id: usize,
    alive: bool,
    frames: Vec<StackFrame>,
}

/// A VM with a fixed set of threads whose stacks are plain vectors, newest
/// frame first.
pub struct FakeRuntime {
    threads: Mutex<Vec<FakeThread>>,
    current: Mutex<Option<usize>>,
    quiesced: AtomicBool,
    quiesce_count: AtomicUsize,
    walked_unquiesced: AtomicBool,
    interrupted: AtomicBool,
}

// Frames carry raw method ids that are never dereferenced.
unsafe impl Send for FakeRuntime {}
unsafe impl Sync for FakeRuntime {}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            threads: Mutex::new(Vec::new()),
            current: Mutex::new(None),
            quiesced: AtomicBool::new(false),
            quiesce_count: AtomicUsize::new(0),
            walked_unquiesced: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
        }
    }

    pub fn add_thread(&self, id: usize, frames: Vec<StackFrame>) {
        self.threads.lock().push(FakeThread { id, alive: true, frames });
    }

    pub fn add_dead_thread(&self, id: usize) {
        self.threads.lock().push(FakeThread { id, alive: false, frames: Vec::new() });
    }

    pub fn set_current(&self, id: Option<usize>) {
        *self.current.lock() = id;
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn quiesce_count(&self) -> usize {
        self.quiesce_count.load(Ordering::SeqCst)
    }

    pub fn walked_unquiesced(&self) -> bool {
        self.walked_unquiesced.load(Ordering::SeqCst)
    }
}

impl HostRuntime for FakeRuntime {
    fn resolve_thread(&self, thread: jthread) -> Result<()> {
        let threads = self.threads.lock();
        match threads.iter().find(|t| t.id == thread as usize) {
            Some(t) if t.alive => Ok(()),
            Some(_) => Err(Error::ThreadNotAlive),
            None => Err(Error::InvalidThread),
        }
    }

    fn current_thread(&self) -> Option<jthread> {
        self.current.lock().map(thread)
    }

    fn live_threads(&self) -> Vec<jthread> {
        self.threads
            .lock()
            .iter()
            .filter(|t| t.alive)
            .map(|t| thread(t.id))
            .collect()
    }

    fn thread_state(&self, handle: jthread) -> Result<jint> {
        let threads = self.threads.lock();
        match threads.iter().find(|t| t.id == handle as usize) {
            Some(t) if t.alive => Ok(jvmti::JVMTI_THREAD_STATE_ALIVE | jvmti::JVMTI_THREAD_STATE_RUNNABLE),
            Some(_) => Ok(jvmti::JVMTI_THREAD_STATE_TERMINATED),
            None => Err(Error::InvalidThread),
        }
    }

    fn walk_stack(&self, handle: jthread, visit: &mut dyn FnMut(&StackFrame) -> bool) {
        if !self.quiesced.load(Ordering::SeqCst) {
            self.walked_unquiesced.store(true, Ordering::SeqCst);
        }
        let frames = {
            let threads = self.threads.lock();
            threads
                .iter()
                .find(|t| t.id == handle as usize)
                .map(|t| t.frames.clone())
                .unwrap_or_default()
        };
        for frame in &frames {
            if !visit(frame) {
                break;
            }
        }
    }

    fn run_quiesced(&self, op: &mut dyn FnMut()) {
        self.quiesced.store(true, Ordering::SeqCst);
        self.quiesce_count.fetch_add(1, Ordering::SeqCst);
        op();
        self.quiesced.store(false, Ordering::SeqCst);
    }

    fn jni_env(&self) -> *mut JNIEnv {
        0x5e11 as *mut JNIEnv
    }

    fn interrupt_thread(&self, _thread: jthread) -> Result<()> {
        self.interrupt();
        Ok(())
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    fn take_interrupt(&self) -> bool {
        self.interrupted.swap(false, Ordering::SeqCst)
    }
}

pub fn host_in(phase: Phase) -> (Arc<JvmtiHost>, Arc<FakeRuntime>) {
    host_with(JvmtiConfig::new().phase(phase))
}

pub fn host_with(config: JvmtiConfig) -> (Arc<JvmtiHost>, Arc<FakeRuntime>) {
    let runtime = Arc::new(FakeRuntime::new());
    let host = JvmtiHost::new(config, runtime.clone());
    (host, runtime)
}

// =============================================================================
// Event recording
// =============================================================================

/// Per-environment log of delivered events, reached through the
/// environment's local storage.
#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<EventKind>>,
    pub threads: Mutex<Vec<usize>>,
    /// An environment to dispose from inside the next callback.
    pub dispose_on_callback: Mutex<Option<Arc<Environment>>>,
}

impl Recorder {
    pub fn attach(host: &JvmtiHost, env: &Environment) -> Arc<Recorder> {
        let recorder = Arc::new(Recorder::default());
        host.set_environment_local_storage(env, Arc::as_ptr(&recorder) as *mut _)
            .unwrap();
        recorder
    }

    pub fn events(&self) -> Vec<EventKind> {
        self.events.lock().clone()
    }
}

unsafe fn record(jvmti_env: *mut jvmtiEnv, kind: EventKind, thread: Option<jthread>) {
    let env = Environment::from_external(jvmti_env).expect("callback for a live environment");
    let recorder = &*(env.local_storage() as *const Recorder);
    recorder.events.lock().push(kind);
    if let Some(thread) = thread {
        recorder.threads.lock().push(thread as usize);
    }
    let victim = recorder.dispose_on_callback.lock().take();
    if let Some(victim) = victim {
        if let Some(host) = env.host() {
            host.dispose_environment(&victim).unwrap();
        }
    }
}

pub unsafe extern "system" fn on_vm_start(env: *mut jvmtiEnv, _jni: *mut JNIEnv) {
    record(env, EventKind::VmStart, None);
}

pub unsafe extern "system" fn on_vm_init(env: *mut jvmtiEnv, _jni: *mut JNIEnv, thread: jthread) {
    record(env, EventKind::VmInit, Some(thread));
}

pub unsafe extern "system" fn on_vm_death(env: *mut jvmtiEnv, _jni: *mut JNIEnv) {
    record(env, EventKind::VmDeath, None);
}

pub unsafe extern "system" fn on_thread_end(env: *mut jvmtiEnv, _jni: *mut JNIEnv, thread: jthread) {
    record(env, EventKind::ThreadEnd, Some(thread));
}

pub unsafe extern "system" fn on_thread_start(env: *mut jvmtiEnv, _jni: *mut JNIEnv, thread: jthread) {
    record(env, EventKind::ThreadStart, Some(thread));
}

pub unsafe extern "system" fn on_gc_start(env: *mut jvmtiEnv) {
    record(env, EventKind::GarbageCollectionStart, None);
}

pub unsafe extern "system" fn on_gc_finish(env: *mut jvmtiEnv) {
    record(env, EventKind::GarbageCollectionFinish, None);
}

pub unsafe extern "system" fn on_monitor_waited(
    env: *mut jvmtiEnv,
    _jni: *mut JNIEnv,
    thread: jthread,
    _object: jvmti_host::jni::jobject,
    _timed_out: jvmti_host::jni::jboolean,
) {
    record(env, EventKind::MonitorWaited, Some(thread));
}

/// A callback table with every recording callback above bound.
pub fn recording_callbacks() -> jvmti::jvmtiEventCallbacks {
    jvmti::jvmtiEventCallbacks {
        VMStart: Some(on_vm_start),
        VMInit: Some(on_vm_init),
        VMDeath: Some(on_vm_death),
        ThreadStart: Some(on_thread_start),
        ThreadEnd: Some(on_thread_end),
        GarbageCollectionStart: Some(on_gc_start),
        GarbageCollectionFinish: Some(on_gc_finish),
        MonitorWaited: Some(on_monitor_waited),
        ..Default::default()
    }
}
