//! The tool-interface host: one per VM.
//!
//! Every operation takes the calling agent's [`Environment`] first and checks
//! that it is live and belongs to this host before touching any shared state.

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicI32, AtomicPtr, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use tracing::{debug, warn};

use crate::capabilities::{Capability, CapabilitySet, Phase};
use crate::config::JvmtiConfig;
use crate::error::{Error, Result};
use crate::events::{self, Event, EventKind};
use crate::functions;
use crate::monitor::{MonitorRegistry, RawMonitorId};
use crate::registry::{Environment, EnvironmentRegistry};
use crate::runtime::HostRuntime;
use crate::snapshot::{self, StackInfoBlock};
use crate::sys::jni::{jint, jlong, jobject, jthread};
use crate::sys::jvmti::{
    self, jvmtiError, jvmtiEventCallbacks, jvmtiFrameInfo, jvmtiInterface_1_,
};

const ONLOAD_OR_LIVE: &[Phase] = &[Phase::OnLoad, Phase::Live];
const LIVE: &[Phase] = &[Phase::Live];
const START_OR_LIVE: &[Phase] = &[Phase::Start, Phase::Live];
const ONLOAD_START_OR_LIVE: &[Phase] = &[Phase::OnLoad, Phase::Start, Phase::Live];

/// Server side of JVMTI for one VM.
pub struct JvmtiHost {
    this: Weak<JvmtiHost>,
    config: JvmtiConfig,
    runtime: Arc<dyn HostRuntime>,
    environments: EnvironmentRegistry,
    monitors: MonitorRegistry,
    phase: AtomicI32,
    functions: AtomicPtr<jvmtiInterface_1_>,
    epoch: Instant,
}

impl JvmtiHost {
    pub fn new(config: JvmtiConfig, runtime: Arc<dyn HostRuntime>) -> Arc<Self> {
        Arc::new_cyclic(|this| JvmtiHost {
            this: this.clone(),
            environments: EnvironmentRegistry::new(*config.table()),
            monitors: MonitorRegistry::new(config.initial_monitor_capacity()),
            phase: AtomicI32::new(config.initial_phase().to_raw()),
            functions: AtomicPtr::new(&functions::DEFAULT_FUNCTIONS as *const jvmtiInterface_1_ as *mut _),
            epoch: Instant::now(),
            runtime,
            config,
        })
    }

    pub fn config(&self) -> &JvmtiConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Arc<dyn HostRuntime> {
        &self.runtime
    }

    pub fn environments(&self) -> &EnvironmentRegistry {
        &self.environments
    }

    pub fn monitors(&self) -> &MonitorRegistry {
        &self.monitors
    }

    /// Sets the function table new environments point at, replacing
    /// [`DEFAULT_FUNCTIONS`](functions::DEFAULT_FUNCTIONS). Environments
    /// created earlier keep the table they were created with.
    pub fn install_function_table(&self, functions: *const jvmtiInterface_1_) {
        self.functions.store(functions as *mut _, Ordering::Release);
    }

    pub fn current_phase(&self) -> Phase {
        Phase::from_raw(self.phase.load(Ordering::Acquire)).unwrap_or(Phase::Dead)
    }

    fn set_phase(&self, phase: Phase) {
        debug!(?phase, "phase change");
        self.phase.store(phase.to_raw(), Ordering::Release);
    }

    fn check_env(&self, env: &Environment) -> Result<()> {
        if !env.is_live() || !env.belongs_to(self) {
            warn!(slot = env.slot(), "call on invalid environment");
            return Err(Error::InvalidEnvironment);
        }
        Ok(())
    }

    fn require_phase(&self, allowed: &[Phase]) -> Result<()> {
        if allowed.contains(&self.current_phase()) {
            Ok(())
        } else {
            Err(Error::WrongPhase)
        }
    }

    fn resolve_or_current(&self, thread: jthread) -> Result<jthread> {
        if thread.is_null() {
            self.runtime.current_thread().ok_or(Error::UnattachedThread)
        } else {
            Ok(thread)
        }
    }

    // =========================================================================
    // Environment lifecycle
    // =========================================================================

    /// Attaches a new environment.
    pub fn create_environment(&self) -> Result<Arc<Environment>> {
        self.create_environment_with(CapabilitySet::empty())
    }

    /// Attaches a new environment that may never hold `prohibited`, except
    /// for what it already holds.
    pub fn create_environment_with(&self, prohibited: CapabilitySet) -> Result<Arc<Environment>> {
        if self.current_phase() == Phase::Dead {
            return Err(Error::WrongPhase);
        }
        self.environments.create(
            self.this.clone(),
            self.functions.load(Ordering::Acquire),
            prohibited,
        )
    }

    pub fn dispose_environment(&self, env: &Environment) -> Result<()> {
        self.check_env(env)?;
        self.environments.dispose(env)
    }

    pub fn set_environment_local_storage(&self, env: &Environment, data: *mut c_void) -> Result<()> {
        self.check_env(env)?;
        env.set_local_storage(data);
        Ok(())
    }

    pub fn environment_local_storage(&self, env: &Environment) -> Result<*mut c_void> {
        self.check_env(env)?;
        Ok(env.local_storage())
    }

    // =========================================================================
    // General
    // =========================================================================

    pub fn phase(&self, env: &Environment) -> Result<Phase> {
        self.check_env(env)?;
        Ok(self.current_phase())
    }

    pub fn version_number(&self, env: &Environment) -> Result<jint> {
        self.check_env(env)?;
        Ok(self.config.version_number())
    }

    pub fn error_name(&self, env: &Environment, code: u32) -> Result<&'static str> {
        self.check_env(env)?;
        jvmtiError::from_raw(code)
            .map(jvmtiError::name)
            .ok_or(Error::IllegalArgument)
    }

    /// Monotonic nanoseconds since an arbitrary fixed origin.
    pub fn time(&self, env: &Environment) -> Result<jlong> {
        self.check_env(env)?;
        self.require_phase(START_OR_LIVE)?;
        Ok(self.epoch.elapsed().as_nanos() as jlong)
    }

    /// Unmanaged memory the agent frees with [`deallocate`](Self::deallocate).
    /// A zero size yields null.
    pub fn allocate(&self, env: &Environment, size: jlong) -> Result<*mut u8> {
        self.check_env(env)?;
        if size < 0 {
            return Err(Error::IllegalArgument);
        }
        if size == 0 {
            return Ok(ptr::null_mut());
        }
        let size = usize::try_from(size).map_err(|_| Error::OutOfMemory)?;
        // SAFETY: plain malloc; null is reported as OutOfMemory.
        let mem = unsafe { libc::malloc(size) } as *mut u8;
        if mem.is_null() {
            return Err(Error::OutOfMemory);
        }
        Ok(mem)
    }

    /// Frees memory from [`allocate`](Self::allocate) or any buffer this host
    /// handed out. Null is ignored.
    ///
    /// # Safety
    /// `mem` must be null or a live allocation made by this crate.
    pub unsafe fn deallocate(&self, env: &Environment, mem: *mut u8) -> Result<()> {
        self.check_env(env)?;
        if !mem.is_null() {
            libc::free(mem as *mut libc::c_void);
        }
        Ok(())
    }

    // =========================================================================
    // Capabilities
    // =========================================================================

    pub fn potential_capabilities(&self, env: &Environment) -> Result<CapabilitySet> {
        self.check_env(env)?;
        self.require_phase(ONLOAD_OR_LIVE)?;
        self.environments.potential_capabilities(env, self.current_phase())
    }

    pub fn capabilities(&self, env: &Environment) -> Result<CapabilitySet> {
        self.check_env(env)?;
        Ok(env.capabilities())
    }

    pub fn add_capabilities(&self, env: &Environment, desired: CapabilitySet) -> Result<()> {
        self.check_env(env)?;
        self.require_phase(ONLOAD_OR_LIVE)?;
        self.environments
            .add_capabilities(env, self.current_phase(), desired)
            .map(drop)
    }

    pub fn relinquish_capabilities(&self, env: &Environment, unwanted: CapabilitySet) -> Result<()> {
        self.check_env(env)?;
        self.require_phase(ONLOAD_OR_LIVE)?;
        self.environments.relinquish_capabilities(env, unwanted).map(drop)
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Replaces the environment's callbacks. `None` clears them all.
    pub fn set_event_callbacks(
        &self,
        env: &Environment,
        callbacks: Option<&jvmtiEventCallbacks>,
    ) -> Result<()> {
        self.check_env(env)?;
        self.require_phase(ONLOAD_OR_LIVE)?;
        env.set_callbacks(callbacks);
        Ok(())
    }

    /// `SetEventNotificationMode`. Thread-filtered enablement is not
    /// supported; a non-null `thread` is rejected.
    pub fn set_event_notification_mode(
        &self,
        env: &Environment,
        mode: jint,
        event: u32,
        thread: jthread,
    ) -> Result<()> {
        self.check_env(env)?;
        self.require_phase(ONLOAD_OR_LIVE)?;
        if !EventKind::in_range(event) {
            return Err(Error::InvalidEventType);
        }
        let kind = EventKind::from_raw(event).ok_or(Error::InvalidEventType)?;
        if !kind.is_supported() {
            return Err(Error::AccessDenied);
        }
        let enable = match mode {
            jvmti::JVMTI_ENABLE => true,
            jvmti::JVMTI_DISABLE => false,
            _ => return Err(Error::IllegalArgument),
        };
        if enable && !kind.permitted_by(env.capabilities()) {
            return Err(Error::MustPossessCapability);
        }
        if !thread.is_null() {
            return Err(if kind.is_global() {
                Error::IllegalArgument
            } else {
                Error::AccessDenied
            });
        }
        env.set_event_enabled(kind, enable);
        debug!(slot = env.slot(), ?kind, enable, "event notification mode");
        Ok(())
    }

    /// Convenience form of [`set_event_notification_mode`] for a VM-wide
    /// toggle.
    ///
    /// [`set_event_notification_mode`]: Self::set_event_notification_mode
    pub fn set_event_enabled(&self, env: &Environment, kind: EventKind, enabled: bool) -> Result<()> {
        let mode = if enabled { jvmti::JVMTI_ENABLE } else { jvmti::JVMTI_DISABLE };
        self.set_event_notification_mode(env, mode, kind.raw(), ptr::null_mut())
    }

    /// Delivers `event` to every live environment that enabled it and bound a
    /// callback. Environments disposed meanwhile are skipped but not freed
    /// until the walk ends. Returns how many callbacks ran.
    pub fn post_event(&self, event: Event) -> usize {
        let kind = event.kind();
        let jni_env = self.runtime.jni_env();
        let mut delivered = 0usize;
        for env in self.environments.iter() {
            if !env.is_event_enabled(kind) {
                continue;
            }
            let callbacks = env.callbacks();
            if !callbacks.is_bound(kind) {
                debug!(slot = env.slot(), ?kind, "event enabled but no callback bound");
                continue;
            }
            // SAFETY: the handles are this environment's own jvmtiEnv and the
            // runtime's JNIEnv for the posting thread.
            if unsafe { events::invoke(callbacks.raw(), env.external(), jni_env, &event) } {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn post_vm_start(&self) -> usize {
        self.set_phase(Phase::Start);
        self.post_event(Event::VmStart)
    }

    pub fn post_vm_init(&self, thread: jthread) -> usize {
        self.set_phase(Phase::Live);
        self.post_event(Event::VmInit { thread })
    }

    pub fn post_vm_death(&self) -> usize {
        let delivered = self.post_event(Event::VmDeath);
        self.set_phase(Phase::Dead);
        delivered
    }

    pub fn post_thread_start(&self, thread: jthread) -> usize {
        self.post_event(Event::ThreadStart { thread })
    }

    /// Posts ThreadEnd, then drops the thread's local storage in every
    /// environment.
    pub fn post_thread_end(&self, thread: jthread) -> usize {
        let delivered = self.post_event(Event::ThreadEnd { thread });
        let key = self.runtime.thread_key(thread);
        for env in self.environments.iter() {
            env.set_thread_local_storage(key, ptr::null_mut());
        }
        delivered
    }

    pub fn post_garbage_collection_start(&self) -> usize {
        self.post_event(Event::GarbageCollectionStart)
    }

    pub fn post_garbage_collection_finish(&self) -> usize {
        self.post_event(Event::GarbageCollectionFinish)
    }

    pub fn post_data_dump_request(&self) -> usize {
        self.post_event(Event::DataDumpRequest)
    }

    pub fn post_monitor_contended_enter(&self, thread: jthread, object: jobject) -> usize {
        self.post_event(Event::MonitorContendedEnter { thread, object })
    }

    pub fn post_monitor_contended_entered(&self, thread: jthread, object: jobject) -> usize {
        self.post_event(Event::MonitorContendedEntered { thread, object })
    }

    pub fn post_monitor_wait(&self, thread: jthread, object: jobject, timeout: jlong) -> usize {
        self.post_event(Event::MonitorWait { thread, object, timeout })
    }

    pub fn post_monitor_waited(&self, thread: jthread, object: jobject, timed_out: bool) -> usize {
        self.post_event(Event::MonitorWaited { thread, object, timed_out })
    }

    // =========================================================================
    // Raw monitors
    // =========================================================================

    pub fn create_raw_monitor(&self, env: &Environment, name: &str) -> Result<RawMonitorId> {
        self.check_env(env)?;
        self.require_phase(ONLOAD_START_OR_LIVE)?;
        self.monitors.create(name)
    }

    pub fn destroy_raw_monitor(&self, env: &Environment, id: RawMonitorId) -> Result<()> {
        self.check_env(env)?;
        self.require_phase(ONLOAD_START_OR_LIVE)?;
        self.monitors.destroy(id)
    }

    pub fn raw_monitor_enter(&self, env: &Environment, id: RawMonitorId) -> Result<()> {
        self.check_env(env)?;
        self.monitors.enter(id)
    }

    pub fn raw_monitor_exit(&self, env: &Environment, id: RawMonitorId) -> Result<()> {
        self.check_env(env)?;
        self.monitors.exit(id)
    }

    /// Waits on a monitor the caller owns. See [`MonitorRegistry::wait`] for
    /// the meaning of `millis`. An interrupt of the calling thread, whether
    /// pending on entry or delivered by [`interrupt_thread`] during the wait,
    /// ends the wait and is reported as `Interrupt` once the monitor is
    /// re-acquired.
    ///
    /// [`interrupt_thread`]: Self::interrupt_thread
    pub fn raw_monitor_wait(&self, env: &Environment, id: RawMonitorId, millis: jlong) -> Result<()> {
        self.check_env(env)?;
        let runtime = self.runtime.as_ref();
        self.monitors.wait_interruptibly(id, millis, &|| runtime.is_interrupted())?;
        if self.runtime.take_interrupt() {
            return Err(Error::Interrupt);
        }
        Ok(())
    }

    pub fn raw_monitor_notify(&self, env: &Environment, id: RawMonitorId) -> Result<()> {
        self.check_env(env)?;
        self.monitors.notify(id)
    }

    pub fn raw_monitor_notify_all(&self, env: &Environment, id: RawMonitorId) -> Result<()> {
        self.check_env(env)?;
        self.monitors.notify_all(id)
    }

    // =========================================================================
    // Stack traces and threads
    // =========================================================================

    /// Writes up to `out.len()` frames of `thread` (null: the calling
    /// thread) into `out`, starting at `start_depth`. Returns the count.
    pub fn stack_trace_into(
        &self,
        env: &Environment,
        thread: jthread,
        start_depth: jint,
        out: &mut [jvmtiFrameInfo],
    ) -> Result<usize> {
        self.check_env(env)?;
        self.require_phase(LIVE)?;
        snapshot::check_start_depth(start_depth, self.config.stack_depth_limit())?;
        let thread = self.resolve_or_current(thread)?;
        let runtime = self.runtime.as_ref();
        snapshot::quiesced(runtime, || {
            runtime.resolve_thread(thread)?;
            snapshot::fill_stack_trace(runtime, thread, start_depth, out)
        })
    }

    /// Owned form of [`stack_trace_into`](Self::stack_trace_into).
    pub fn stack_trace(
        &self,
        env: &Environment,
        thread: jthread,
        start_depth: jint,
        max_frame_count: jint,
    ) -> Result<Vec<jvmtiFrameInfo>> {
        if max_frame_count < 0 {
            return Err(Error::IllegalArgument);
        }
        self.check_env(env)?;
        self.require_phase(LIVE)?;
        snapshot::check_start_depth(start_depth, self.config.stack_depth_limit())?;
        let thread = self.resolve_or_current(thread)?;
        let runtime = self.runtime.as_ref();
        snapshot::quiesced(runtime, || {
            runtime.resolve_thread(thread)?;
            // Never more slots than the stack has visible frames.
            let len = (max_frame_count as usize).min(snapshot::count_frames(runtime, thread));
            let mut frames = Vec::new();
            frames.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;
            frames.resize(len, jvmtiFrameInfo::default());
            let written = snapshot::fill_stack_trace(runtime, thread, start_depth, &mut frames)?;
            frames.truncate(written);
            Ok(frames)
        })
    }

    pub fn all_stack_traces(&self, env: &Environment, max_frame_count: jint) -> Result<StackInfoBlock> {
        self.check_env(env)?;
        self.require_phase(LIVE)?;
        if max_frame_count < 0 {
            return Err(Error::IllegalArgument);
        }
        snapshot::all_stack_traces(self.runtime.as_ref(), max_frame_count as usize)
    }

    pub fn thread_list_stack_traces(
        &self,
        env: &Environment,
        threads: &[jthread],
        max_frame_count: jint,
    ) -> Result<StackInfoBlock> {
        self.check_env(env)?;
        self.require_phase(LIVE)?;
        if max_frame_count < 0 {
            return Err(Error::IllegalArgument);
        }
        snapshot::thread_list_stack_traces(self.runtime.as_ref(), threads, max_frame_count as usize)
    }

    pub fn frame_count(&self, env: &Environment, thread: jthread) -> Result<jint> {
        self.check_env(env)?;
        self.require_phase(LIVE)?;
        let thread = self.resolve_or_current(thread)?;
        let runtime = self.runtime.as_ref();
        snapshot::quiesced(runtime, || {
            runtime.resolve_thread(thread)?;
            Ok(snapshot::count_frames(runtime, thread) as jint)
        })
    }

    pub fn thread_state(&self, env: &Environment, thread: jthread) -> Result<jint> {
        self.check_env(env)?;
        self.require_phase(LIVE)?;
        let thread = self.resolve_or_current(thread)?;
        self.runtime.thread_state(thread)
    }

    pub fn current_thread(&self, env: &Environment) -> Result<jthread> {
        self.check_env(env)?;
        self.require_phase(START_OR_LIVE)?;
        self.runtime.current_thread().ok_or(Error::UnattachedThread)
    }

    pub fn all_threads(&self, env: &Environment) -> Result<Vec<jthread>> {
        self.check_env(env)?;
        self.require_phase(LIVE)?;
        Ok(self.runtime.live_threads())
    }

    /// Interrupts `thread` (null: the calling thread) and wakes it if it is
    /// waiting on a raw monitor.
    pub fn interrupt_thread(&self, env: &Environment, thread: jthread) -> Result<()> {
        self.check_env(env)?;
        self.require_phase(LIVE)?;
        if !env.capabilities().contains(Capability::SignalThread) {
            return Err(Error::MustPossessCapability);
        }
        let thread = self.resolve_or_current(thread)?;
        self.runtime.resolve_thread(thread)?;
        self.runtime.interrupt_thread(thread)?;
        self.monitors.wake_waiters();
        debug!(slot = env.slot(), "thread interrupted");
        Ok(())
    }

    /// Stores `data` for `thread` (null: the calling thread) in this
    /// environment. Each environment sees only its own values.
    pub fn set_thread_local_storage(&self, env: &Environment, thread: jthread, data: *mut c_void) -> Result<()> {
        self.check_env(env)?;
        self.require_phase(START_OR_LIVE)?;
        let key = self.thread_key(thread)?;
        env.set_thread_local_storage(key, data);
        Ok(())
    }

    /// The value last stored for `thread`, or null.
    pub fn thread_local_storage(&self, env: &Environment, thread: jthread) -> Result<*mut c_void> {
        self.check_env(env)?;
        self.require_phase(START_OR_LIVE)?;
        let key = self.thread_key(thread)?;
        Ok(env.thread_local_storage(key))
    }

    fn thread_key(&self, thread: jthread) -> Result<u64> {
        let thread = self.resolve_or_current(thread)?;
        self.runtime.resolve_thread(thread)?;
        Ok(self.runtime.thread_key(thread))
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Frees every environment and raw monitor. Handles held by agents stop
    /// validating.
    pub fn teardown(&self) {
        self.environments.teardown();
        self.monitors.clear();
        self.set_phase(Phase::Dead);
    }
}

impl std::fmt::Debug for JvmtiHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JvmtiHost")
            .field("phase", &self.current_phase())
            .field("environments", &self.environments.len())
            .field("monitors", &self.monitors.len())
            .finish()
    }
}
