//! Event kinds, per-environment enablement and callback invocation.
//!
//! Event numbers are contiguous, so an event maps to bit
//! `number - JVMTI_MIN_EVENT_TYPE_VAL` of an [`EventSet`]. Each environment
//! carries one set of user-enabled events and a [`CallbackTable`] holding the
//! agent's `jvmtiEventCallbacks` plus a mask of the non-null slots.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::capabilities::{Capability, CapabilitySet};
use crate::sys::jni::{jlong, jobject, jthread, JNIEnv, JNI_FALSE, JNI_TRUE};
use crate::sys::jvmti::{self, jvmtiEnv, jvmtiEventCallbacks};

/// A defined event number. Reserved numbers have no variant.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    VmInit = jvmti::JVMTI_EVENT_VM_INIT,
    VmDeath = jvmti::JVMTI_EVENT_VM_DEATH,
    ThreadStart = jvmti::JVMTI_EVENT_THREAD_START,
    ThreadEnd = jvmti::JVMTI_EVENT_THREAD_END,
    ClassFileLoadHook = jvmti::JVMTI_EVENT_CLASS_FILE_LOAD_HOOK,
    ClassLoad = jvmti::JVMTI_EVENT_CLASS_LOAD,
    ClassPrepare = jvmti::JVMTI_EVENT_CLASS_PREPARE,
    VmStart = jvmti::JVMTI_EVENT_VM_START,
    Exception = jvmti::JVMTI_EVENT_EXCEPTION,
    ExceptionCatch = jvmti::JVMTI_EVENT_EXCEPTION_CATCH,
    SingleStep = jvmti::JVMTI_EVENT_SINGLE_STEP,
    FramePop = jvmti::JVMTI_EVENT_FRAME_POP,
    Breakpoint = jvmti::JVMTI_EVENT_BREAKPOINT,
    FieldAccess = jvmti::JVMTI_EVENT_FIELD_ACCESS,
    FieldModification = jvmti::JVMTI_EVENT_FIELD_MODIFICATION,
    MethodEntry = jvmti::JVMTI_EVENT_METHOD_ENTRY,
    MethodExit = jvmti::JVMTI_EVENT_METHOD_EXIT,
    NativeMethodBind = jvmti::JVMTI_EVENT_NATIVE_METHOD_BIND,
    CompiledMethodLoad = jvmti::JVMTI_EVENT_COMPILED_METHOD_LOAD,
    CompiledMethodUnload = jvmti::JVMTI_EVENT_COMPILED_METHOD_UNLOAD,
    DynamicCodeGenerated = jvmti::JVMTI_EVENT_DYNAMIC_CODE_GENERATED,
    DataDumpRequest = jvmti::JVMTI_EVENT_DATA_DUMP_REQUEST,
    MonitorWait = jvmti::JVMTI_EVENT_MONITOR_WAIT,
    MonitorWaited = jvmti::JVMTI_EVENT_MONITOR_WAITED,
    MonitorContendedEnter = jvmti::JVMTI_EVENT_MONITOR_CONTENDED_ENTER,
    MonitorContendedEntered = jvmti::JVMTI_EVENT_MONITOR_CONTENDED_ENTERED,
    ResourceExhausted = jvmti::JVMTI_EVENT_RESOURCE_EXHAUSTED,
    GarbageCollectionStart = jvmti::JVMTI_EVENT_GARBAGE_COLLECTION_START,
    GarbageCollectionFinish = jvmti::JVMTI_EVENT_GARBAGE_COLLECTION_FINISH,
    ObjectFree = jvmti::JVMTI_EVENT_OBJECT_FREE,
    VmObjectAlloc = jvmti::JVMTI_EVENT_VM_OBJECT_ALLOC,
    SampledObjectAlloc = jvmti::JVMTI_EVENT_SAMPLED_OBJECT_ALLOC,
    VirtualThreadStart = jvmti::JVMTI_EVENT_VIRTUAL_THREAD_START,
    VirtualThreadEnd = jvmti::JVMTI_EVENT_VIRTUAL_THREAD_END,
}

impl EventKind {
    pub const ALL: &'static [EventKind] = &[
        EventKind::VmInit,
        EventKind::VmDeath,
        EventKind::ThreadStart,
        EventKind::ThreadEnd,
        EventKind::ClassFileLoadHook,
        EventKind::ClassLoad,
        EventKind::ClassPrepare,
        EventKind::VmStart,
        EventKind::Exception,
        EventKind::ExceptionCatch,
        EventKind::SingleStep,
        EventKind::FramePop,
        EventKind::Breakpoint,
        EventKind::FieldAccess,
        EventKind::FieldModification,
        EventKind::MethodEntry,
        EventKind::MethodExit,
        EventKind::NativeMethodBind,
        EventKind::CompiledMethodLoad,
        EventKind::CompiledMethodUnload,
        EventKind::DynamicCodeGenerated,
        EventKind::DataDumpRequest,
        EventKind::MonitorWait,
        EventKind::MonitorWaited,
        EventKind::MonitorContendedEnter,
        EventKind::MonitorContendedEntered,
        EventKind::ResourceExhausted,
        EventKind::GarbageCollectionStart,
        EventKind::GarbageCollectionFinish,
        EventKind::ObjectFree,
        EventKind::VmObjectAlloc,
        EventKind::SampledObjectAlloc,
        EventKind::VirtualThreadStart,
        EventKind::VirtualThreadEnd,
    ];

    /// Maps an event number to its kind. Reserved and out-of-range numbers
    /// yield `None`.
    pub fn from_raw(raw: u32) -> Option<EventKind> {
        EventKind::ALL.iter().copied().find(|k| *k as u32 == raw)
    }

    /// Whether `raw` lies in the event number range, reserved numbers included.
    pub fn in_range(raw: u32) -> bool {
        (jvmti::JVMTI_MIN_EVENT_TYPE_VAL..=jvmti::JVMTI_MAX_EVENT_TYPE_VAL).contains(&raw)
    }

    pub fn raw(self) -> u32 {
        self as u32
    }

    fn bit(self) -> u64 {
        1 << (self as u32 - jvmti::JVMTI_MIN_EVENT_TYPE_VAL)
    }

    /// Whether this VM ever posts the event.
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            EventKind::VmStart
                | EventKind::VmInit
                | EventKind::VmDeath
                | EventKind::ThreadStart
                | EventKind::ThreadEnd
                | EventKind::DataDumpRequest
                | EventKind::MonitorWait
                | EventKind::MonitorWaited
                | EventKind::MonitorContendedEnter
                | EventKind::MonitorContendedEntered
                | EventKind::GarbageCollectionStart
                | EventKind::GarbageCollectionFinish
        )
    }

    /// Global events are delivered VM-wide and cannot be filtered by thread.
    pub fn is_global(self) -> bool {
        matches!(
            self,
            EventKind::VmInit
                | EventKind::VmStart
                | EventKind::VmDeath
                | EventKind::ThreadStart
                | EventKind::VirtualThreadStart
                | EventKind::CompiledMethodLoad
                | EventKind::CompiledMethodUnload
                | EventKind::DynamicCodeGenerated
                | EventKind::DataDumpRequest
                | EventKind::ClassFileLoadHook
                | EventKind::GarbageCollectionStart
                | EventKind::GarbageCollectionFinish
                | EventKind::ObjectFree
                | EventKind::ResourceExhausted
        )
    }

    /// Capability an environment must hold to enable the event, if any.
    pub fn required_capability(self) -> Option<Capability> {
        use Capability as C;
        match self {
            EventKind::FieldAccess => Some(C::GenerateFieldAccessEvents),
            EventKind::FieldModification => Some(C::GenerateFieldModificationEvents),
            EventKind::SingleStep => Some(C::GenerateSingleStepEvents),
            EventKind::Exception | EventKind::ExceptionCatch => Some(C::GenerateExceptionEvents),
            EventKind::FramePop => Some(C::GenerateFramePopEvents),
            EventKind::Breakpoint => Some(C::GenerateBreakpointEvents),
            EventKind::MethodEntry => Some(C::GenerateMethodEntryEvents),
            EventKind::MethodExit => Some(C::GenerateMethodExitEvents),
            EventKind::CompiledMethodLoad | EventKind::CompiledMethodUnload => {
                Some(C::GenerateCompiledMethodLoadEvents)
            }
            EventKind::MonitorWait
            | EventKind::MonitorWaited
            | EventKind::MonitorContendedEnter
            | EventKind::MonitorContendedEntered => Some(C::GenerateMonitorEvents),
            EventKind::VmObjectAlloc => Some(C::GenerateVmObjectAllocEvents),
            EventKind::NativeMethodBind => Some(C::GenerateNativeMethodBindEvents),
            EventKind::GarbageCollectionStart | EventKind::GarbageCollectionFinish => {
                Some(C::GenerateGarbageCollectionEvents)
            }
            EventKind::ObjectFree => Some(C::GenerateObjectFreeEvents),
            EventKind::SampledObjectAlloc => Some(C::GenerateSampledObjectAllocEvents),
            EventKind::VirtualThreadStart | EventKind::VirtualThreadEnd => {
                Some(C::SupportVirtualThreads)
            }
            _ => None,
        }
    }

    /// Whether an environment holding `caps` may enable the event.
    pub fn permitted_by(self, caps: CapabilitySet) -> bool {
        self.required_capability().map_or(true, |c| caps.contains(c))
    }
}

// =============================================================================
// EventSet
// =============================================================================

/// A set of event kinds.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct EventSet(u64);

impl EventSet {
    pub const fn empty() -> Self {
        EventSet(0)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn contains(self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn with(self, kind: EventKind) -> Self {
        EventSet(self.0 | kind.bit())
    }

    pub fn without(self, kind: EventKind) -> Self {
        EventSet(self.0 & !kind.bit())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = EventKind> {
        EventKind::ALL.iter().copied().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<EventKind> for EventSet {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        iter.into_iter().fold(EventSet::empty(), |set, kind| set.with(kind))
    }
}

/// An [`EventSet`] that can be updated while dispatch reads it.
#[derive(Debug, Default)]
pub struct AtomicEventSet(AtomicU64);

impl AtomicEventSet {
    pub fn load(&self) -> EventSet {
        EventSet(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, kind: EventKind, enabled: bool) {
        if enabled {
            self.0.fetch_or(kind.bit(), Ordering::AcqRel);
        } else {
            self.0.fetch_and(!kind.bit(), Ordering::AcqRel);
        }
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.load().contains(kind)
    }

    pub fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }
}

// =============================================================================
// Callbacks
// =============================================================================

/// An environment's callbacks and the mask of slots that are bound.
#[derive(Debug, Copy, Clone, Default)]
pub struct CallbackTable {
    callbacks: jvmtiEventCallbacks,
    bound: EventSet,
}

impl CallbackTable {
    /// Replaces the whole table. Slots missing from `callbacks` end up unbound.
    pub fn set(&mut self, callbacks: Option<&jvmtiEventCallbacks>) {
        self.callbacks = callbacks.copied().unwrap_or_default();
        self.bound = EventKind::ALL
            .iter()
            .copied()
            .filter(|k| self.callbacks.is_bound(k.raw()))
            .collect();
    }

    pub fn clear(&mut self) {
        self.set(None);
    }

    pub fn is_bound(&self, kind: EventKind) -> bool {
        self.bound.contains(kind)
    }

    pub fn bound(&self) -> EventSet {
        self.bound
    }

    pub fn raw(&self) -> &jvmtiEventCallbacks {
        &self.callbacks
    }
}

// =============================================================================
// Events
// =============================================================================

/// An event occurrence together with its arguments.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
    VmStart,
    VmInit { thread: jthread },
    VmDeath,
    ThreadStart { thread: jthread },
    ThreadEnd { thread: jthread },
    DataDumpRequest,
    MonitorWait { thread: jthread, object: jobject, timeout: jlong },
    MonitorWaited { thread: jthread, object: jobject, timed_out: bool },
    MonitorContendedEnter { thread: jthread, object: jobject },
    MonitorContendedEntered { thread: jthread, object: jobject },
    GarbageCollectionStart,
    GarbageCollectionFinish,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::VmStart => EventKind::VmStart,
            Event::VmInit { .. } => EventKind::VmInit,
            Event::VmDeath => EventKind::VmDeath,
            Event::ThreadStart { .. } => EventKind::ThreadStart,
            Event::ThreadEnd { .. } => EventKind::ThreadEnd,
            Event::DataDumpRequest => EventKind::DataDumpRequest,
            Event::MonitorWait { .. } => EventKind::MonitorWait,
            Event::MonitorWaited { .. } => EventKind::MonitorWaited,
            Event::MonitorContendedEnter { .. } => EventKind::MonitorContendedEnter,
            Event::MonitorContendedEntered { .. } => EventKind::MonitorContendedEntered,
            Event::GarbageCollectionStart => EventKind::GarbageCollectionStart,
            Event::GarbageCollectionFinish => EventKind::GarbageCollectionFinish,
        }
    }
}

/// Calls the callback bound for `event` in `callbacks`. Returns `false` when
/// the slot is empty.
///
/// # Safety
/// `jvmti_env` and `jni_env` are passed to agent code unchanged and must be
/// what that code expects for the current thread.
pub unsafe fn invoke(
    callbacks: &jvmtiEventCallbacks,
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    event: &Event,
) -> bool {
    trace!(event = ?event.kind(), "invoking callback");
    match *event {
        Event::VmStart => callbacks.VMStart.map(|f| f(jvmti_env, jni_env)).is_some(),
        Event::VmInit { thread } => callbacks.VMInit.map(|f| f(jvmti_env, jni_env, thread)).is_some(),
        Event::VmDeath => callbacks.VMDeath.map(|f| f(jvmti_env, jni_env)).is_some(),
        Event::ThreadStart { thread } => callbacks
            .ThreadStart
            .map(|f| f(jvmti_env, jni_env, thread))
            .is_some(),
        Event::ThreadEnd { thread } => callbacks
            .ThreadEnd
            .map(|f| f(jvmti_env, jni_env, thread))
            .is_some(),
        Event::DataDumpRequest => callbacks.DataDumpRequest.map(|f| f(jvmti_env)).is_some(),
        Event::MonitorWait { thread, object, timeout } => callbacks
            .MonitorWait
            .map(|f| f(jvmti_env, jni_env, thread, object, timeout))
            .is_some(),
        Event::MonitorWaited { thread, object, timed_out } => {
            let timed_out = if timed_out { JNI_TRUE } else { JNI_FALSE };
            callbacks
                .MonitorWaited
                .map(|f| f(jvmti_env, jni_env, thread, object, timed_out))
                .is_some()
        }
        Event::MonitorContendedEnter { thread, object } => callbacks
            .MonitorContendedEnter
            .map(|f| f(jvmti_env, jni_env, thread, object))
            .is_some(),
        Event::MonitorContendedEntered { thread, object } => callbacks
            .MonitorContendedEntered
            .map(|f| f(jvmti_env, jni_env, thread, object))
            .is_some(),
        Event::GarbageCollectionStart => callbacks
            .GarbageCollectionStart
            .map(|f| f(jvmti_env))
            .is_some(),
        Event::GarbageCollectionFinish => callbacks
            .GarbageCollectionFinish
            .map(|f| f(jvmti_env))
            .is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "system" fn on_gc(_env: *mut jvmtiEnv) {}

    #[test]
    fn kinds_cover_range_minus_reserved() {
        for raw in 50..=88 {
            let reserved = matches!(raw, 72 | 77 | 78 | 79 | 85);
            assert_eq!(EventKind::from_raw(raw).is_none(), reserved, "event {raw}");
        }
        assert_eq!(EventKind::from_raw(49), None);
        assert_eq!(EventKind::from_raw(89), None);
    }

    #[test]
    fn event_bits_are_offsets_from_range_start() {
        assert_eq!(EventSet::empty().with(EventKind::VmInit).bits(), 1);
        assert_eq!(EventSet::empty().with(EventKind::VirtualThreadEnd).bits(), 1 << 38);
    }

    #[test]
    fn atomic_set_toggles_single_bits() {
        let set = AtomicEventSet::default();
        set.set(EventKind::ThreadStart, true);
        set.set(EventKind::ThreadEnd, true);
        set.set(EventKind::ThreadStart, false);
        assert_eq!(set.load(), EventSet::empty().with(EventKind::ThreadEnd));
    }

    #[test]
    fn callback_mask_tracks_bound_slots() {
        let mut table = CallbackTable::default();
        let callbacks = jvmtiEventCallbacks {
            GarbageCollectionFinish: Some(on_gc),
            ..Default::default()
        };
        table.set(Some(&callbacks));
        assert!(table.is_bound(EventKind::GarbageCollectionFinish));
        assert!(!table.is_bound(EventKind::GarbageCollectionStart));
        table.clear();
        assert!(table.bound().is_empty());
    }

    #[test]
    fn monitor_events_need_monitor_capability() {
        let caps = CapabilitySet::empty();
        assert!(!EventKind::MonitorWait.permitted_by(caps));
        assert!(EventKind::MonitorWait.permitted_by(caps.with(Capability::GenerateMonitorEvents)));
        assert!(EventKind::ThreadStart.permitted_by(caps));
    }
}
