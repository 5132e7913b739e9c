// jvmti-host/src/sys/jvmti.rs
//
// JVMTI ABI types as seen from the VM side of the interface.
//
// Layouts follow jvmti.h. The function table keeps the full slot layout of
// jvmtiInterface_1_; `crate::functions` fills the slots the host serves.
//
// Event numbers are contiguous from JVMTI_MIN_EVENT_TYPE_VAL to
// JVMTI_MAX_EVENT_TYPE_VAL. Reserved numbers: 72, 77, 78, 79, 85.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::os::raw::{c_char, c_uchar, c_void};
use std::ptr;
use crate::sys::jni::{jboolean, jint, jlong, jmethodID, jobject, jthread, JNIEnv};

// --- Versions ---
pub const JVMTI_VERSION_1_0: jint = 0x30010000;
pub const JVMTI_VERSION_1_1: jint = 0x30010100;
pub const JVMTI_VERSION_1_2: jint = 0x30010200;
pub const JVMTI_VERSION_9: jint = 0x30090000;
pub const JVMTI_VERSION_11: jint = 0x300B0000;
pub const JVMTI_VERSION_19: jint = 0x30130000;
pub const JVMTI_VERSION_21: jint = 0x30150000;

// --- Events ---
pub const JVMTI_MIN_EVENT_TYPE_VAL: u32 = 50;
pub const JVMTI_EVENT_VM_INIT: u32 = 50;
pub const JVMTI_EVENT_VM_DEATH: u32 = 51;
pub const JVMTI_EVENT_THREAD_START: u32 = 52;
pub const JVMTI_EVENT_THREAD_END: u32 = 53;
pub const JVMTI_EVENT_CLASS_FILE_LOAD_HOOK: u32 = 54;
pub const JVMTI_EVENT_CLASS_LOAD: u32 = 55;
pub const JVMTI_EVENT_CLASS_PREPARE: u32 = 56;
pub const JVMTI_EVENT_VM_START: u32 = 57;
pub const JVMTI_EVENT_EXCEPTION: u32 = 58;
pub const JVMTI_EVENT_EXCEPTION_CATCH: u32 = 59;
pub const JVMTI_EVENT_SINGLE_STEP: u32 = 60;
pub const JVMTI_EVENT_FRAME_POP: u32 = 61;
pub const JVMTI_EVENT_BREAKPOINT: u32 = 62;
pub const JVMTI_EVENT_FIELD_ACCESS: u32 = 63;
pub const JVMTI_EVENT_FIELD_MODIFICATION: u32 = 64;
pub const JVMTI_EVENT_METHOD_ENTRY: u32 = 65;
pub const JVMTI_EVENT_METHOD_EXIT: u32 = 66;
pub const JVMTI_EVENT_NATIVE_METHOD_BIND: u32 = 67;
pub const JVMTI_EVENT_COMPILED_METHOD_LOAD: u32 = 68;
pub const JVMTI_EVENT_COMPILED_METHOD_UNLOAD: u32 = 69;
pub const JVMTI_EVENT_DYNAMIC_CODE_GENERATED: u32 = 70;
pub const JVMTI_EVENT_DATA_DUMP_REQUEST: u32 = 71;
pub const JVMTI_EVENT_MONITOR_WAIT: u32 = 73;
pub const JVMTI_EVENT_MONITOR_WAITED: u32 = 74;
pub const JVMTI_EVENT_MONITOR_CONTENDED_ENTER: u32 = 75;
pub const JVMTI_EVENT_MONITOR_CONTENDED_ENTERED: u32 = 76;
pub const JVMTI_EVENT_RESOURCE_EXHAUSTED: u32 = 80;
pub const JVMTI_EVENT_GARBAGE_COLLECTION_START: u32 = 81;
pub const JVMTI_EVENT_GARBAGE_COLLECTION_FINISH: u32 = 82;
pub const JVMTI_EVENT_OBJECT_FREE: u32 = 83;
pub const JVMTI_EVENT_VM_OBJECT_ALLOC: u32 = 84;
pub const JVMTI_EVENT_SAMPLED_OBJECT_ALLOC: u32 = 86;
pub const JVMTI_EVENT_VIRTUAL_THREAD_START: u32 = 87;
pub const JVMTI_EVENT_VIRTUAL_THREAD_END: u32 = 88;
pub const JVMTI_MAX_EVENT_TYPE_VAL: u32 = 88;

// --- Phases ---
pub const JVMTI_PHASE_ONLOAD: jint = 1;
pub const JVMTI_PHASE_PRIMORDIAL: jint = 2;
pub const JVMTI_PHASE_START: jint = 6;
pub const JVMTI_PHASE_LIVE: jint = 4;
pub const JVMTI_PHASE_DEAD: jint = 8;

pub const JVMTI_ENABLE: jint = 1;
pub const JVMTI_DISABLE: jint = 0;

// --- Thread State Flags ---
pub const JVMTI_THREAD_STATE_ALIVE: jint = 0x0001;
pub const JVMTI_THREAD_STATE_TERMINATED: jint = 0x0002;
pub const JVMTI_THREAD_STATE_RUNNABLE: jint = 0x0004;
pub const JVMTI_THREAD_STATE_WAITING_INDEFINITELY: jint = 0x0010;
pub const JVMTI_THREAD_STATE_WAITING_WITH_TIMEOUT: jint = 0x0020;
pub const JVMTI_THREAD_STATE_SLEEPING: jint = 0x0040;
pub const JVMTI_THREAD_STATE_WAITING: jint = 0x0080;
pub const JVMTI_THREAD_STATE_IN_OBJECT_WAIT: jint = 0x0100;
pub const JVMTI_THREAD_STATE_PARKED: jint = 0x0200;
pub const JVMTI_THREAD_STATE_BLOCKED_ON_MONITOR_ENTER: jint = 0x0400;
pub const JVMTI_THREAD_STATE_SUSPENDED: jint = 0x100000;
pub const JVMTI_THREAD_STATE_INTERRUPTED: jint = 0x200000;
pub const JVMTI_THREAD_STATE_IN_NATIVE: jint = 0x400000;

// --- Error Codes ---
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum jvmtiError {
    NONE = 0,
    INVALID_THREAD = 10,
    INVALID_THREAD_GROUP = 11,
    INVALID_PRIORITY = 12,
    THREAD_NOT_SUSPENDED = 13,
    THREAD_SUSPENDED = 14,
    THREAD_NOT_ALIVE = 15,
    INVALID_OBJECT = 20,
    INVALID_CLASS = 21,
    CLASS_NOT_PREPARED = 22,
    INVALID_METHODID = 23,
    INVALID_LOCATION = 24,
    INVALID_FIELDID = 25,
    INVALID_MODULE = 26,
    NO_MORE_FRAMES = 31,
    OPAQUE_FRAME = 32,
    TYPE_MISMATCH = 34,
    INVALID_SLOT = 35,
    DUPLICATE = 40,
    NOT_FOUND = 41,
    INVALID_MONITOR = 50,
    NOT_MONITOR_OWNER = 51,
    INTERRUPT = 52,
    INVALID_CLASS_FORMAT = 60,
    CIRCULAR_CLASS_DEFINITION = 61,
    FAILS_VERIFICATION = 62,
    UNSUPPORTED_REDEFINITION_METHOD_ADDED = 63,
    UNSUPPORTED_REDEFINITION_SCHEMA_CHANGED = 64,
    INVALID_TYPESTATE = 65,
    UNSUPPORTED_REDEFINITION_HIERARCHY_CHANGED = 66,
    UNSUPPORTED_REDEFINITION_METHOD_DELETED = 67,
    UNSUPPORTED_VERSION = 68,
    NAMES_DONT_MATCH = 69,
    UNSUPPORTED_REDEFINITION_CLASS_MODIFIERS_CHANGED = 70,
    UNSUPPORTED_REDEFINITION_METHOD_MODIFIERS_CHANGED = 71,
    UNSUPPORTED_REDEFINITION_CLASS_ATTRIBUTE_CHANGED = 72,
    UNSUPPORTED_OPERATION = 73,
    UNMODIFIABLE_CLASS = 79,
    UNMODIFIABLE_MODULE = 80,
    NOT_AVAILABLE = 98,
    MUST_POSSESS_CAPABILITY = 99,
    NULL_POINTER = 100,
    ABSENT_INFORMATION = 101,
    INVALID_EVENT_TYPE = 102,
    ILLEGAL_ARGUMENT = 103,
    NATIVE_METHOD = 104,
    CLASS_LOADER_UNSUPPORTED = 106,
    OUT_OF_MEMORY = 110,
    ACCESS_DENIED = 111,
    WRONG_PHASE = 112,
    INTERNAL = 113,
    UNATTACHED_THREAD = 115,
    INVALID_ENVIRONMENT = 116,
}

impl jvmtiError {
    /// Every defined code, in ascending numeric order.
    pub const ALL: [jvmtiError; 53] = [
        jvmtiError::NONE,
        jvmtiError::INVALID_THREAD,
        jvmtiError::INVALID_THREAD_GROUP,
        jvmtiError::INVALID_PRIORITY,
        jvmtiError::THREAD_NOT_SUSPENDED,
        jvmtiError::THREAD_SUSPENDED,
        jvmtiError::THREAD_NOT_ALIVE,
        jvmtiError::INVALID_OBJECT,
        jvmtiError::INVALID_CLASS,
        jvmtiError::CLASS_NOT_PREPARED,
        jvmtiError::INVALID_METHODID,
        jvmtiError::INVALID_LOCATION,
        jvmtiError::INVALID_FIELDID,
        jvmtiError::INVALID_MODULE,
        jvmtiError::NO_MORE_FRAMES,
        jvmtiError::OPAQUE_FRAME,
        jvmtiError::TYPE_MISMATCH,
        jvmtiError::INVALID_SLOT,
        jvmtiError::DUPLICATE,
        jvmtiError::NOT_FOUND,
        jvmtiError::INVALID_MONITOR,
        jvmtiError::NOT_MONITOR_OWNER,
        jvmtiError::INTERRUPT,
        jvmtiError::INVALID_CLASS_FORMAT,
        jvmtiError::CIRCULAR_CLASS_DEFINITION,
        jvmtiError::FAILS_VERIFICATION,
        jvmtiError::UNSUPPORTED_REDEFINITION_METHOD_ADDED,
        jvmtiError::UNSUPPORTED_REDEFINITION_SCHEMA_CHANGED,
        jvmtiError::INVALID_TYPESTATE,
        jvmtiError::UNSUPPORTED_REDEFINITION_HIERARCHY_CHANGED,
        jvmtiError::UNSUPPORTED_REDEFINITION_METHOD_DELETED,
        jvmtiError::UNSUPPORTED_VERSION,
        jvmtiError::NAMES_DONT_MATCH,
        jvmtiError::UNSUPPORTED_REDEFINITION_CLASS_MODIFIERS_CHANGED,
        jvmtiError::UNSUPPORTED_REDEFINITION_METHOD_MODIFIERS_CHANGED,
        jvmtiError::UNSUPPORTED_REDEFINITION_CLASS_ATTRIBUTE_CHANGED,
        jvmtiError::UNSUPPORTED_OPERATION,
        jvmtiError::UNMODIFIABLE_CLASS,
        jvmtiError::UNMODIFIABLE_MODULE,
        jvmtiError::NOT_AVAILABLE,
        jvmtiError::MUST_POSSESS_CAPABILITY,
        jvmtiError::NULL_POINTER,
        jvmtiError::ABSENT_INFORMATION,
        jvmtiError::INVALID_EVENT_TYPE,
        jvmtiError::ILLEGAL_ARGUMENT,
        jvmtiError::NATIVE_METHOD,
        jvmtiError::CLASS_LOADER_UNSUPPORTED,
        jvmtiError::OUT_OF_MEMORY,
        jvmtiError::ACCESS_DENIED,
        jvmtiError::WRONG_PHASE,
        jvmtiError::INTERNAL,
        jvmtiError::UNATTACHED_THREAD,
        jvmtiError::INVALID_ENVIRONMENT,
    ];

    /// Looks up the code with the given numeric value.
    pub fn from_raw(raw: u32) -> Option<jvmtiError> {
        Self::ALL.iter().copied().find(|e| *e as u32 == raw)
    }

    /// The `JVMTI_ERROR_*` spelling reported by `GetErrorName`.
    pub fn name(self) -> &'static str {
        match self {
            jvmtiError::NONE => "JVMTI_ERROR_NONE",
            jvmtiError::INVALID_THREAD => "JVMTI_ERROR_INVALID_THREAD",
            jvmtiError::INVALID_THREAD_GROUP => "JVMTI_ERROR_INVALID_THREAD_GROUP",
            jvmtiError::INVALID_PRIORITY => "JVMTI_ERROR_INVALID_PRIORITY",
            jvmtiError::THREAD_NOT_SUSPENDED => "JVMTI_ERROR_THREAD_NOT_SUSPENDED",
            jvmtiError::THREAD_SUSPENDED => "JVMTI_ERROR_THREAD_SUSPENDED",
            jvmtiError::THREAD_NOT_ALIVE => "JVMTI_ERROR_THREAD_NOT_ALIVE",
            jvmtiError::INVALID_OBJECT => "JVMTI_ERROR_INVALID_OBJECT",
            jvmtiError::INVALID_CLASS => "JVMTI_ERROR_INVALID_CLASS",
            jvmtiError::CLASS_NOT_PREPARED => "JVMTI_ERROR_CLASS_NOT_PREPARED",
            jvmtiError::INVALID_METHODID => "JVMTI_ERROR_INVALID_METHODID",
            jvmtiError::INVALID_LOCATION => "JVMTI_ERROR_INVALID_LOCATION",
            jvmtiError::INVALID_FIELDID => "JVMTI_ERROR_INVALID_FIELDID",
            jvmtiError::INVALID_MODULE => "JVMTI_ERROR_INVALID_MODULE",
            jvmtiError::NO_MORE_FRAMES => "JVMTI_ERROR_NO_MORE_FRAMES",
            jvmtiError::OPAQUE_FRAME => "JVMTI_ERROR_OPAQUE_FRAME",
            jvmtiError::TYPE_MISMATCH => "JVMTI_ERROR_TYPE_MISMATCH",
            jvmtiError::INVALID_SLOT => "JVMTI_ERROR_INVALID_SLOT",
            jvmtiError::DUPLICATE => "JVMTI_ERROR_DUPLICATE",
            jvmtiError::NOT_FOUND => "JVMTI_ERROR_NOT_FOUND",
            jvmtiError::INVALID_MONITOR => "JVMTI_ERROR_INVALID_MONITOR",
            jvmtiError::NOT_MONITOR_OWNER => "JVMTI_ERROR_NOT_MONITOR_OWNER",
            jvmtiError::INTERRUPT => "JVMTI_ERROR_INTERRUPT",
            jvmtiError::INVALID_CLASS_FORMAT => "JVMTI_ERROR_INVALID_CLASS_FORMAT",
            jvmtiError::CIRCULAR_CLASS_DEFINITION => "JVMTI_ERROR_CIRCULAR_CLASS_DEFINITION",
            jvmtiError::FAILS_VERIFICATION => "JVMTI_ERROR_FAILS_VERIFICATION",
            jvmtiError::UNSUPPORTED_REDEFINITION_METHOD_ADDED => {
                "JVMTI_ERROR_UNSUPPORTED_REDEFINITION_METHOD_ADDED"
            }
            jvmtiError::UNSUPPORTED_REDEFINITION_SCHEMA_CHANGED => {
                "JVMTI_ERROR_UNSUPPORTED_REDEFINITION_SCHEMA_CHANGED"
            }
            jvmtiError::INVALID_TYPESTATE => "JVMTI_ERROR_INVALID_TYPESTATE",
            jvmtiError::UNSUPPORTED_REDEFINITION_HIERARCHY_CHANGED => {
                "JVMTI_ERROR_UNSUPPORTED_REDEFINITION_HIERARCHY_CHANGED"
            }
            jvmtiError::UNSUPPORTED_REDEFINITION_METHOD_DELETED => {
                "JVMTI_ERROR_UNSUPPORTED_REDEFINITION_METHOD_DELETED"
            }
            jvmtiError::UNSUPPORTED_VERSION => "JVMTI_ERROR_UNSUPPORTED_VERSION",
            jvmtiError::NAMES_DONT_MATCH => "JVMTI_ERROR_NAMES_DONT_MATCH",
            jvmtiError::UNSUPPORTED_REDEFINITION_CLASS_MODIFIERS_CHANGED => {
                "JVMTI_ERROR_UNSUPPORTED_REDEFINITION_CLASS_MODIFIERS_CHANGED"
            }
            jvmtiError::UNSUPPORTED_REDEFINITION_METHOD_MODIFIERS_CHANGED => {
                "JVMTI_ERROR_UNSUPPORTED_REDEFINITION_METHOD_MODIFIERS_CHANGED"
            }
            jvmtiError::UNSUPPORTED_REDEFINITION_CLASS_ATTRIBUTE_CHANGED => {
                "JVMTI_ERROR_UNSUPPORTED_REDEFINITION_CLASS_ATTRIBUTE_CHANGED"
            }
            jvmtiError::UNSUPPORTED_OPERATION => "JVMTI_ERROR_UNSUPPORTED_OPERATION",
            jvmtiError::UNMODIFIABLE_CLASS => "JVMTI_ERROR_UNMODIFIABLE_CLASS",
            jvmtiError::UNMODIFIABLE_MODULE => "JVMTI_ERROR_UNMODIFIABLE_MODULE",
            jvmtiError::NOT_AVAILABLE => "JVMTI_ERROR_NOT_AVAILABLE",
            jvmtiError::MUST_POSSESS_CAPABILITY => "JVMTI_ERROR_MUST_POSSESS_CAPABILITY",
            jvmtiError::NULL_POINTER => "JVMTI_ERROR_NULL_POINTER",
            jvmtiError::ABSENT_INFORMATION => "JVMTI_ERROR_ABSENT_INFORMATION",
            jvmtiError::INVALID_EVENT_TYPE => "JVMTI_ERROR_INVALID_EVENT_TYPE",
            jvmtiError::ILLEGAL_ARGUMENT => "JVMTI_ERROR_ILLEGAL_ARGUMENT",
            jvmtiError::NATIVE_METHOD => "JVMTI_ERROR_NATIVE_METHOD",
            jvmtiError::CLASS_LOADER_UNSUPPORTED => "JVMTI_ERROR_CLASS_LOADER_UNSUPPORTED",
            jvmtiError::OUT_OF_MEMORY => "JVMTI_ERROR_OUT_OF_MEMORY",
            jvmtiError::ACCESS_DENIED => "JVMTI_ERROR_ACCESS_DENIED",
            jvmtiError::WRONG_PHASE => "JVMTI_ERROR_WRONG_PHASE",
            jvmtiError::INTERNAL => "JVMTI_ERROR_INTERNAL",
            jvmtiError::UNATTACHED_THREAD => "JVMTI_ERROR_UNATTACHED_THREAD",
            jvmtiError::INVALID_ENVIRONMENT => "JVMTI_ERROR_INVALID_ENVIRONMENT",
        }
    }
}

pub type jlocation = jlong;
pub type jrawMonitorID = *mut c_void;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct jvmtiFrameInfo {
    pub method: jmethodID,
    pub location: jlocation,
}

impl Default for jvmtiFrameInfo {
    fn default() -> Self {
        Self { method: std::ptr::null_mut(), location: 0 }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiStackInfo {
    pub frame_buffer: *mut jvmtiFrameInfo,
    pub thread: jthread,
    pub state: jint,
    pub frame_count: jint,
}

// --- Capabilities ---

/// The 128-bit capability bitfield from jvmti.h. Bit `n` is capability
/// ordinal `n`; only the low 45 bits are defined.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct jvmtiCapabilities {
    bits: [u32; 4],
}

impl jvmtiCapabilities {
    /// Builds the ABI struct from a packed word (bit n = ordinal n).
    pub fn from_word(word: u64) -> Self {
        Self { bits: [word as u32, (word >> 32) as u32, 0, 0] }
    }

    /// Packs the defined bits into one word. Undefined high bits are dropped.
    pub fn to_word(&self) -> u64 {
        u64::from(self.bits[0]) | (u64::from(self.bits[1]) << 32)
    }

    pub fn get_bit(&self, bit_offset: usize) -> bool {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        (self.bits[word_index] & (1 << bit_index)) != 0
    }

    pub fn set_bit(&mut self, bit_offset: usize, value: bool) {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        if value {
            self.bits[word_index] |= 1 << bit_index;
        } else {
            self.bits[word_index] &= !(1 << bit_index);
        }
    }
}

// --- Function Table ---

pub type JvmtiSetEventNotificationModeFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mode: jint, event_type: u32, event_thread: jthread) -> jvmtiError;
pub type JvmtiGetAllThreadsFn = unsafe extern "system" fn(env: *mut jvmtiEnv, threads_count_ptr: *mut jint, threads_ptr: *mut *mut jthread) -> jvmtiError;
pub type JvmtiInterruptThreadFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread: jthread) -> jvmtiError;
pub type JvmtiGetFrameCountFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread: jthread, count_ptr: *mut jint) -> jvmtiError;
pub type JvmtiGetThreadStateFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread: jthread, thread_state_ptr: *mut jint) -> jvmtiError;
pub type JvmtiGetCurrentThreadFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread_ptr: *mut jthread) -> jvmtiError;
pub type JvmtiCreateRawMonitorFn = unsafe extern "system" fn(env: *mut jvmtiEnv, name: *const c_char, monitor_ptr: *mut jrawMonitorID) -> jvmtiError;
pub type JvmtiDestroyRawMonitorFn = unsafe extern "system" fn(env: *mut jvmtiEnv, monitor: jrawMonitorID) -> jvmtiError;
pub type JvmtiRawMonitorEnterFn = unsafe extern "system" fn(env: *mut jvmtiEnv, monitor: jrawMonitorID) -> jvmtiError;
pub type JvmtiRawMonitorExitFn = unsafe extern "system" fn(env: *mut jvmtiEnv, monitor: jrawMonitorID) -> jvmtiError;
pub type JvmtiRawMonitorWaitFn = unsafe extern "system" fn(env: *mut jvmtiEnv, monitor: jrawMonitorID, millis: jlong) -> jvmtiError;
pub type JvmtiRawMonitorNotifyFn = unsafe extern "system" fn(env: *mut jvmtiEnv, monitor: jrawMonitorID) -> jvmtiError;
pub type JvmtiRawMonitorNotifyAllFn = unsafe extern "system" fn(env: *mut jvmtiEnv, monitor: jrawMonitorID) -> jvmtiError;
pub type JvmtiAllocateFn = unsafe extern "system" fn(env: *mut jvmtiEnv, size: jlong, mem_ptr: *mut *mut c_uchar) -> jvmtiError;
pub type JvmtiDeallocateFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError;
pub type JvmtiGetVersionNumberFn = unsafe extern "system" fn(env: *mut jvmtiEnv, version_ptr: *mut jint) -> jvmtiError;
pub type JvmtiGetCapabilitiesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *mut jvmtiCapabilities) -> jvmtiError;
pub type JvmtiGetAllStackTracesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, max_frame_count: jint, stack_info_ptr: *mut *mut jvmtiStackInfo, thread_count_ptr: *mut jint) -> jvmtiError;
pub type JvmtiGetThreadListStackTracesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread_count: jint, thread_list: *const jthread, max_frame_count: jint, stack_info_ptr: *mut *mut jvmtiStackInfo) -> jvmtiError;
pub type JvmtiGetThreadLocalStorageFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread: jthread, data_ptr: *mut *mut c_void) -> jvmtiError;
pub type JvmtiSetThreadLocalStorageFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread: jthread, data: *const c_void) -> jvmtiError;
pub type JvmtiGetStackTraceFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread: jthread, start_depth: jint, max_frame_count: jint, frame_buffer: *mut jvmtiFrameInfo, count_ptr: *mut jint) -> jvmtiError;
pub type JvmtiSetEventCallbacksFn = unsafe extern "system" fn(env: *mut jvmtiEnv, callbacks: *const jvmtiEventCallbacks, size_of_callbacks: jint) -> jvmtiError;
pub type JvmtiDisposeEnvironmentFn = unsafe extern "system" fn(env: *mut jvmtiEnv) -> jvmtiError;
// The error code is taken as a plain integer: agents may pass any value.
pub type JvmtiGetErrorNameFn = unsafe extern "system" fn(env: *mut jvmtiEnv, error: u32, name_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiGetPhaseFn = unsafe extern "system" fn(env: *mut jvmtiEnv, phase_ptr: *mut jint) -> jvmtiError;
pub type JvmtiGetTimeFn = unsafe extern "system" fn(env: *mut jvmtiEnv, nanos_ptr: *mut jlong) -> jvmtiError;
pub type JvmtiGetPotentialCapabilitiesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *mut jvmtiCapabilities) -> jvmtiError;
pub type JvmtiAddCapabilitiesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *const jvmtiCapabilities) -> jvmtiError;
pub type JvmtiRelinquishCapabilitiesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *const jvmtiCapabilities) -> jvmtiError;
pub type JvmtiGetEnvironmentLocalStorageFn = unsafe extern "system" fn(env: *mut jvmtiEnv, data_ptr: *mut *mut c_void) -> jvmtiError;
pub type JvmtiSetEnvironmentLocalStorageFn = unsafe extern "system" fn(env: *mut jvmtiEnv, data: *const c_void) -> jvmtiError;

/// Shape of every slot the host does not serve. Such slots all point at one
/// stub that only reads the environment argument.
pub type JvmtiUnsupportedFn = unsafe extern "system" fn(env: *mut jvmtiEnv) -> jvmtiError;

// Reserved slots: 1, 105, 113, 117, 141
#[repr(C)]
#[derive(Copy, Clone)]
pub struct jvmtiInterface_1_ {
    // 1: RESERVED
    pub reserved1: *mut c_void,
    // 2: Set Event Notification Mode
    pub SetEventNotificationMode: Option<JvmtiSetEventNotificationModeFn>,
    // 3: Get All Modules
    pub GetAllModules: Option<JvmtiUnsupportedFn>,
    // 4: Get All Threads
    pub GetAllThreads: Option<JvmtiGetAllThreadsFn>,
    // 5: Suspend Thread
    pub SuspendThread: Option<JvmtiUnsupportedFn>,
    // 6: Resume Thread
    pub ResumeThread: Option<JvmtiUnsupportedFn>,
    // 7: Stop Thread
    pub StopThread: Option<JvmtiUnsupportedFn>,
    // 8: Interrupt Thread
    pub InterruptThread: Option<JvmtiInterruptThreadFn>,
    // 9: Get Thread Info
    pub GetThreadInfo: Option<JvmtiUnsupportedFn>,
    // 10: Get Owned Monitor Info
    pub GetOwnedMonitorInfo: Option<JvmtiUnsupportedFn>,
    // 11: Get Current Contended Monitor
    pub GetCurrentContendedMonitor: Option<JvmtiUnsupportedFn>,
    // 12: Run Agent Thread
    pub RunAgentThread: Option<JvmtiUnsupportedFn>,
    // 13: Get Top Thread Groups
    pub GetTopThreadGroups: Option<JvmtiUnsupportedFn>,
    // 14: Get Thread Group Info
    pub GetThreadGroupInfo: Option<JvmtiUnsupportedFn>,
    // 15: Get Thread Group Children
    pub GetThreadGroupChildren: Option<JvmtiUnsupportedFn>,
    // 16: Get Frame Count
    pub GetFrameCount: Option<JvmtiGetFrameCountFn>,
    // 17: Get Thread State
    pub GetThreadState: Option<JvmtiGetThreadStateFn>,
    // 18: Get Current Thread
    pub GetCurrentThread: Option<JvmtiGetCurrentThreadFn>,
    // 19: Get Frame Location
    pub GetFrameLocation: Option<JvmtiUnsupportedFn>,
    // 20: Notify Frame Pop
    pub NotifyFramePop: Option<JvmtiUnsupportedFn>,
    // 21: Get Local Variable - Object
    pub GetLocalObject: Option<JvmtiUnsupportedFn>,
    // 22: Get Local Variable - Int
    pub GetLocalInt: Option<JvmtiUnsupportedFn>,
    // 23: Get Local Variable - Long
    pub GetLocalLong: Option<JvmtiUnsupportedFn>,
    // 24: Get Local Variable - Float
    pub GetLocalFloat: Option<JvmtiUnsupportedFn>,
    // 25: Get Local Variable - Double
    pub GetLocalDouble: Option<JvmtiUnsupportedFn>,
    // 26: Set Local Variable - Object
    pub SetLocalObject: Option<JvmtiUnsupportedFn>,
    // 27: Set Local Variable - Int
    pub SetLocalInt: Option<JvmtiUnsupportedFn>,
    // 28: Set Local Variable - Long
    pub SetLocalLong: Option<JvmtiUnsupportedFn>,
    // 29: Set Local Variable - Float
    pub SetLocalFloat: Option<JvmtiUnsupportedFn>,
    // 30: Set Local Variable - Double
    pub SetLocalDouble: Option<JvmtiUnsupportedFn>,
    // 31: Create Raw Monitor
    pub CreateRawMonitor: Option<JvmtiCreateRawMonitorFn>,
    // 32: Destroy Raw Monitor
    pub DestroyRawMonitor: Option<JvmtiDestroyRawMonitorFn>,
    // 33: Raw Monitor Enter
    pub RawMonitorEnter: Option<JvmtiRawMonitorEnterFn>,
    // 34: Raw Monitor Exit
    pub RawMonitorExit: Option<JvmtiRawMonitorExitFn>,
    // 35: Raw Monitor Wait
    pub RawMonitorWait: Option<JvmtiRawMonitorWaitFn>,
    // 36: Raw Monitor Notify
    pub RawMonitorNotify: Option<JvmtiRawMonitorNotifyFn>,
    // 37: Raw Monitor Notify All
    pub RawMonitorNotifyAll: Option<JvmtiRawMonitorNotifyAllFn>,
    // 38: Set Breakpoint
    pub SetBreakpoint: Option<JvmtiUnsupportedFn>,
    // 39: Clear Breakpoint
    pub ClearBreakpoint: Option<JvmtiUnsupportedFn>,
    // 40: Get Named Module
    pub GetNamedModule: Option<JvmtiUnsupportedFn>,
    // 41: Set Field Access Watch
    pub SetFieldAccessWatch: Option<JvmtiUnsupportedFn>,
    // 42: Clear Field Access Watch
    pub ClearFieldAccessWatch: Option<JvmtiUnsupportedFn>,
    // 43: Set Field Modification Watch
    pub SetFieldModificationWatch: Option<JvmtiUnsupportedFn>,
    // 44: Clear Field Modification Watch
    pub ClearFieldModificationWatch: Option<JvmtiUnsupportedFn>,
    // 45: Is Modifiable Class
    pub IsModifiableClass: Option<JvmtiUnsupportedFn>,
    // 46: Allocate
    pub Allocate: Option<JvmtiAllocateFn>,
    // 47: Deallocate
    pub Deallocate: Option<JvmtiDeallocateFn>,
    // 48: Get Class Signature
    pub GetClassSignature: Option<JvmtiUnsupportedFn>,
    // 49: Get Class Status
    pub GetClassStatus: Option<JvmtiUnsupportedFn>,
    // 50: Get Source File Name
    pub GetSourceFileName: Option<JvmtiUnsupportedFn>,
    // 51: Get Class Modifiers
    pub GetClassModifiers: Option<JvmtiUnsupportedFn>,
    // 52: Get Class Methods
    pub GetClassMethods: Option<JvmtiUnsupportedFn>,
    // 53: Get Class Fields
    pub GetClassFields: Option<JvmtiUnsupportedFn>,
    // 54: Get Implemented Interfaces
    pub GetImplementedInterfaces: Option<JvmtiUnsupportedFn>,
    // 55: Is Interface
    pub IsInterface: Option<JvmtiUnsupportedFn>,
    // 56: Is Array Class
    pub IsArrayClass: Option<JvmtiUnsupportedFn>,
    // 57: Get Class Loader
    pub GetClassLoader: Option<JvmtiUnsupportedFn>,
    // 58: Get Object Hash Code
    pub GetObjectHashCode: Option<JvmtiUnsupportedFn>,
    // 59: Get Object Monitor Usage
    pub GetObjectMonitorUsage: Option<JvmtiUnsupportedFn>,
    // 60: Get Field Name (and Signature)
    pub GetFieldName: Option<JvmtiUnsupportedFn>,
    // 61: Get Field Declaring Class
    pub GetFieldDeclaringClass: Option<JvmtiUnsupportedFn>,
    // 62: Get Field Modifiers
    pub GetFieldModifiers: Option<JvmtiUnsupportedFn>,
    // 63: Is Field Synthetic
    pub IsFieldSynthetic: Option<JvmtiUnsupportedFn>,
    // 64: Get Method Name (and Signature)
    pub GetMethodName: Option<JvmtiUnsupportedFn>,
    // 65: Get Method Declaring Class
    pub GetMethodDeclaringClass: Option<JvmtiUnsupportedFn>,
    // 66: Get Method Modifiers
    pub GetMethodModifiers: Option<JvmtiUnsupportedFn>,
    // 67: Clear All Frame Pops (JDK 25+)
    pub ClearAllFramePops: Option<JvmtiUnsupportedFn>,
    // 68: Get Max Locals
    pub GetMaxLocals: Option<JvmtiUnsupportedFn>,
    // 69: Get Arguments Size
    pub GetArgumentsSize: Option<JvmtiUnsupportedFn>,
    // 70: Get Line Number Table
    pub GetLineNumberTable: Option<JvmtiUnsupportedFn>,
    // 71: Get Method Location
    pub GetMethodLocation: Option<JvmtiUnsupportedFn>,
    // 72: Get Local Variable Table
    pub GetLocalVariableTable: Option<JvmtiUnsupportedFn>,
    // 73: Set Native Method Prefix
    pub SetNativeMethodPrefix: Option<JvmtiUnsupportedFn>,
    // 74: Set Native Method Prefixes
    pub SetNativeMethodPrefixes: Option<JvmtiUnsupportedFn>,
    // 75: Get Bytecodes
    pub GetBytecodes: Option<JvmtiUnsupportedFn>,
    // 76: Is Method Native
    pub IsMethodNative: Option<JvmtiUnsupportedFn>,
    // 77: Is Method Synthetic
    pub IsMethodSynthetic: Option<JvmtiUnsupportedFn>,
    // 78: Get Loaded Classes
    pub GetLoadedClasses: Option<JvmtiUnsupportedFn>,
    // 79: Get Classloader Classes
    pub GetClassLoaderClasses: Option<JvmtiUnsupportedFn>,
    // 80: Pop Frame
    pub PopFrame: Option<JvmtiUnsupportedFn>,
    // 81: Force Early Return - Object
    pub ForceEarlyReturnObject: Option<JvmtiUnsupportedFn>,
    // 82: Force Early Return - Int
    pub ForceEarlyReturnInt: Option<JvmtiUnsupportedFn>,
    // 83: Force Early Return - Long
    pub ForceEarlyReturnLong: Option<JvmtiUnsupportedFn>,
    // 84: Force Early Return - Float
    pub ForceEarlyReturnFloat: Option<JvmtiUnsupportedFn>,
    // 85: Force Early Return - Double
    pub ForceEarlyReturnDouble: Option<JvmtiUnsupportedFn>,
    // 86: Force Early Return - Void
    pub ForceEarlyReturnVoid: Option<JvmtiUnsupportedFn>,
    // 87: Redefine Classes
    pub RedefineClasses: Option<JvmtiUnsupportedFn>,
    // 88: Get Version Number
    pub GetVersionNumber: Option<JvmtiGetVersionNumberFn>,
    // 89: Get Capabilities
    pub GetCapabilities: Option<JvmtiGetCapabilitiesFn>,
    // 90: Get Source Debug Extension
    pub GetSourceDebugExtension: Option<JvmtiUnsupportedFn>,
    // 91: Is Method Obsolete
    pub IsMethodObsolete: Option<JvmtiUnsupportedFn>,
    // 92: Suspend Thread List
    pub SuspendThreadList: Option<JvmtiUnsupportedFn>,
    // 93: Resume Thread List
    pub ResumeThreadList: Option<JvmtiUnsupportedFn>,
    // 94: Add Module Reads
    pub AddModuleReads: Option<JvmtiUnsupportedFn>,
    // 95: Add Module Exports
    pub AddModuleExports: Option<JvmtiUnsupportedFn>,
    // 96: Add Module Opens
    pub AddModuleOpens: Option<JvmtiUnsupportedFn>,
    // 97: Add Module Uses
    pub AddModuleUses: Option<JvmtiUnsupportedFn>,
    // 98: Add Module Provides
    pub AddModuleProvides: Option<JvmtiUnsupportedFn>,
    // 99: Is Modifiable Module
    pub IsModifiableModule: Option<JvmtiUnsupportedFn>,
    // 100: Get All Stack Traces
    pub GetAllStackTraces: Option<JvmtiGetAllStackTracesFn>,
    // 101: Get Thread List Stack Traces
    pub GetThreadListStackTraces: Option<JvmtiGetThreadListStackTracesFn>,
    // 102: Get Thread Local Storage
    pub GetThreadLocalStorage: Option<JvmtiGetThreadLocalStorageFn>,
    // 103: Set Thread Local Storage
    pub SetThreadLocalStorage: Option<JvmtiSetThreadLocalStorageFn>,
    // 104: Get Stack Trace
    pub GetStackTrace: Option<JvmtiGetStackTraceFn>,
    // 105: RESERVED
    pub reserved105: *mut c_void,
    // 106: Get Tag
    pub GetTag: Option<JvmtiUnsupportedFn>,
    // 107: Set Tag
    pub SetTag: Option<JvmtiUnsupportedFn>,
    // 108: Force Garbage Collection
    pub ForceGarbageCollection: Option<JvmtiUnsupportedFn>,
    // 109: Iterate Over Objects Reachable From Object
    pub IterateOverObjectsReachableFromObject: Option<JvmtiUnsupportedFn>,
    // 110: Iterate Over Reachable Objects
    pub IterateOverReachableObjects: Option<JvmtiUnsupportedFn>,
    // 111: Iterate Over Heap
    pub IterateOverHeap: Option<JvmtiUnsupportedFn>,
    // 112: Iterate Over Instances Of Class
    pub IterateOverInstancesOfClass: Option<JvmtiUnsupportedFn>,
    // 113: RESERVED
    pub reserved113: *mut c_void,
    // 114: Get Objects With Tags
    pub GetObjectsWithTags: Option<JvmtiUnsupportedFn>,
    // 115: Follow References
    pub FollowReferences: Option<JvmtiUnsupportedFn>,
    // 116: Iterate Through Heap
    pub IterateThroughHeap: Option<JvmtiUnsupportedFn>,
    // 117: RESERVED
    pub reserved117: *mut c_void,
    // 118: Suspend All Virtual Threads
    pub SuspendAllVirtualThreads: Option<JvmtiUnsupportedFn>,
    // 119: Resume All Virtual Threads
    pub ResumeAllVirtualThreads: Option<JvmtiUnsupportedFn>,
    // 120: Set JNI Function Table
    pub SetJNIFunctionTable: Option<JvmtiUnsupportedFn>,
    // 121: Get JNI Function Table
    pub GetJNIFunctionTable: Option<JvmtiUnsupportedFn>,
    // 122: Set Event Callbacks
    pub SetEventCallbacks: Option<JvmtiSetEventCallbacksFn>,
    // 123: Generate Events
    pub GenerateEvents: Option<JvmtiUnsupportedFn>,
    // 124: Get Extension Functions
    pub GetExtensionFunctions: Option<JvmtiUnsupportedFn>,
    // 125: Get Extension Events
    pub GetExtensionEvents: Option<JvmtiUnsupportedFn>,
    // 126: Set Extension Event Callback
    pub SetExtensionEventCallback: Option<JvmtiUnsupportedFn>,
    // 127: Dispose Environment
    pub DisposeEnvironment: Option<JvmtiDisposeEnvironmentFn>,
    // 128: Get Error Name
    pub GetErrorName: Option<JvmtiGetErrorNameFn>,
    // 129: Get JLocation Format
    pub GetJLocationFormat: Option<JvmtiUnsupportedFn>,
    // 130: Get System Properties
    pub GetSystemProperties: Option<JvmtiUnsupportedFn>,
    // 131: Get System Property
    pub GetSystemProperty: Option<JvmtiUnsupportedFn>,
    // 132: Set System Property
    pub SetSystemProperty: Option<JvmtiUnsupportedFn>,
    // 133: Get Phase
    pub GetPhase: Option<JvmtiGetPhaseFn>,
    // 134: Get Current Thread CPU Timer Information
    pub GetCurrentThreadCpuTimerInfo: Option<JvmtiUnsupportedFn>,
    // 135: Get Current Thread CPU Time
    pub GetCurrentThreadCpuTime: Option<JvmtiUnsupportedFn>,
    // 136: Get Thread CPU Timer Information
    pub GetThreadCpuTimerInfo: Option<JvmtiUnsupportedFn>,
    // 137: Get Thread CPU Time
    pub GetThreadCpuTime: Option<JvmtiUnsupportedFn>,
    // 138: Get Timer Information
    pub GetTimerInfo: Option<JvmtiUnsupportedFn>,
    // 139: Get Time
    pub GetTime: Option<JvmtiGetTimeFn>,
    // 140: Get Potential Capabilities
    pub GetPotentialCapabilities: Option<JvmtiGetPotentialCapabilitiesFn>,
    // 141: RESERVED
    pub reserved141: *mut c_void,
    // 142: Add Capabilities
    pub AddCapabilities: Option<JvmtiAddCapabilitiesFn>,
    // 143: Relinquish Capabilities
    pub RelinquishCapabilities: Option<JvmtiRelinquishCapabilitiesFn>,
    // 144: Get Available Processors
    pub GetAvailableProcessors: Option<JvmtiUnsupportedFn>,
    // 145: Get Class Version Numbers
    pub GetClassVersionNumbers: Option<JvmtiUnsupportedFn>,
    // 146: Get Constant Pool
    pub GetConstantPool: Option<JvmtiUnsupportedFn>,
    // 147: Get Environment Local Storage
    pub GetEnvironmentLocalStorage: Option<JvmtiGetEnvironmentLocalStorageFn>,
    // 148: Set Environment Local Storage
    pub SetEnvironmentLocalStorage: Option<JvmtiSetEnvironmentLocalStorageFn>,
    // 149: Add To Bootstrap Class Loader Search
    pub AddToBootstrapClassLoaderSearch: Option<JvmtiUnsupportedFn>,
    // 150: Set Verbose Flag
    pub SetVerboseFlag: Option<JvmtiUnsupportedFn>,
    // 151: Add To System Class Loader Search
    pub AddToSystemClassLoaderSearch: Option<JvmtiUnsupportedFn>,
    // 152: Retransform Classes
    pub RetransformClasses: Option<JvmtiUnsupportedFn>,
    // 153: Get Owned Monitor Stack Depth Info
    pub GetOwnedMonitorStackDepthInfo: Option<JvmtiUnsupportedFn>,
    // 154: Get Object Size
    pub GetObjectSize: Option<JvmtiUnsupportedFn>,
    // 155: Get Local Instance
    pub GetLocalInstance: Option<JvmtiUnsupportedFn>,
    // 156: Set Heap Sampling Interval
    pub SetHeapSamplingInterval: Option<JvmtiUnsupportedFn>,
}

// Function pointers and null reserved slots only; the table is never mutated.
unsafe impl Sync for jvmtiInterface_1_ {}

impl jvmtiInterface_1_ {
    /// A table whose every function slot holds `stub`, except the slots the
    /// host serves, which are left empty for the caller to fill.
    pub const fn unsupported(stub: JvmtiUnsupportedFn) -> Self {
        jvmtiInterface_1_ {
            reserved1: ptr::null_mut(),
            SetEventNotificationMode: None,
            GetAllModules: Some(stub),
            GetAllThreads: None,
            SuspendThread: Some(stub),
            ResumeThread: Some(stub),
            StopThread: Some(stub),
            InterruptThread: None,
            GetThreadInfo: Some(stub),
            GetOwnedMonitorInfo: Some(stub),
            GetCurrentContendedMonitor: Some(stub),
            RunAgentThread: Some(stub),
            GetTopThreadGroups: Some(stub),
            GetThreadGroupInfo: Some(stub),
            GetThreadGroupChildren: Some(stub),
            GetFrameCount: None,
            GetThreadState: None,
            GetCurrentThread: None,
            GetFrameLocation: Some(stub),
            NotifyFramePop: Some(stub),
            GetLocalObject: Some(stub),
            GetLocalInt: Some(stub),
            GetLocalLong: Some(stub),
            GetLocalFloat: Some(stub),
            GetLocalDouble: Some(stub),
            SetLocalObject: Some(stub),
            SetLocalInt: Some(stub),
            SetLocalLong: Some(stub),
            SetLocalFloat: Some(stub),
            SetLocalDouble: Some(stub),
            CreateRawMonitor: None,
            DestroyRawMonitor: None,
            RawMonitorEnter: None,
            RawMonitorExit: None,
            RawMonitorWait: None,
            RawMonitorNotify: None,
            RawMonitorNotifyAll: None,
            SetBreakpoint: Some(stub),
            ClearBreakpoint: Some(stub),
            GetNamedModule: Some(stub),
            SetFieldAccessWatch: Some(stub),
            ClearFieldAccessWatch: Some(stub),
            SetFieldModificationWatch: Some(stub),
            ClearFieldModificationWatch: Some(stub),
            IsModifiableClass: Some(stub),
            Allocate: None,
            Deallocate: None,
            GetClassSignature: Some(stub),
            GetClassStatus: Some(stub),
            GetSourceFileName: Some(stub),
            GetClassModifiers: Some(stub),
            GetClassMethods: Some(stub),
            GetClassFields: Some(stub),
            GetImplementedInterfaces: Some(stub),
            IsInterface: Some(stub),
            IsArrayClass: Some(stub),
            GetClassLoader: Some(stub),
            GetObjectHashCode: Some(stub),
            GetObjectMonitorUsage: Some(stub),
            GetFieldName: Some(stub),
            GetFieldDeclaringClass: Some(stub),
            GetFieldModifiers: Some(stub),
            IsFieldSynthetic: Some(stub),
            GetMethodName: Some(stub),
            GetMethodDeclaringClass: Some(stub),
            GetMethodModifiers: Some(stub),
            ClearAllFramePops: Some(stub),
            GetMaxLocals: Some(stub),
            GetArgumentsSize: Some(stub),
            GetLineNumberTable: Some(stub),
            GetMethodLocation: Some(stub),
            GetLocalVariableTable: Some(stub),
            SetNativeMethodPrefix: Some(stub),
            SetNativeMethodPrefixes: Some(stub),
            GetBytecodes: Some(stub),
            IsMethodNative: Some(stub),
            IsMethodSynthetic: Some(stub),
            GetLoadedClasses: Some(stub),
            GetClassLoaderClasses: Some(stub),
            PopFrame: Some(stub),
            ForceEarlyReturnObject: Some(stub),
            ForceEarlyReturnInt: Some(stub),
            ForceEarlyReturnLong: Some(stub),
            ForceEarlyReturnFloat: Some(stub),
            ForceEarlyReturnDouble: Some(stub),
            ForceEarlyReturnVoid: Some(stub),
            RedefineClasses: Some(stub),
            GetVersionNumber: None,
            GetCapabilities: None,
            GetSourceDebugExtension: Some(stub),
            IsMethodObsolete: Some(stub),
            SuspendThreadList: Some(stub),
            ResumeThreadList: Some(stub),
            AddModuleReads: Some(stub),
            AddModuleExports: Some(stub),
            AddModuleOpens: Some(stub),
            AddModuleUses: Some(stub),
            AddModuleProvides: Some(stub),
            IsModifiableModule: Some(stub),
            GetAllStackTraces: None,
            GetThreadListStackTraces: None,
            GetThreadLocalStorage: None,
            SetThreadLocalStorage: None,
            GetStackTrace: None,
            reserved105: ptr::null_mut(),
            GetTag: Some(stub),
            SetTag: Some(stub),
            ForceGarbageCollection: Some(stub),
            IterateOverObjectsReachableFromObject: Some(stub),
            IterateOverReachableObjects: Some(stub),
            IterateOverHeap: Some(stub),
            IterateOverInstancesOfClass: Some(stub),
            reserved113: ptr::null_mut(),
            GetObjectsWithTags: Some(stub),
            FollowReferences: Some(stub),
            IterateThroughHeap: Some(stub),
            reserved117: ptr::null_mut(),
            SuspendAllVirtualThreads: Some(stub),
            ResumeAllVirtualThreads: Some(stub),
            SetJNIFunctionTable: Some(stub),
            GetJNIFunctionTable: Some(stub),
            SetEventCallbacks: None,
            GenerateEvents: Some(stub),
            GetExtensionFunctions: Some(stub),
            GetExtensionEvents: Some(stub),
            SetExtensionEventCallback: Some(stub),
            DisposeEnvironment: None,
            GetErrorName: None,
            GetJLocationFormat: Some(stub),
            GetSystemProperties: Some(stub),
            GetSystemProperty: Some(stub),
            SetSystemProperty: Some(stub),
            GetPhase: None,
            GetCurrentThreadCpuTimerInfo: Some(stub),
            GetCurrentThreadCpuTime: Some(stub),
            GetThreadCpuTimerInfo: Some(stub),
            GetThreadCpuTime: Some(stub),
            GetTimerInfo: Some(stub),
            GetTime: None,
            GetPotentialCapabilities: None,
            reserved141: ptr::null_mut(),
            AddCapabilities: None,
            RelinquishCapabilities: None,
            GetAvailableProcessors: Some(stub),
            GetClassVersionNumbers: Some(stub),
            GetConstantPool: Some(stub),
            GetEnvironmentLocalStorage: None,
            SetEnvironmentLocalStorage: None,
            AddToBootstrapClassLoaderSearch: Some(stub),
            SetVerboseFlag: Some(stub),
            AddToSystemClassLoaderSearch: Some(stub),
            RetransformClasses: Some(stub),
            GetOwnedMonitorStackDepthInfo: Some(stub),
            GetObjectSize: Some(stub),
            GetLocalInstance: Some(stub),
            SetHeapSamplingInterval: Some(stub),
        }
    }
}

// --- Environment ---

/// What an agent receives as `jvmtiEnv*`: a struct whose first field is the
/// function table pointer. The host appends its own fields after it.
#[repr(C)]
pub struct jvmtiEnv {
    pub functions: *const jvmtiInterface_1_,
}

// --- Event Callbacks ---

pub type JvmtiVMInitFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, thread: jthread);
pub type JvmtiVMDeathFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv);
pub type JvmtiVMStartFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv);
pub type JvmtiThreadStartFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, thread: jthread);
pub type JvmtiThreadEndFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, thread: jthread);
pub type JvmtiDataDumpRequestFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv);
pub type JvmtiMonitorWaitFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, thread: jthread, object: jobject, timeout: jlong);
pub type JvmtiMonitorWaitedFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, thread: jthread, object: jobject, timed_out: jboolean);
pub type JvmtiMonitorContendedEnterFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, thread: jthread, object: jobject);
pub type JvmtiMonitorContendedEnteredFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, thread: jthread, object: jobject);
pub type JvmtiGarbageCollectionStartFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv);
pub type JvmtiGarbageCollectionFinishFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv);

/// Slot type for events this VM never posts, and for the reserved slots.
/// The pointer is stored when an agent registers it but never called.
pub type jvmtiEventReserved = unsafe extern "system" fn();

/// One slot per event number from 50 to 88, in jvmti.h order.
#[repr(C)]
#[derive(Copy, Clone, Default, Debug)]
pub struct jvmtiEventCallbacks {
    pub VMInit: Option<JvmtiVMInitFn>,
    pub VMDeath: Option<JvmtiVMDeathFn>,
    pub ThreadStart: Option<JvmtiThreadStartFn>,
    pub ThreadEnd: Option<JvmtiThreadEndFn>,
    pub ClassFileLoadHook: Option<jvmtiEventReserved>,
    pub ClassLoad: Option<jvmtiEventReserved>,
    pub ClassPrepare: Option<jvmtiEventReserved>,
    pub VMStart: Option<JvmtiVMStartFn>,
    pub Exception: Option<jvmtiEventReserved>,
    pub ExceptionCatch: Option<jvmtiEventReserved>,
    pub SingleStep: Option<jvmtiEventReserved>,
    pub FramePop: Option<jvmtiEventReserved>,
    pub Breakpoint: Option<jvmtiEventReserved>,
    pub FieldAccess: Option<jvmtiEventReserved>,
    pub FieldModification: Option<jvmtiEventReserved>,
    pub MethodEntry: Option<jvmtiEventReserved>,
    pub MethodExit: Option<jvmtiEventReserved>,
    pub NativeMethodBind: Option<jvmtiEventReserved>,
    pub CompiledMethodLoad: Option<jvmtiEventReserved>,
    pub CompiledMethodUnload: Option<jvmtiEventReserved>,
    pub DynamicCodeGenerated: Option<jvmtiEventReserved>,
    pub DataDumpRequest: Option<JvmtiDataDumpRequestFn>,
    pub reserved72: Option<jvmtiEventReserved>,
    pub MonitorWait: Option<JvmtiMonitorWaitFn>,
    pub MonitorWaited: Option<JvmtiMonitorWaitedFn>,
    pub MonitorContendedEnter: Option<JvmtiMonitorContendedEnterFn>,
    pub MonitorContendedEntered: Option<JvmtiMonitorContendedEnteredFn>,
    pub reserved77: Option<jvmtiEventReserved>,
    pub reserved78: Option<jvmtiEventReserved>,
    pub reserved79: Option<jvmtiEventReserved>,
    pub ResourceExhausted: Option<jvmtiEventReserved>,
    pub GarbageCollectionStart: Option<JvmtiGarbageCollectionStartFn>,
    pub GarbageCollectionFinish: Option<JvmtiGarbageCollectionFinishFn>,
    pub ObjectFree: Option<jvmtiEventReserved>,
    pub VMObjectAlloc: Option<jvmtiEventReserved>,
    pub reserved85: Option<jvmtiEventReserved>,
    pub SampledObjectAlloc: Option<jvmtiEventReserved>,
    pub VirtualThreadStart: Option<jvmtiEventReserved>,
    pub VirtualThreadEnd: Option<jvmtiEventReserved>,
}

impl jvmtiEventCallbacks {
    /// Number of slots; one per event number in the event range.
    pub const SLOTS: usize = (JVMTI_MAX_EVENT_TYPE_VAL - JVMTI_MIN_EVENT_TYPE_VAL + 1) as usize;

    /// Whether the slot for `event` holds a callback. Out-of-range numbers
    /// report false.
    pub fn is_bound(&self, event: u32) -> bool {
        if !(JVMTI_MIN_EVENT_TYPE_VAL..=JVMTI_MAX_EVENT_TYPE_VAL).contains(&event) {
            return false;
        }
        let index = (event - JVMTI_MIN_EVENT_TYPE_VAL) as usize;
        // SAFETY: the struct is SLOTS nullable fn pointers, all pointer-sized
        // and laid out in event order, so it can be read as pointer words.
        let words = unsafe {
            std::slice::from_raw_parts(self as *const Self as *const *const c_void, Self::SLOTS)
        };
        !words[index].is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callbacks_table_has_one_slot_per_event_number() {
        assert_eq!(
            std::mem::size_of::<jvmtiEventCallbacks>(),
            jvmtiEventCallbacks::SLOTS * std::mem::size_of::<*const c_void>()
        );
    }

    #[test]
    fn error_lookup_and_names() {
        assert_eq!(jvmtiError::from_raw(116), Some(jvmtiError::INVALID_ENVIRONMENT));
        assert_eq!(jvmtiError::from_raw(1), None);
        assert_eq!(jvmtiError::NOT_MONITOR_OWNER.name(), "JVMTI_ERROR_NOT_MONITOR_OWNER");
    }

    #[test]
    fn capability_word_round_trip_keeps_high_word() {
        let caps = jvmtiCapabilities::from_word(1 << 44 | 1);
        assert!(caps.get_bit(0));
        assert!(caps.get_bit(44));
        assert_eq!(caps.to_word(), 1 << 44 | 1);
    }
}
