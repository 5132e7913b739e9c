//! C-ABI entry points and the function table agents call them through.
//!
//! Each function resolves the agent's `jvmtiEnv*`, checks its pointer
//! arguments and forwards to [`JvmtiHost`]. Output pointers are written only
//! when the call succeeds, except where noted. [`DEFAULT_FUNCTIONS`] is the
//! table every new environment points at; slots without an entry point here
//! answer `JVMTI_ERROR_ACCESS_DENIED`.

#![allow(non_snake_case)]

use std::ffi::{c_char, c_void, CStr};
use std::mem;
use std::ptr;

use crate::capabilities::CapabilitySet;
use crate::error::{status, Error, Result};
use crate::host::JvmtiHost;
use crate::monitor::RawMonitorId;
use crate::registry::Environment;
use crate::sys::jni::{jint, jlong, jthread};
use crate::sys::jvmti::{
    jrawMonitorID, jvmtiCapabilities, jvmtiEnv, jvmtiError, jvmtiEventCallbacks, jvmtiFrameInfo,
    jvmtiInterface_1_, jvmtiStackInfo,
};

pub static DEFAULT_FUNCTIONS: jvmtiInterface_1_ = jvmtiInterface_1_ {
    SetEventNotificationMode: Some(SetEventNotificationMode),
    GetAllThreads: Some(GetAllThreads),
    InterruptThread: Some(InterruptThread),
    GetFrameCount: Some(GetFrameCount),
    GetThreadState: Some(GetThreadState),
    GetCurrentThread: Some(GetCurrentThread),
    CreateRawMonitor: Some(CreateRawMonitor),
    DestroyRawMonitor: Some(DestroyRawMonitor),
    RawMonitorEnter: Some(RawMonitorEnter),
    RawMonitorExit: Some(RawMonitorExit),
    RawMonitorWait: Some(RawMonitorWait),
    RawMonitorNotify: Some(RawMonitorNotify),
    RawMonitorNotifyAll: Some(RawMonitorNotifyAll),
    Allocate: Some(Allocate),
    Deallocate: Some(Deallocate),
    GetVersionNumber: Some(GetVersionNumber),
    GetCapabilities: Some(GetCapabilities),
    GetAllStackTraces: Some(GetAllStackTraces),
    GetThreadListStackTraces: Some(GetThreadListStackTraces),
    GetThreadLocalStorage: Some(GetThreadLocalStorage),
    SetThreadLocalStorage: Some(SetThreadLocalStorage),
    GetStackTrace: Some(GetStackTrace),
    SetEventCallbacks: Some(SetEventCallbacks),
    DisposeEnvironment: Some(DisposeEnvironment),
    GetErrorName: Some(GetErrorName),
    GetPhase: Some(GetPhase),
    GetTime: Some(GetTime),
    GetPotentialCapabilities: Some(GetPotentialCapabilities),
    AddCapabilities: Some(AddCapabilities),
    RelinquishCapabilities: Some(RelinquishCapabilities),
    GetEnvironmentLocalStorage: Some(GetEnvironmentLocalStorage),
    SetEnvironmentLocalStorage: Some(SetEnvironmentLocalStorage),
    ..jvmtiInterface_1_::unsupported(Unsupported)
};

/// Runs `op` against the environment behind `jvmti_env` and its host.
unsafe fn with_env(
    jvmti_env: *mut jvmtiEnv,
    op: impl FnOnce(&Environment, &JvmtiHost) -> Result<()>,
) -> jvmtiError {
    let result = Environment::from_external(jvmti_env).and_then(|env| {
        let host = env.host().ok_or(Error::InvalidEnvironment)?;
        op(env, &host)
    });
    status(result)
}

fn non_null<T>(ptr: *const T) -> Result<()> {
    if ptr.is_null() {
        Err(Error::NullPointer)
    } else {
        Ok(())
    }
}

// =============================================================================
// General
// =============================================================================

/// Shared by every function the host does not provide. Only the environment
/// argument is read.
pub unsafe extern "system" fn Unsupported(jvmti_env: *mut jvmtiEnv) -> jvmtiError {
    with_env(jvmti_env, |_, _| Err(Error::AccessDenied))
}

pub unsafe extern "system" fn Allocate(jvmti_env: *mut jvmtiEnv, size: jlong, mem_ptr: *mut *mut u8) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(mem_ptr)?;
        match host.allocate(env, size) {
            Ok(mem) => {
                *mem_ptr = mem;
                Ok(())
            }
            Err(err) => {
                // Agents may test the pointer instead of the status.
                *mem_ptr = ptr::null_mut();
                Err(err)
            }
        }
    })
}

pub unsafe extern "system" fn Deallocate(jvmti_env: *mut jvmtiEnv, mem: *mut u8) -> jvmtiError {
    with_env(jvmti_env, |env, host| host.deallocate(env, mem))
}

pub unsafe extern "system" fn GetPhase(jvmti_env: *mut jvmtiEnv, phase_ptr: *mut jint) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(phase_ptr)?;
        *phase_ptr = host.phase(env)?.to_raw();
        Ok(())
    })
}

pub unsafe extern "system" fn GetVersionNumber(jvmti_env: *mut jvmtiEnv, version_ptr: *mut jint) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(version_ptr)?;
        *version_ptr = host.version_number(env)?;
        Ok(())
    })
}

pub unsafe extern "system" fn GetTime(jvmti_env: *mut jvmtiEnv, nanos_ptr: *mut jlong) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(nanos_ptr)?;
        *nanos_ptr = host.time(env)?;
        Ok(())
    })
}

/// Writes a NUL-terminated `JVMTI_ERROR_*` string the agent frees with
/// [`Deallocate`].
pub unsafe extern "system" fn GetErrorName(
    jvmti_env: *mut jvmtiEnv,
    error: u32,
    name_ptr: *mut *mut c_char,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(name_ptr)?;
        let name = host.error_name(env, error)?;
        let mem = match host.allocate(env, name.len() as jlong + 1) {
            Ok(mem) => mem,
            Err(err) => {
                *name_ptr = ptr::null_mut();
                return Err(err);
            }
        };
        ptr::copy_nonoverlapping(name.as_ptr(), mem, name.len());
        *mem.add(name.len()) = 0;
        *name_ptr = mem as *mut c_char;
        Ok(())
    })
}

pub unsafe extern "system" fn DisposeEnvironment(jvmti_env: *mut jvmtiEnv) -> jvmtiError {
    with_env(jvmti_env, |env, host| host.dispose_environment(env))
}

pub unsafe extern "system" fn SetEnvironmentLocalStorage(jvmti_env: *mut jvmtiEnv, data: *const c_void) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        host.set_environment_local_storage(env, data as *mut c_void)
    })
}

pub unsafe extern "system" fn GetEnvironmentLocalStorage(
    jvmti_env: *mut jvmtiEnv,
    data_ptr: *mut *mut c_void,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(data_ptr)?;
        *data_ptr = host.environment_local_storage(env)?;
        Ok(())
    })
}

// =============================================================================
// Capabilities
// =============================================================================

pub unsafe extern "system" fn GetPotentialCapabilities(
    jvmti_env: *mut jvmtiEnv,
    capabilities_ptr: *mut jvmtiCapabilities,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(capabilities_ptr)?;
        *capabilities_ptr = host.potential_capabilities(env)?.into();
        Ok(())
    })
}

pub unsafe extern "system" fn GetCapabilities(
    jvmti_env: *mut jvmtiEnv,
    capabilities_ptr: *mut jvmtiCapabilities,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(capabilities_ptr)?;
        *capabilities_ptr = host.capabilities(env)?.into();
        Ok(())
    })
}

pub unsafe extern "system" fn AddCapabilities(
    jvmti_env: *mut jvmtiEnv,
    capabilities_ptr: *const jvmtiCapabilities,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(capabilities_ptr)?;
        host.add_capabilities(env, CapabilitySet::from(*capabilities_ptr))
    })
}

pub unsafe extern "system" fn RelinquishCapabilities(
    jvmti_env: *mut jvmtiEnv,
    capabilities_ptr: *const jvmtiCapabilities,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(capabilities_ptr)?;
        host.relinquish_capabilities(env, CapabilitySet::from(*capabilities_ptr))
    })
}

// =============================================================================
// Events
// =============================================================================

/// Installs the first `size_of_callbacks` bytes of `callbacks`; slots past
/// that are cleared. A null table clears every slot.
pub unsafe extern "system" fn SetEventCallbacks(
    jvmti_env: *mut jvmtiEnv,
    callbacks: *const jvmtiEventCallbacks,
    size_of_callbacks: jint,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        if size_of_callbacks <= 0 {
            return Err(Error::IllegalArgument);
        }
        if callbacks.is_null() {
            return host.set_event_callbacks(env, None);
        }
        let mut table = jvmtiEventCallbacks::default();
        let len = (size_of_callbacks as usize).min(mem::size_of::<jvmtiEventCallbacks>());
        ptr::copy_nonoverlapping(
            callbacks as *const u8,
            &mut table as *mut jvmtiEventCallbacks as *mut u8,
            len,
        );
        host.set_event_callbacks(env, Some(&table))
    })
}

/// Thread-filtered enablement is not supported: `event_thread` must be null.
pub unsafe extern "system" fn SetEventNotificationMode(
    jvmti_env: *mut jvmtiEnv,
    mode: jint,
    event_type: u32,
    event_thread: jthread,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        host.set_event_notification_mode(env, mode, event_type, event_thread)
    })
}

// =============================================================================
// Raw monitors
// =============================================================================

pub unsafe extern "system" fn CreateRawMonitor(
    jvmti_env: *mut jvmtiEnv,
    name: *const c_char,
    monitor_ptr: *mut jrawMonitorID,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(name)?;
        non_null(monitor_ptr)?;
        let name = CStr::from_ptr(name).to_string_lossy();
        *monitor_ptr = host.create_raw_monitor(env, &name)?.to_raw();
        Ok(())
    })
}

pub unsafe extern "system" fn DestroyRawMonitor(jvmti_env: *mut jvmtiEnv, monitor: jrawMonitorID) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        host.destroy_raw_monitor(env, RawMonitorId::from_raw(monitor)?)
    })
}

pub unsafe extern "system" fn RawMonitorEnter(jvmti_env: *mut jvmtiEnv, monitor: jrawMonitorID) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        host.raw_monitor_enter(env, RawMonitorId::from_raw(monitor)?)
    })
}

pub unsafe extern "system" fn RawMonitorExit(jvmti_env: *mut jvmtiEnv, monitor: jrawMonitorID) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        host.raw_monitor_exit(env, RawMonitorId::from_raw(monitor)?)
    })
}

pub unsafe extern "system" fn RawMonitorWait(
    jvmti_env: *mut jvmtiEnv,
    monitor: jrawMonitorID,
    millis: jlong,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        host.raw_monitor_wait(env, RawMonitorId::from_raw(monitor)?, millis)
    })
}

pub unsafe extern "system" fn RawMonitorNotify(jvmti_env: *mut jvmtiEnv, monitor: jrawMonitorID) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        host.raw_monitor_notify(env, RawMonitorId::from_raw(monitor)?)
    })
}

pub unsafe extern "system" fn RawMonitorNotifyAll(jvmti_env: *mut jvmtiEnv, monitor: jrawMonitorID) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        host.raw_monitor_notify_all(env, RawMonitorId::from_raw(monitor)?)
    })
}

// =============================================================================
// Stacks and threads
// =============================================================================

pub unsafe extern "system" fn GetStackTrace(
    jvmti_env: *mut jvmtiEnv,
    thread: jthread,
    start_depth: jint,
    max_frame_count: jint,
    frame_buffer: *mut jvmtiFrameInfo,
    count_ptr: *mut jint,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        if max_frame_count < 0 {
            return Err(Error::IllegalArgument);
        }
        non_null(frame_buffer)?;
        non_null(count_ptr)?;
        let out = std::slice::from_raw_parts_mut(frame_buffer, max_frame_count as usize);
        let written = host.stack_trace_into(env, thread, start_depth, out)?;
        *count_ptr = written as jint;
        Ok(())
    })
}

/// The returned block is one allocation; the agent frees it with a single
/// [`Deallocate`].
pub unsafe extern "system" fn GetAllStackTraces(
    jvmti_env: *mut jvmtiEnv,
    max_frame_count: jint,
    stack_info_ptr: *mut *mut jvmtiStackInfo,
    thread_count_ptr: *mut jint,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(stack_info_ptr)?;
        non_null(thread_count_ptr)?;
        let block = host.all_stack_traces(env, max_frame_count)?;
        *thread_count_ptr = block.len() as jint;
        *stack_info_ptr = block.into_raw();
        Ok(())
    })
}

pub unsafe extern "system" fn GetThreadListStackTraces(
    jvmti_env: *mut jvmtiEnv,
    thread_count: jint,
    thread_list: *const jthread,
    max_frame_count: jint,
    stack_info_ptr: *mut *mut jvmtiStackInfo,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        if thread_count < 0 {
            return Err(Error::IllegalArgument);
        }
        non_null(thread_list)?;
        non_null(stack_info_ptr)?;
        let threads = std::slice::from_raw_parts(thread_list, thread_count as usize);
        let block = host.thread_list_stack_traces(env, threads, max_frame_count)?;
        *stack_info_ptr = block.into_raw();
        Ok(())
    })
}

pub unsafe extern "system" fn GetFrameCount(jvmti_env: *mut jvmtiEnv, thread: jthread, count_ptr: *mut jint) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(count_ptr)?;
        *count_ptr = host.frame_count(env, thread)?;
        Ok(())
    })
}

pub unsafe extern "system" fn GetThreadState(jvmti_env: *mut jvmtiEnv, thread: jthread, state_ptr: *mut jint) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(state_ptr)?;
        *state_ptr = host.thread_state(env, thread)?;
        Ok(())
    })
}

pub unsafe extern "system" fn GetCurrentThread(jvmti_env: *mut jvmtiEnv, thread_ptr: *mut jthread) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(thread_ptr)?;
        *thread_ptr = host.current_thread(env)?;
        Ok(())
    })
}

/// Writes a [`Deallocate`]-able array of every live thread.
pub unsafe extern "system" fn GetAllThreads(
    jvmti_env: *mut jvmtiEnv,
    threads_count_ptr: *mut jint,
    threads_ptr: *mut *mut jthread,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(threads_count_ptr)?;
        non_null(threads_ptr)?;
        let threads = host.all_threads(env)?;
        let bytes = threads
            .len()
            .checked_mul(mem::size_of::<jthread>())
            .ok_or(Error::OutOfMemory)?;
        let out = host.allocate(env, bytes as jlong)? as *mut jthread;
        if !threads.is_empty() {
            ptr::copy_nonoverlapping(threads.as_ptr(), out, threads.len());
        }
        *threads_count_ptr = threads.len() as jint;
        *threads_ptr = out;
        Ok(())
    })
}

pub unsafe extern "system" fn InterruptThread(jvmti_env: *mut jvmtiEnv, thread: jthread) -> jvmtiError {
    with_env(jvmti_env, |env, host| host.interrupt_thread(env, thread))
}

pub unsafe extern "system" fn SetThreadLocalStorage(
    jvmti_env: *mut jvmtiEnv,
    thread: jthread,
    data: *const c_void,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        host.set_thread_local_storage(env, thread, data as *mut c_void)
    })
}

pub unsafe extern "system" fn GetThreadLocalStorage(
    jvmti_env: *mut jvmtiEnv,
    thread: jthread,
    data_ptr: *mut *mut c_void,
) -> jvmtiError {
    with_env(jvmti_env, |env, host| {
        non_null(data_ptr)?;
        *data_ptr = host.thread_local_storage(env, thread)?;
        Ok(())
    })
}
