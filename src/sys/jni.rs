// jvmti-host/src/sys/jni.rs
//
// The slice of the JNI ABI that crosses the tool-interface boundary.
//
// The host never calls through the JNI function table; it only hands the
// current thread's `JNIEnv*` to agent callbacks and receives thread and
// method handles from the runtime. The table is therefore opaque here.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::c_void;

// =============================================================================
// Primitive Types
// =============================================================================

pub type jint = i32;
pub type jlong = i64;
pub type jboolean = u8;

// =============================================================================
// Reference Types (opaque pointers)
// =============================================================================

pub type jobject = *mut c_void;
pub type jthread = jobject;

// =============================================================================
// ID Types (opaque identifiers)
// =============================================================================

pub type jmethodID = *mut c_void;

// =============================================================================
// Constants
// =============================================================================

pub const JNI_TRUE: jboolean = 1;
pub const JNI_FALSE: jboolean = 0;

// =============================================================================
// JNIEnv
// =============================================================================

/// The JNI function table. Owned and populated by the runtime.
#[repr(C)]
pub struct JNINativeInterface_ {
    _opaque: [u8; 0],
}

/// `JNIEnv` is a pointer to the function table, exactly as in `jni.h`.
pub type JNIEnv = *const JNINativeInterface_;
