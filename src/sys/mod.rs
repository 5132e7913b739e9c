// jvmti-host/src/sys/mod.rs
//
// Raw ABI definitions shared with agents.

pub mod jni;
pub mod jvmti;
