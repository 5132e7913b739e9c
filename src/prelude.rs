//! Common imports for embedding the host.
//!
//! Covers what a VM needs to build a host and post events. The raw ABI types
//! stay under [`sys`](crate::sys).

pub use crate::capabilities::{Capability, CapabilitySet, Phase};
pub use crate::config::JvmtiConfig;
pub use crate::error::{Error, Result};
pub use crate::events::{Event, EventKind};
pub use crate::host::JvmtiHost;
pub use crate::monitor::RawMonitorId;
pub use crate::registry::Environment;
pub use crate::runtime::{FrameKind, HostRuntime, StackFrame};
pub use crate::sys::{jni, jvmti};
