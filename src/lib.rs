//! # jvmti-host
//!
//! The VM side of the JVM Tool Interface: what a VM needs in order to hand
//! `jvmtiEnv*` handles to agents and keep its promises to them.
//!
//! - Capability negotiation across environments, with one-at-a-time
//!   ("solo") and `OnLoad`-only capabilities
//! - A registry of environments that can be walked while agents dispose
//!   themselves from inside callbacks
//! - Per-environment event enablement and callback dispatch
//! - Raw monitors with recursive ownership, wait and notify
//! - Stack trace snapshots taken while the VM is quiesced
//!
//! ## Quick Start
//!
//! The embedding VM implements [`HostRuntime`] once and builds a host:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use jvmti_host::prelude::*;
//!
//! let config = JvmtiConfig::from_options("max_stack_depth=512,monitor_capacity=32")?;
//! let host = JvmtiHost::new(config, Arc::new(MyRuntime::new()));
//!
//! // Attach an agent during OnLoad.
//! let env = host.create_environment()?;
//! host.add_capabilities(&env, CapabilitySet::of(&[Capability::GenerateGarbageCollectionEvents]))?;
//! host.set_event_callbacks(&env, Some(&callbacks))?;
//! host.set_event_enabled(&env, EventKind::GarbageCollectionStart, true)?;
//!
//! // Later, from the collector.
//! host.post_garbage_collection_start();
//! ```
//!
//! Agents written in C see the same operations through the
//! `extern "system"` functions in [`functions`], reached from the handle
//! returned by [`Environment::external`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │             C-ABI entry points (functions)               │
//! │   prologue: resolve jvmtiEnv*, check pointers            │
//! ├─────────────────────────────────────────────────────────┤
//! │                   JvmtiHost (host)                       │
//! │   phase checks, event posting, stack requests            │
//! ├──────────────┬──────────────┬─────────────┬─────────────┤
//! │ registry     │ capabilities │ monitor     │ snapshot    │
//! │ environments │ pools, sets  │ raw monitor │ stack info  │
//! ├──────────────┴──────────────┴─────────────┴─────────────┤
//! │           HostRuntime (implemented by the VM)            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`sys::jni`] | Raw JNI handle types |
//! | [`sys::jvmti`] | Raw JVMTI types, error codes, callback table |
//! | [`capabilities`] | Capability sets, phases, shared pools |
//! | [`registry`] | Environments and their safe iteration |
//! | [`events`] | Event kinds, enablement, callback invocation |
//! | [`monitor`] | Raw monitors |
//! | [`snapshot`] | Stack traces and stack info blocks |
//! | [`host`] | [`JvmtiHost`], the entry surface |
//! | [`functions`] | `extern "system"` entry points |
//!
//! ## Logging
//!
//! The crate logs through [`tracing`] and never installs a subscriber.
//! Callback invocations are `trace`, lifecycle changes `debug`, rejected
//! requests `warn`, broken invariants `error`.

pub mod sys;

pub mod capabilities;
pub mod config;
pub mod error;
pub mod events;
pub mod functions;
pub mod host;
pub mod monitor;
pub mod prelude;
pub mod registry;
pub mod runtime;
pub mod snapshot;

pub use crate::capabilities::{Capability, CapabilityPools, CapabilitySet, CapabilityTable, Phase};
pub use crate::config::{ConfigError, JvmtiConfig};
pub use crate::error::{Error, Result};
pub use crate::events::{Event, EventKind, EventSet};
pub use crate::host::JvmtiHost;
pub use crate::monitor::{MonitorRegistry, RawMonitorId};
pub use crate::registry::{Environment, EnvironmentRegistry};
pub use crate::runtime::{FrameKind, HostRuntime, StackFrame};
pub use crate::snapshot::StackInfoBlock;
pub use crate::sys::{jni, jvmti};
