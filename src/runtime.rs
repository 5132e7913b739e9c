//! Hooks into the VM that hosts the tool interface.
//!
//! The host never inspects threads or stacks on its own. Everything it needs
//! from the VM goes through [`HostRuntime`], which the embedding VM
//! implements once and hands to [`JvmtiHost::new`](crate::JvmtiHost::new).

use crate::error::Result;
use crate::sys::jni::{jint, jmethodID, jthread, JNIEnv};
use crate::sys::jvmti::jlocation;

/// How a stack frame is treated by stack trace collection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameKind {
    /// An ordinary frame reported to agents.
    Visible,
    /// A VM-internal frame that agents never see.
    Internal,
    /// A frame of a throwable's constructor chain. Hidden while it is at the
    /// top of the stack, visible once an ordinary frame has been seen.
    ThrowableInit,
}

/// One frame as produced by [`HostRuntime::walk_stack`].
#[derive(Debug, Copy, Clone)]
pub struct StackFrame {
    pub method: jmethodID,
    pub location: jlocation,
    pub kind: FrameKind,
}

/// The VM services the tool interface depends on.
pub trait HostRuntime: Send + Sync {
    /// Checks that `thread` is a thread handle of a live thread.
    /// Fails with `InvalidThread` for anything that is not a thread and
    /// `ThreadNotAlive` for threads not started yet or already terminated.
    fn resolve_thread(&self, thread: jthread) -> Result<()>;

    /// The thread handle of the calling thread, if it is attached.
    fn current_thread(&self) -> Option<jthread>;

    /// All live threads visible to agents.
    fn live_threads(&self) -> Vec<jthread>;

    /// `JVMTI_THREAD_STATE_*` flags for `thread`. Terminated threads report
    /// their state too; only non-threads fail with `InvalidThread`.
    fn thread_state(&self, thread: jthread) -> Result<jint>;

    /// Calls `visit` on each frame of `thread`, newest first, until it
    /// returns `false` or the stack is exhausted. Only called from inside
    /// [`run_quiesced`](Self::run_quiesced).
    fn walk_stack(&self, thread: jthread, visit: &mut dyn FnMut(&StackFrame) -> bool);

    /// Stops every other thread at a safepoint, runs `op` on the calling
    /// thread, then resumes them. Returns once `op` has completed.
    fn run_quiesced(&self, op: &mut dyn FnMut());

    /// The calling thread's JNI environment, passed to event callbacks.
    fn jni_env(&self) -> *mut JNIEnv;

    /// A stable identity for a live thread, used to key per-thread agent
    /// data. Defaults to the handle value, which suits runtimes whose thread
    /// handles are unique per thread.
    fn thread_key(&self, thread: jthread) -> u64 {
        thread as usize as u64
    }

    /// Sets the interrupt flag of `thread`, which has already been resolved.
    fn interrupt_thread(&self, thread: jthread) -> Result<()>;

    /// Whether the calling thread has an interrupt pending. Must not clear it.
    fn is_interrupted(&self) -> bool {
        false
    }

    /// Clears and returns the calling thread's pending interrupt.
    fn take_interrupt(&self) -> bool {
        false
    }
}
