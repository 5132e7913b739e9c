//! Stack traces taken while the VM is quiesced.
//!
//! Single-thread traces are written into a caller buffer. Multi-thread traces
//! go into one unmanaged allocation, a [`StackInfoBlock`], laid out as
//!
//! ```text
//! [jvmtiStackInfo; n] | padding | [jvmtiFrameInfo; max_frames] x n
//! ```
//!
//! so that the agent releases everything with a single `Deallocate`.

use std::collections::VecDeque;
use std::mem;
use std::ptr::{self, NonNull};

use tracing::debug;

use crate::error::{Error, Result};
use crate::runtime::{FrameKind, HostRuntime, StackFrame};
use crate::sys::jni::{jint, jthread};
use crate::sys::jvmti::{jvmtiFrameInfo, jvmtiStackInfo, JVMTI_THREAD_STATE_TERMINATED};

fn frame_info(frame: &StackFrame) -> jvmtiFrameInfo {
    jvmtiFrameInfo {
        method: frame.method,
        location: frame.location,
    }
}

/// Walks the agent-visible frames of `thread`, newest first. Internal frames
/// are dropped everywhere, throwable constructor frames only until the first
/// other visible frame.
fn walk_visible(
    runtime: &dyn HostRuntime,
    thread: jthread,
    visit: &mut dyn FnMut(jvmtiFrameInfo) -> bool,
) {
    let mut at_top = true;
    runtime.walk_stack(thread, &mut |frame| match frame.kind {
        FrameKind::Internal => true,
        FrameKind::ThrowableInit if at_top => true,
        FrameKind::ThrowableInit | FrameKind::Visible => {
            at_top = false;
            visit(frame_info(frame))
        }
    });
}

/// Fills `out` with frames of `thread` starting at `start_depth`. Must run
/// while the VM is quiesced. Returns the number of frames written.
///
/// A non-negative `start_depth` skips that many of the newest frames. A
/// negative one starts `|start_depth|` frames above the bottom of the stack,
/// which needs a ring of that many frames during the walk.
pub(crate) fn fill_stack_trace(
    runtime: &dyn HostRuntime,
    thread: jthread,
    start_depth: jint,
    out: &mut [jvmtiFrameInfo],
) -> Result<usize> {
    if start_depth >= 0 {
        let skip = start_depth as usize;
        let mut seen = 0usize;
        let mut written = 0usize;
        walk_visible(runtime, thread, &mut |frame| {
            seen += 1;
            if seen <= skip {
                return true;
            }
            if written == out.len() {
                return false;
            }
            out[written] = frame;
            written += 1;
            true
        });
        if skip > 0 && seen <= skip {
            return Err(Error::IllegalArgument);
        }
        Ok(written)
    } else {
        let depth = start_depth.unsigned_abs() as usize;
        let mut ring: VecDeque<jvmtiFrameInfo> = VecDeque::new();
        ring.try_reserve_exact(depth).map_err(|_| Error::OutOfMemory)?;
        let mut seen = 0usize;
        walk_visible(runtime, thread, &mut |frame| {
            if ring.len() == depth {
                ring.pop_front();
            }
            ring.push_back(frame);
            seen += 1;
            true
        });
        if seen < depth {
            return Err(Error::IllegalArgument);
        }
        let written = ring.len().min(out.len());
        for (slot, frame) in out.iter_mut().zip(ring) {
            *slot = frame;
        }
        Ok(written)
    }
}

/// Counts the agent-visible frames of `thread`. Must run while quiesced.
pub(crate) fn count_frames(runtime: &dyn HostRuntime, thread: jthread) -> usize {
    let mut count = 0usize;
    walk_visible(runtime, thread, &mut |_| {
        count += 1;
        true
    });
    count
}

/// Checks `start_depth` against the configured bound.
pub(crate) fn check_start_depth(start_depth: jint, limit: usize) -> Result<()> {
    if start_depth.unsigned_abs() as usize > limit {
        return Err(Error::IllegalArgument);
    }
    Ok(())
}

/// Runs `op` with the VM quiesced and returns its result.
pub(crate) fn quiesced<T>(runtime: &dyn HostRuntime, op: impl FnOnce() -> Result<T>) -> Result<T> {
    let mut op = Some(op);
    let mut result = None;
    runtime.run_quiesced(&mut || {
        if let Some(op) = op.take() {
            result = Some(op());
        }
    });
    result.unwrap_or(Err(Error::Internal("quiesced operation did not run")))
}

// =============================================================================
// StackInfoBlock
// =============================================================================

/// One unmanaged allocation holding a `jvmtiStackInfo` per thread and each
/// thread's frame buffer. Freed on drop unless handed off with
/// [`into_raw`](Self::into_raw).
pub struct StackInfoBlock {
    base: NonNull<u8>,
    count: usize,
    max_frames: usize,
}

impl StackInfoBlock {
    fn header_size(count: usize) -> Result<usize> {
        let infos = count
            .checked_mul(mem::size_of::<jvmtiStackInfo>())
            .ok_or(Error::OutOfMemory)?;
        let align = mem::align_of::<jvmtiFrameInfo>();
        infos
            .checked_add(align - 1)
            .map(|n| n / align * align)
            .ok_or(Error::OutOfMemory)
    }

    /// Allocates a zeroed block for `count` threads with `max_frames` frame
    /// slots each and points every `frame_buffer` at its slots.
    pub fn allocate(count: usize, max_frames: usize) -> Result<Self> {
        let header = Self::header_size(count)?;
        let frames = count
            .checked_mul(max_frames)
            .and_then(|n| n.checked_mul(mem::size_of::<jvmtiFrameInfo>()))
            .ok_or(Error::OutOfMemory)?;
        let total = header.checked_add(frames).ok_or(Error::OutOfMemory)?.max(1);

        // SAFETY: plain malloc of `total` bytes; null is handled below.
        let raw = unsafe { libc::malloc(total) } as *mut u8;
        let base = NonNull::new(raw).ok_or(Error::OutOfMemory)?;
        // SAFETY: `base` points at `total` writable bytes.
        unsafe { ptr::write_bytes(base.as_ptr(), 0, total) };

        let block = Self { base, count, max_frames };
        for i in 0..count {
            // SAFETY: `i < count`, so both pointers stay inside the block.
            unsafe {
                let info = block.info_ptr(i);
                (*info).frame_buffer = block.frames_ptr(i);
            }
        }
        debug!(threads = count, max_frames, bytes = total, "stack info block allocated");
        Ok(block)
    }

    fn info_ptr(&self, i: usize) -> *mut jvmtiStackInfo {
        (self.base.as_ptr() as *mut jvmtiStackInfo).wrapping_add(i)
    }

    fn frames_ptr(&self, i: usize) -> *mut jvmtiFrameInfo {
        let header = Self::header_size(self.count).unwrap_or(0);
        let frames = self.base.as_ptr().wrapping_add(header) as *mut jvmtiFrameInfo;
        frames.wrapping_add(i * self.max_frames)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn infos(&self) -> &[jvmtiStackInfo] {
        // SAFETY: the header holds `count` initialized entries.
        unsafe { std::slice::from_raw_parts(self.info_ptr(0), self.count) }
    }

    /// The recorded frames of thread `i`.
    pub fn frames(&self, i: usize) -> &[jvmtiFrameInfo] {
        let info = &self.infos()[i];
        // SAFETY: `frame_count` never exceeds the thread's slot count.
        unsafe { std::slice::from_raw_parts(info.frame_buffer, info.frame_count as usize) }
    }

    /// Records `thread`'s state and lets `fill` write into its frame slots;
    /// `fill` returns how many slots it used.
    fn record(
        &mut self,
        i: usize,
        thread: jthread,
        state: jint,
        fill: impl FnOnce(&mut [jvmtiFrameInfo]) -> Result<usize>,
    ) -> Result<()> {
        if i >= self.count {
            return Err(Error::Internal("stack info index out of range"));
        }
        // SAFETY: the frame slots of thread `i` are `max_frames` entries that
        // no other reference aliases.
        let frames = unsafe { std::slice::from_raw_parts_mut(self.frames_ptr(i), self.max_frames) };
        let written = fill(frames)?;
        // SAFETY: `i < count`.
        let info = unsafe { &mut *self.info_ptr(i) };
        info.thread = thread;
        info.state = state;
        info.frame_count = written as jint;
        Ok(())
    }

    /// Hands the block to the caller, who frees it with `Deallocate`.
    pub fn into_raw(self) -> *mut jvmtiStackInfo {
        let ptr = self.info_ptr(0);
        mem::forget(self);
        ptr
    }
}

impl Drop for StackInfoBlock {
    fn drop(&mut self) {
        // SAFETY: `base` came from libc::malloc and is freed once.
        unsafe { libc::free(self.base.as_ptr() as *mut libc::c_void) };
    }
}

impl std::fmt::Debug for StackInfoBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackInfoBlock")
            .field("threads", &self.count)
            .field("max_frames", &self.max_frames)
            .finish()
    }
}

fn record_thread(
    runtime: &dyn HostRuntime,
    block: &mut StackInfoBlock,
    i: usize,
    thread: jthread,
) -> Result<()> {
    match runtime.resolve_thread(thread) {
        Ok(()) => {
            let state = runtime.thread_state(thread)?;
            block.record(i, thread, state, |frames| fill_stack_trace(runtime, thread, 0, frames))
        }
        Err(Error::ThreadNotAlive) => {
            let state = runtime.thread_state(thread).unwrap_or(JVMTI_THREAD_STATE_TERMINATED);
            block.record(i, thread, state, |_| Ok(0))
        }
        Err(err) => Err(err),
    }
}

/// Stack traces of every live thread, listed and walked in one quiesced
/// operation.
pub(crate) fn all_stack_traces(runtime: &dyn HostRuntime, max_frames: usize) -> Result<StackInfoBlock> {
    quiesced(runtime, || {
        let threads = runtime.live_threads();
        let mut block = StackInfoBlock::allocate(threads.len(), max_frames)?;
        for (i, thread) in threads.iter().enumerate() {
            record_thread(runtime, &mut block, i, *thread)?;
        }
        Ok(block)
    })
}

/// Stack traces of `threads`. A handle that is not a thread fails the whole
/// call with `InvalidThread` and the block is freed; threads that are not
/// alive get an empty trace.
pub(crate) fn thread_list_stack_traces(
    runtime: &dyn HostRuntime,
    threads: &[jthread],
    max_frames: usize,
) -> Result<StackInfoBlock> {
    let mut block = StackInfoBlock::allocate(threads.len(), max_frames)?;
    quiesced(runtime, || {
        for (i, thread) in threads.iter().enumerate() {
            record_thread(runtime, &mut block, i, *thread)?;
        }
        Ok(())
    })?;
    Ok(block)
}
