//! Raw monitors: reentrant lock-plus-condition objects handed to agents.
//!
//! Monitors live in a slot table. `free_indices` is a stack of unused slot
//! indices whose live part is `free_indices[next_available..]`; a slot is in
//! use iff it is below the table length and not in that suffix. When the
//! stack runs dry both arrays double in size under the table lock.

use std::collections::{HashSet, VecDeque};
use std::ffi::c_void;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::error::{Error, Result};
use crate::sys::jni::jlong;
use crate::sys::jvmti::jrawMonitorID;

/// Slot index of a raw monitor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RawMonitorId(u32);

impl RawMonitorId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The non-null handle given to agents: slot index plus one.
    pub fn to_raw(self) -> jrawMonitorID {
        (self.0 as usize + 1) as *mut c_void
    }

    /// Inverse of [`to_raw`](Self::to_raw). Null and out-of-range handles
    /// are `InvalidMonitor`.
    pub fn from_raw(raw: jrawMonitorID) -> Result<Self> {
        let value = raw as usize;
        if value == 0 || value - 1 > u32::MAX as usize {
            return Err(Error::InvalidMonitor);
        }
        Ok(RawMonitorId((value - 1) as u32))
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    owner: Option<ThreadId>,
    recursions: usize,
    entrants: usize,
    waiters: VecDeque<u64>,
    notified: HashSet<u64>,
    next_ticket: u64,
    destroyed: bool,
}

/// A single raw monitor.
#[derive(Debug)]
pub struct RawMonitor {
    name: String,
    state: Mutex<MonitorState>,
    cond: Condvar,
}

impl RawMonitor {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(MonitorState::default()),
            cond: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the calling thread owns the monitor.
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    fn enter(&self) -> Result<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(Error::InvalidMonitor);
        }
        if state.owner == Some(me) {
            state.recursions += 1;
            return Ok(());
        }
        state.entrants += 1;
        while state.owner.is_some() && !state.destroyed {
            self.cond.wait(&mut state);
        }
        state.entrants -= 1;
        if state.destroyed {
            return Err(Error::InvalidMonitor);
        }
        state.owner = Some(me);
        state.recursions = 1;
        Ok(())
    }

    fn exit(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.owner != Some(thread::current().id()) {
            return Err(Error::NotMonitorOwner);
        }
        state.recursions -= 1;
        if state.recursions == 0 {
            state.owner = None;
            self.cond.notify_all();
        }
        Ok(())
    }

    /// Releases the monitor completely, waits, and re-acquires it with the
    /// previous recursion count. `millis == 0` waits for a notification,
    /// `millis > 0` for at most that long, `millis < 0` only lets entrants
    /// through before re-acquiring. The wait also ends once `interrupted`
    /// holds; it is evaluated under the monitor lock after every wake-up.
    fn wait(&self, millis: jlong, interrupted: &dyn Fn() -> bool) -> Result<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return Err(Error::NotMonitorOwner);
        }

        let recursions = state.recursions;
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.owner = None;
        state.recursions = 0;
        self.cond.notify_all();

        if millis >= 0 {
            state.waiters.push_back(ticket);
            let deadline = (millis > 0).then(|| Instant::now() + Duration::from_millis(millis as u64));
            while !state.notified.contains(&ticket) && !state.destroyed && !interrupted() {
                match deadline {
                    Some(deadline) => {
                        if self.cond.wait_until(&mut state, deadline).timed_out() {
                            break;
                        }
                    }
                    None => self.cond.wait(&mut state),
                }
            }
            state.notified.remove(&ticket);
            state.waiters.retain(|t| *t != ticket);
        }

        state.entrants += 1;
        while state.owner.is_some() && !state.destroyed {
            self.cond.wait(&mut state);
        }
        state.entrants -= 1;
        if state.destroyed {
            return Err(Error::InvalidMonitor);
        }
        state.owner = Some(me);
        state.recursions = recursions;
        Ok(())
    }

    fn notify(&self, all: bool) -> Result<()> {
        let mut state = self.state.lock();
        if state.owner != Some(thread::current().id()) {
            return Err(Error::NotMonitorOwner);
        }
        if all {
            let woken: Vec<u64> = state.waiters.drain(..).collect();
            state.notified.extend(woken);
        } else if let Some(ticket) = state.waiters.pop_front() {
            state.notified.insert(ticket);
        }
        self.cond.notify_all();
        Ok(())
    }
}

struct MonitorTable {
    monitors: Vec<Option<Arc<RawMonitor>>>,
    free_indices: Vec<u32>,
    next_available: usize,
}

impl MonitorTable {
    fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            monitors: vec![None; capacity],
            free_indices: (0..capacity as u32).collect(),
            next_available: 0,
        }
    }

    fn is_live(&self, index: usize) -> bool {
        index < self.monitors.len() && !self.free_indices[self.next_available..].contains(&(index as u32))
    }

    fn get(&self, id: RawMonitorId) -> Result<Arc<RawMonitor>> {
        let slot = self.monitors.get(id.index()).and_then(Option::as_ref);
        debug_assert_eq!(slot.is_some(), self.is_live(id.index()));
        slot.cloned().ok_or(Error::InvalidMonitor)
    }

    fn grow(&mut self) -> Result<()> {
        let old = self.monitors.len();
        let new = old.checked_mul(2).ok_or(Error::OutOfMemory)?;
        if new > u32::MAX as usize {
            return Err(Error::OutOfMemory);
        }
        self.monitors.try_reserve_exact(new - old).map_err(|_| Error::OutOfMemory)?;
        self.free_indices.try_reserve_exact(new - old).map_err(|_| Error::OutOfMemory)?;
        self.monitors.resize(new, None);
        self.free_indices.extend(old as u32..new as u32);
        debug!(capacity = new, "raw monitor table grown");
        Ok(())
    }

    fn insert(&mut self, monitor: Arc<RawMonitor>) -> Result<RawMonitorId> {
        if self.next_available == self.free_indices.len() {
            self.grow()?;
        }
        let index = self.free_indices[self.next_available];
        self.next_available += 1;
        self.monitors[index as usize] = Some(monitor);
        Ok(RawMonitorId(index))
    }

    fn release(&mut self, id: RawMonitorId) {
        self.monitors[id.index()] = None;
        self.next_available -= 1;
        self.free_indices[self.next_available] = id.0;
    }
}

/// The VM-wide raw monitor table.
pub struct MonitorRegistry {
    table: Mutex<MonitorTable>,
}

impl MonitorRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            table: Mutex::new(MonitorTable::with_capacity(capacity)),
        }
    }

    pub fn create(&self, name: &str) -> Result<RawMonitorId> {
        let monitor = Arc::new(RawMonitor::new(name));
        let id = self.table.lock().insert(monitor)?;
        debug!(name, index = id.index(), "raw monitor created");
        Ok(id)
    }

    /// Looks up a live monitor.
    pub fn get(&self, id: RawMonitorId) -> Result<Arc<RawMonitor>> {
        self.table.lock().get(id)
    }

    pub fn enter(&self, id: RawMonitorId) -> Result<()> {
        self.get(id)?.enter()
    }

    pub fn exit(&self, id: RawMonitorId) -> Result<()> {
        self.get(id)?.exit()
    }

    pub fn wait(&self, id: RawMonitorId, millis: jlong) -> Result<()> {
        self.get(id)?.wait(millis, &|| false)
    }

    /// Like [`wait`](Self::wait), but also returns early once `interrupted`
    /// reports true after a [`wake_waiters`](Self::wake_waiters).
    pub fn wait_interruptibly(
        &self,
        id: RawMonitorId,
        millis: jlong,
        interrupted: &dyn Fn() -> bool,
    ) -> Result<()> {
        self.get(id)?.wait(millis, interrupted)
    }

    /// Wakes every waiting thread on every monitor without notifying it.
    /// Waiters re-check their interrupt predicate and go back to sleep if it
    /// does not hold.
    pub fn wake_waiters(&self) {
        let monitors: Vec<Arc<RawMonitor>> = self.table.lock().monitors.iter().flatten().cloned().collect();
        for monitor in monitors {
            let state = monitor.state.lock();
            if !state.waiters.is_empty() {
                monitor.cond.notify_all();
            }
        }
    }

    pub fn notify(&self, id: RawMonitorId) -> Result<()> {
        self.get(id)?.notify(false)
    }

    pub fn notify_all(&self, id: RawMonitorId) -> Result<()> {
        self.get(id)?.notify(true)
    }

    /// Destroys a monitor the caller owns. The caller's hold is released in
    /// full first; if other threads are blocked on the monitor it is left in
    /// place for them and `NotMonitorOwner` is returned.
    pub fn destroy(&self, id: RawMonitorId) -> Result<()> {
        let mut table = self.table.lock();
        let monitor = table.get(id)?;
        {
            let mut state = monitor.state.lock();
            if state.owner != Some(thread::current().id()) {
                return Err(Error::NotMonitorOwner);
            }
            state.owner = None;
            state.recursions = 0;
            if state.entrants > 0 || !state.waiters.is_empty() {
                monitor.cond.notify_all();
                return Err(Error::NotMonitorOwner);
            }
            state.destroyed = true;
        }
        table.release(id);
        debug!(name = monitor.name(), index = id.index(), "raw monitor destroyed");
        Ok(())
    }

    /// Number of monitors currently in use.
    pub fn len(&self) -> usize {
        self.table.lock().next_available
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.table.lock().monitors.len()
    }

    /// Whether `id` currently names a monitor, by the free-stack definition.
    pub fn is_live(&self, id: RawMonitorId) -> bool {
        self.table.lock().is_live(id.index())
    }

    /// Drops every monitor. Threads still blocked on one are woken and see
    /// `InvalidMonitor`.
    pub fn clear(&self) {
        let mut table = self.table.lock();
        for monitor in table.monitors.iter().flatten() {
            monitor.state.lock().destroyed = true;
            monitor.cond.notify_all();
        }
        let capacity = table.monitors.len();
        *table = MonitorTable::with_capacity(capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_reuses_freed_slots() {
        let registry = MonitorRegistry::new(4);
        let a = registry.create("a").unwrap();
        let b = registry.create("b").unwrap();
        registry.enter(a).unwrap();
        registry.destroy(a).unwrap();
        assert!(!registry.is_live(a));
        assert!(registry.is_live(b));
        let c = registry.create("c").unwrap();
        assert_eq!(c, a);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_grows_by_doubling() {
        let registry = MonitorRegistry::new(2);
        let ids: Vec<_> = (0..5).map(|i| registry.create(&format!("m{i}")).unwrap()).collect();
        assert_eq!(registry.capacity(), 8);
        for id in &ids {
            assert!(registry.is_live(*id));
        }
        assert!(!registry.is_live(RawMonitorId(5)));
    }

    #[test]
    fn test_raw_handle_round_trip() {
        let id = RawMonitorId(7);
        assert_eq!(id.to_raw() as usize, 8);
        assert_eq!(RawMonitorId::from_raw(id.to_raw()), Ok(id));
        assert_eq!(RawMonitorId::from_raw(std::ptr::null_mut()), Err(Error::InvalidMonitor));
    }

    #[test]
    fn test_reentrant_enter_needs_matching_exits() {
        let registry = MonitorRegistry::new(1);
        let id = registry.create("nested").unwrap();
        registry.enter(id).unwrap();
        registry.enter(id).unwrap();
        registry.exit(id).unwrap();
        assert!(registry.get(id).unwrap().is_owned_by_current_thread());
        registry.exit(id).unwrap();
        assert_eq!(registry.exit(id), Err(Error::NotMonitorOwner));
    }

    #[test]
    fn test_negative_wait_does_not_block() {
        let registry = MonitorRegistry::new(1);
        let id = registry.create("w").unwrap();
        registry.enter(id).unwrap();
        registry.wait(id, -5).unwrap();
        assert!(registry.get(id).unwrap().is_owned_by_current_thread());
        registry.exit(id).unwrap();
    }

    #[test]
    fn test_timed_wait_returns_without_notify() {
        let registry = MonitorRegistry::new(1);
        let id = registry.create("t").unwrap();
        registry.enter(id).unwrap();
        let started = Instant::now();
        registry.wait(id, 20).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
        registry.exit(id).unwrap();
    }
}
