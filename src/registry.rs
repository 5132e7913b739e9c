//! Attached environments.
//!
//! Environments form a singly linked list threaded through an arena of slots;
//! `next` links are slot indices and freed slots are recycled. Disposal only
//! marks an environment dead. Unlinking happens in [`cleanup`], which is
//! deferred while any [`EnvIter`] is alive so that a walk in progress never
//! loses its place.
//!
//! [`cleanup`]: EnvironmentRegistry::cleanup

use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error};

use crate::capabilities::{CapabilityPools, CapabilitySet, CapabilityTable, Phase};
use crate::error::{Error, Result};
use crate::events::{AtomicEventSet, CallbackTable, EventKind};
use crate::host::JvmtiHost;
use crate::sys::jvmti::{jvmtiEnv, jvmtiEventCallbacks, jvmtiInterface_1_};

const ENV_MAGIC_LIVE: u32 = 0x7e1a_11fe;
const ENV_MAGIC_DEAD: u32 = 0xdead_e4f0;

/// The struct an agent's `jvmtiEnv*` points at. The leading `jvmtiEnv` keeps
/// the function table where agents expect it.
#[repr(C)]
pub(crate) struct ExternalEnv {
    #[allow(dead_code)]
    base: jvmtiEnv,
    env: *const Environment,
}

/// One attached agent.
pub struct Environment {
    slot: u32,
    magic: AtomicU32,
    host: Weak<JvmtiHost>,
    capabilities: AtomicU64,
    prohibited: CapabilitySet,
    events: AtomicEventSet,
    callbacks: RwLock<CallbackTable>,
    local_storage: AtomicPtr<c_void>,
    // Thread key to stored pointer value.
    thread_storage: Mutex<HashMap<u64, usize>>,
    external: Box<ExternalEnv>,
}

// The raw pointers inside `external` point back at this environment and at a
// function table that lives for the whole VM.
unsafe impl Send for Environment {}
unsafe impl Sync for Environment {}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("slot", &self.slot)
            .field("live", &self.is_live())
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl Environment {
    /// Resolves the handle an agent passed in. Null handles and handles of
    /// disposed environments are `InvalidEnvironment`.
    ///
    /// # Safety
    /// `jvmti_env` must be null or a handle produced by
    /// [`external`](Self::external) whose environment has not been freed.
    pub unsafe fn from_external<'a>(jvmti_env: *mut jvmtiEnv) -> Result<&'a Environment> {
        if jvmti_env.is_null() {
            return Err(Error::InvalidEnvironment);
        }
        let external = &*(jvmti_env as *const ExternalEnv);
        if external.env.is_null() {
            return Err(Error::InvalidEnvironment);
        }
        let env = &*external.env;
        if !env.is_live() {
            return Err(Error::InvalidEnvironment);
        }
        Ok(env)
    }

    /// The `jvmtiEnv*` handed to the agent.
    pub fn external(&self) -> *mut jvmtiEnv {
        &*self.external as *const ExternalEnv as *mut jvmtiEnv
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn is_live(&self) -> bool {
        self.magic.load(Ordering::Acquire) == ENV_MAGIC_LIVE
    }

    /// The host this environment belongs to, while it is still running.
    pub fn host(&self) -> Option<Arc<JvmtiHost>> {
        self.host.upgrade()
    }

    pub(crate) fn belongs_to(&self, host: &JvmtiHost) -> bool {
        ptr::eq(self.host.as_ptr(), host)
    }

    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from_bits(self.capabilities.load(Ordering::Acquire))
    }

    pub fn prohibited(&self) -> CapabilitySet {
        self.prohibited
    }

    pub fn is_event_enabled(&self, kind: EventKind) -> bool {
        self.events.contains(kind)
    }

    pub(crate) fn set_event_enabled(&self, kind: EventKind, enabled: bool) {
        self.events.set(kind, enabled);
    }

    pub(crate) fn set_callbacks(&self, callbacks: Option<&jvmtiEventCallbacks>) {
        self.callbacks.write().set(callbacks);
    }

    /// A copy of the current callback table.
    pub fn callbacks(&self) -> CallbackTable {
        *self.callbacks.read()
    }

    pub fn local_storage(&self) -> *mut c_void {
        self.local_storage.load(Ordering::Acquire)
    }

    pub(crate) fn set_local_storage(&self, data: *mut c_void) {
        self.local_storage.store(data, Ordering::Release);
    }

    pub fn thread_local_storage(&self, thread_key: u64) -> *mut c_void {
        self.thread_storage
            .lock()
            .get(&thread_key)
            .map_or(ptr::null_mut(), |data| *data as *mut c_void)
    }

    /// Storing null forgets the thread.
    pub(crate) fn set_thread_local_storage(&self, thread_key: u64, data: *mut c_void) {
        let mut storage = self.thread_storage.lock();
        if data.is_null() {
            storage.remove(&thread_key);
        } else {
            storage.insert(thread_key, data as usize);
        }
    }
}

struct Node {
    env: Arc<Environment>,
    next: Option<u32>,
}

#[derive(Default)]
struct RegistryState {
    nodes: Vec<Option<Node>>,
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    active_iterators: usize,
    has_disposed: bool,
    pools: Option<CapabilityPools>,
}

impl RegistryState {
    fn node(&self, slot: u32) -> Result<&Node> {
        self.nodes
            .get(slot as usize)
            .and_then(Option::as_ref)
            .ok_or(Error::Internal("environment list references an empty slot"))
    }

    fn pools_mut(&mut self) -> Result<&mut CapabilityPools> {
        self.pools
            .as_mut()
            .ok_or(Error::Internal("capability pools missing while environments exist"))
    }
}

/// The VM-wide list of environments and the capability pools they share.
pub struct EnvironmentRegistry {
    state: Mutex<RegistryState>,
    table: CapabilityTable,
}

impl EnvironmentRegistry {
    pub fn new(table: CapabilityTable) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            table,
        }
    }

    /// Allocates an environment and appends it to the list. The first
    /// environment also creates the capability pools.
    pub fn create(
        &self,
        host: Weak<JvmtiHost>,
        functions: *const jvmtiInterface_1_,
        prohibited: CapabilitySet,
    ) -> Result<Arc<Environment>> {
        let mut state = self.state.lock();
        let slot = match state.free.pop() {
            Some(slot) => slot,
            None => {
                state.nodes.try_reserve(1).map_err(|_| Error::OutOfMemory)?;
                state.nodes.push(None);
                (state.nodes.len() - 1) as u32
            }
        };

        let env = Arc::new_cyclic(|this: &Weak<Environment>| Environment {
            slot,
            magic: AtomicU32::new(ENV_MAGIC_LIVE),
            host,
            capabilities: AtomicU64::new(0),
            prohibited,
            events: AtomicEventSet::default(),
            callbacks: RwLock::new(CallbackTable::default()),
            local_storage: AtomicPtr::new(ptr::null_mut()),
            thread_storage: Mutex::new(HashMap::new()),
            external: Box::new(ExternalEnv {
                base: jvmtiEnv { functions },
                env: this.as_ptr(),
            }),
        });

        if state.pools.is_none() {
            state.pools = Some(CapabilityPools::new(&self.table));
            debug!("capability pools created");
        }

        state.nodes[slot as usize] = Some(Node { env: env.clone(), next: None });
        match state.tail {
            Some(tail) => {
                if let Some(node) = state.nodes[tail as usize].as_mut() {
                    node.next = Some(slot);
                }
            }
            None => state.head = Some(slot),
        }
        state.tail = Some(slot);
        debug!(slot, "environment created");
        Ok(env)
    }

    /// Marks `env` dead, gives back its capabilities and drops its callbacks.
    /// The node stays linked until the next cleanup, which runs right away
    /// when nobody is iterating.
    pub fn dispose(&self, env: &Environment) -> Result<()> {
        let mut state = self.state.lock();
        if !env.is_live() {
            return Err(Error::InvalidEnvironment);
        }

        let held = env.capabilities();
        if !held.is_empty() {
            let kept = state.pools_mut()?.relinquish(held, held);
            env.capabilities.store(kept.bits(), Ordering::Release);
        }
        env.set_callbacks(None);
        env.events.clear();
        env.thread_storage.lock().clear();
        env.magic.store(ENV_MAGIC_DEAD, Ordering::Release);
        state.has_disposed = true;
        debug!(slot = env.slot, "environment disposed");

        if state.active_iterators == 0 {
            self.cleanup_locked(&mut state)?;
        }
        Ok(())
    }

    /// Starts a walk over the live environments. Cleanup is held off until
    /// the returned iterator is dropped.
    pub fn iter(&self) -> EnvIter<'_> {
        let mut state = self.state.lock();
        state.active_iterators += 1;
        EnvIter {
            registry: self,
            cursor: state.head,
            last: state.tail,
        }
    }

    fn leave_iteration(&self) {
        let mut state = self.state.lock();
        // Teardown may have reset the counter under a live iterator.
        state.active_iterators = state.active_iterators.saturating_sub(1);
        if state.active_iterators == 0 && state.has_disposed {
            if let Err(err) = self.cleanup_locked(&mut state) {
                error!(%err, "environment cleanup failed");
            }
        }
    }

    /// Unlinks and frees every dead environment. Does nothing while an
    /// iteration is in progress.
    pub fn cleanup(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.active_iterators > 0 {
            return Ok(());
        }
        self.cleanup_locked(&mut state)
    }

    fn cleanup_locked(&self, state: &mut RegistryState) -> Result<()> {
        let had_environments = state.head.is_some();
        let mut prev: Option<u32> = None;
        let mut cursor = state.head;
        let mut freed = 0usize;

        while let Some(slot) = cursor {
            let (live, next) = {
                let node = state.node(slot)?;
                (node.env.is_live(), node.next)
            };
            if live {
                prev = Some(slot);
            } else {
                match prev {
                    Some(p) => {
                        if let Some(node) = state.nodes[p as usize].as_mut() {
                            node.next = next;
                        }
                    }
                    None => state.head = next,
                }
                if state.tail == Some(slot) {
                    state.tail = prev;
                }
                state.nodes[slot as usize] = None;
                state.free.push(slot);
                freed += 1;
            }
            cursor = next;
        }
        state.has_disposed = false;
        if freed > 0 {
            debug!(freed, "dead environments freed");
        }

        if had_environments && state.head.is_none() {
            Self::destroy_pools_locked(state)?;
        }
        Ok(())
    }

    /// Destroys the capability pools. Only valid once per set of pools.
    pub fn destroy_pools(&self) -> Result<()> {
        Self::destroy_pools_locked(&mut self.state.lock())
    }

    fn destroy_pools_locked(state: &mut RegistryState) -> Result<()> {
        if state.pools.take().is_none() {
            error!("capability pools destroyed twice");
            return Err(Error::Internal("capability pools already destroyed"));
        }
        debug!("capability pools destroyed");
        Ok(())
    }

    /// Frees every environment regardless of iterators or liveness.
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        for node in state.nodes.iter().flatten() {
            node.env.set_callbacks(None);
            node.env.magic.store(ENV_MAGIC_DEAD, Ordering::Release);
        }
        let count = state.nodes.iter().flatten().count();
        *state = RegistryState::default();
        debug!(count, "environment registry torn down");
    }

    /// What `env` could hold after a grant in `phase`.
    pub fn potential_capabilities(&self, env: &Environment, phase: Phase) -> Result<CapabilitySet> {
        let state = self.state.lock();
        if !env.is_live() {
            return Err(Error::InvalidEnvironment);
        }
        let pools = state
            .pools
            .as_ref()
            .ok_or(Error::Internal("capability pools missing while environments exist"))?;
        Ok(pools.potential(phase, env.capabilities(), env.prohibited))
    }

    /// Grants `desired` to `env`. On `NotAvailable` nothing changes.
    pub fn add_capabilities(
        &self,
        env: &Environment,
        phase: Phase,
        desired: CapabilitySet,
    ) -> Result<CapabilitySet> {
        let mut state = self.state.lock();
        if !env.is_live() {
            return Err(Error::InvalidEnvironment);
        }
        let granted = state
            .pools_mut()?
            .grant(phase, desired, env.capabilities(), env.prohibited)?;
        env.capabilities.store(granted.bits(), Ordering::Release);
        Ok(granted)
    }

    /// Removes `unwanted` from `env`'s capabilities.
    pub fn relinquish_capabilities(&self, env: &Environment, unwanted: CapabilitySet) -> Result<CapabilitySet> {
        let mut state = self.state.lock();
        if !env.is_live() {
            return Err(Error::InvalidEnvironment);
        }
        let kept = state.pools_mut()?.relinquish(unwanted, env.capabilities());
        env.capabilities.store(kept.bits(), Ordering::Release);
        Ok(kept)
    }

    /// A copy of the shared pools, if they exist.
    pub fn pools(&self) -> Option<CapabilityPools> {
        self.state.lock().pools.clone()
    }

    /// Every linked environment from head to tail, disposed ones included.
    pub fn linked(&self) -> Vec<Arc<Environment>> {
        let state = self.state.lock();
        let mut out = Vec::new();
        let mut cursor = state.head;
        while let Some(slot) = cursor {
            match state.node(slot) {
                Ok(node) => {
                    out.push(node.env.clone());
                    cursor = node.next;
                }
                Err(_) => break,
            }
        }
        out
    }

    /// The tail environment, if any.
    pub fn tail(&self) -> Option<Arc<Environment>> {
        let state = self.state.lock();
        state.tail.and_then(|slot| state.node(slot).ok().map(|n| n.env.clone()))
    }

    /// Number of live environments.
    pub fn len(&self) -> usize {
        self.linked().iter().filter(|env| env.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_iterators(&self) -> usize {
        self.state.lock().active_iterators
    }
}

/// A walk over the environments that were linked when it started, skipping
/// the ones disposed since. Holding it defers cleanup.
pub struct EnvIter<'a> {
    registry: &'a EnvironmentRegistry,
    cursor: Option<u32>,
    last: Option<u32>,
}

impl Iterator for EnvIter<'_> {
    type Item = Arc<Environment>;

    fn next(&mut self) -> Option<Arc<Environment>> {
        let state = self.registry.state.lock();
        while let Some(slot) = self.cursor {
            let node = state.node(slot).ok()?;
            self.cursor = if Some(slot) == self.last { None } else { node.next };
            if node.env.is_live() {
                return Some(node.env.clone());
            }
        }
        None
    }
}

impl Drop for EnvIter<'_> {
    fn drop(&mut self) {
        self.registry.leave_iteration();
    }
}
