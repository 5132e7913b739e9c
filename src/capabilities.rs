//! Capability bitsets and the shared pools environments negotiate against.
//!
//! Every capability has a fixed ordinal (its bit position in the
//! `jvmtiCapabilities` bitfield). A [`CapabilitySet`] packs them into one
//! word. [`CapabilityPools`] holds the VM-wide state: which capabilities are
//! grantable at any time, which only during `OnLoad`, which are solo (held by
//! at most one environment), and which have ever been acquired.

use std::fmt;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::sys::jni::jint;
use crate::sys::jvmti::{self, jvmtiCapabilities};

macro_rules! capabilities {
    ($( $ordinal:literal => $variant:ident, $accessor:ident; )*) => {
        /// A named capability. The discriminant is its bit position.
        #[repr(u8)]
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Capability {
            $( $variant = $ordinal, )*
        }

        impl Capability {
            /// All capabilities, in ordinal order.
            pub const ALL: &'static [Capability] = &[ $( Capability::$variant, )* ];

            /// The field name used in `jvmtiCapabilities`.
            pub fn name(self) -> &'static str {
                match self {
                    $( Capability::$variant => stringify!($accessor), )*
                }
            }

            pub fn from_ordinal(ordinal: u8) -> Option<Capability> {
                match ordinal {
                    $( $ordinal => Some(Capability::$variant), )*
                    _ => None,
                }
            }

            pub fn ordinal(self) -> u8 {
                self as u8
            }
        }

        impl CapabilitySet {
            $(
                pub fn $accessor(self) -> bool {
                    self.contains(Capability::$variant)
                }
            )*
        }
    };
}

capabilities! {
    0 => TagObjects, can_tag_objects;
    1 => GenerateFieldModificationEvents, can_generate_field_modification_events;
    2 => GenerateFieldAccessEvents, can_generate_field_access_events;
    3 => GetBytecodes, can_get_bytecodes;
    4 => GetSyntheticAttribute, can_get_synthetic_attribute;
    5 => GetOwnedMonitorInfo, can_get_owned_monitor_info;
    6 => GetCurrentContendedMonitor, can_get_current_contended_monitor;
    7 => GetMonitorInfo, can_get_monitor_info;
    8 => PopFrame, can_pop_frame;
    9 => RedefineClasses, can_redefine_classes;
    10 => SignalThread, can_signal_thread;
    11 => GetSourceFileName, can_get_source_file_name;
    12 => GetLineNumbers, can_get_line_numbers;
    13 => GetSourceDebugExtension, can_get_source_debug_extension;
    14 => AccessLocalVariables, can_access_local_variables;
    15 => MaintainOriginalMethodOrder, can_maintain_original_method_order;
    16 => GenerateSingleStepEvents, can_generate_single_step_events;
    17 => GenerateExceptionEvents, can_generate_exception_events;
    18 => GenerateFramePopEvents, can_generate_frame_pop_events;
    19 => GenerateBreakpointEvents, can_generate_breakpoint_events;
    20 => Suspend, can_suspend;
    21 => RedefineAnyClass, can_redefine_any_class;
    22 => GetCurrentThreadCpuTime, can_get_current_thread_cpu_time;
    23 => GetThreadCpuTime, can_get_thread_cpu_time;
    24 => GenerateMethodEntryEvents, can_generate_method_entry_events;
    25 => GenerateMethodExitEvents, can_generate_method_exit_events;
    26 => GenerateAllClassHookEvents, can_generate_all_class_hook_events;
    27 => GenerateCompiledMethodLoadEvents, can_generate_compiled_method_load_events;
    28 => GenerateMonitorEvents, can_generate_monitor_events;
    29 => GenerateVmObjectAllocEvents, can_generate_vm_object_alloc_events;
    30 => GenerateNativeMethodBindEvents, can_generate_native_method_bind_events;
    31 => GenerateGarbageCollectionEvents, can_generate_garbage_collection_events;
    32 => GenerateObjectFreeEvents, can_generate_object_free_events;
    33 => ForceEarlyReturn, can_force_early_return;
    34 => GetOwnedMonitorStackDepthInfo, can_get_owned_monitor_stack_depth_info;
    35 => GetConstantPool, can_get_constant_pool;
    36 => SetNativeMethodPrefix, can_set_native_method_prefix;
    37 => RetransformClasses, can_retransform_classes;
    38 => RetransformAnyClass, can_retransform_any_class;
    39 => GenerateResourceExhaustionHeapEvents, can_generate_resource_exhaustion_heap_events;
    40 => GenerateResourceExhaustionThreadsEvents, can_generate_resource_exhaustion_threads_events;
    41 => GenerateEarlyVmstart, can_generate_early_vmstart;
    42 => GenerateEarlyClassHookEvents, can_generate_early_class_hook_events;
    43 => GenerateSampledObjectAllocEvents, can_generate_sampled_object_alloc_events;
    44 => SupportVirtualThreads, can_support_virtual_threads;
}

// =============================================================================
// CapabilitySet
// =============================================================================

/// A set of capabilities, one bit per ordinal.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet(u64);

impl CapabilitySet {
    /// Bits that correspond to a defined capability.
    pub const DEFINED: u64 = (1 << 45) - 1;

    pub const fn empty() -> Self {
        CapabilitySet(0)
    }

    /// Every defined capability.
    pub const fn all() -> Self {
        CapabilitySet(Self::DEFINED)
    }

    /// Builds a set from raw bits. Undefined bits are discarded.
    pub const fn from_bits(bits: u64) -> Self {
        CapabilitySet(bits & Self::DEFINED)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn of(caps: &[Capability]) -> Self {
        caps.iter().copied().collect()
    }

    pub fn contains(self, cap: Capability) -> bool {
        self.0 & (1 << cap.ordinal()) != 0
    }

    pub fn with(self, cap: Capability) -> Self {
        CapabilitySet(self.0 | 1 << cap.ordinal())
    }

    pub fn without(self, cap: Capability) -> Self {
        CapabilitySet(self.0 & !(1 << cap.ordinal()))
    }

    pub fn set(&mut self, cap: Capability, value: bool) {
        *self = if value { self.with(cap) } else { self.without(cap) };
    }

    pub fn intersect(self, other: Self) -> Self {
        CapabilitySet(self.0 & other.0)
    }

    pub fn union(self, other: Self) -> Self {
        CapabilitySet(self.0 | other.0)
    }

    /// Members of `self` that are not in `other`.
    pub fn subtract(self, other: Self) -> Self {
        CapabilitySet(self.0 & !other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_subset_of(self, other: Self) -> bool {
        self.subtract(other).is_empty()
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.iter().copied().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(CapabilitySet::empty(), |set, cap| set.with(cap))
    }
}

impl From<jvmtiCapabilities> for CapabilitySet {
    fn from(raw: jvmtiCapabilities) -> Self {
        CapabilitySet::from_bits(raw.to_word())
    }
}

impl From<CapabilitySet> for jvmtiCapabilities {
    fn from(set: CapabilitySet) -> Self {
        jvmtiCapabilities::from_word(set.bits())
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Capability::name)).finish()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capabilities [")?;
        for (i, cap) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", cap.name())?;
        }
        write!(f, "]")
    }
}

// =============================================================================
// Phase
// =============================================================================

/// VM execution phase as reported by `GetPhase`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    OnLoad,
    Primordial,
    Start,
    Live,
    Dead,
}

impl Phase {
    pub fn to_raw(self) -> jint {
        match self {
            Phase::OnLoad => jvmti::JVMTI_PHASE_ONLOAD,
            Phase::Primordial => jvmti::JVMTI_PHASE_PRIMORDIAL,
            Phase::Start => jvmti::JVMTI_PHASE_START,
            Phase::Live => jvmti::JVMTI_PHASE_LIVE,
            Phase::Dead => jvmti::JVMTI_PHASE_DEAD,
        }
    }

    pub fn from_raw(raw: jint) -> Option<Phase> {
        match raw {
            jvmti::JVMTI_PHASE_ONLOAD => Some(Phase::OnLoad),
            jvmti::JVMTI_PHASE_PRIMORDIAL => Some(Phase::Primordial),
            jvmti::JVMTI_PHASE_START => Some(Phase::Start),
            jvmti::JVMTI_PHASE_LIVE => Some(Phase::Live),
            jvmti::JVMTI_PHASE_DEAD => Some(Phase::Dead),
            _ => None,
        }
    }
}

// =============================================================================
// Pools
// =============================================================================

/// The static table the pools are seeded from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CapabilityTable {
    /// Grantable in any phase, to any number of environments.
    pub always: CapabilitySet,
    /// Grantable only during `OnLoad`.
    pub on_load: CapabilitySet,
    /// Grantable in any phase, to one environment at a time.
    pub always_solo: CapabilitySet,
    /// Grantable only during `OnLoad`, to one environment at a time.
    pub on_load_solo: CapabilitySet,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        use Capability::*;
        CapabilityTable {
            always: CapabilitySet::of(&[
                GenerateMonitorEvents,
                GenerateGarbageCollectionEvents,
                SignalThread,
                GetSourceFileName,
                GetLineNumbers,
            ]),
            on_load: CapabilitySet::of(&[
                GenerateMethodEntryEvents,
                GenerateMethodExitEvents,
                GenerateExceptionEvents,
                GenerateAllClassHookEvents,
                GenerateEarlyVmstart,
            ]),
            always_solo: CapabilitySet::of(&[Suspend]),
            on_load_solo: CapabilitySet::of(&[
                GenerateFieldAccessEvents,
                GenerateFieldModificationEvents,
                GenerateBreakpointEvents,
            ]),
        }
    }
}

impl CapabilityTable {
    /// Every capability the table mentions.
    pub fn offered(&self) -> CapabilitySet {
        self.always
            .union(self.on_load)
            .union(self.always_solo)
            .union(self.on_load_solo)
    }
}

/// VM-wide capability state shared by all environments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityPools {
    pub always: CapabilitySet,
    pub on_load: CapabilitySet,
    pub always_solo: CapabilitySet,
    pub on_load_solo: CapabilitySet,
    pub always_solo_remaining: CapabilitySet,
    pub on_load_solo_remaining: CapabilitySet,
    pub acquired: CapabilitySet,
}

impl CapabilityPools {
    /// Fresh pools: every solo capability is unclaimed, nothing acquired.
    pub fn new(table: &CapabilityTable) -> Self {
        CapabilityPools {
            always: table.always,
            on_load: table.on_load,
            always_solo: table.always_solo,
            on_load_solo: table.on_load_solo,
            always_solo_remaining: table.always_solo,
            on_load_solo_remaining: table.on_load_solo,
            acquired: CapabilitySet::empty(),
        }
    }

    /// What an environment holding `current` could hold after a successful
    /// grant in `phase`.
    pub fn potential(
        &self,
        phase: Phase,
        current: CapabilitySet,
        prohibited: CapabilitySet,
    ) -> CapabilitySet {
        compute_potential(
            phase,
            current,
            prohibited,
            self.always,
            self.always_solo_remaining,
            self.on_load,
            self.on_load_solo_remaining,
        )
    }

    /// Grants `desired` to an environment holding `current` and returns its
    /// new set. On `NotAvailable` nothing is modified.
    pub fn grant(
        &mut self,
        phase: Phase,
        desired: CapabilitySet,
        current: CapabilitySet,
        prohibited: CapabilitySet,
    ) -> Result<CapabilitySet> {
        let potential = self.potential(phase, current, prohibited);
        let missing = desired.subtract(potential);
        if !missing.is_empty() {
            warn!(%missing, "capability grant rejected");
            return Err(Error::NotAvailable);
        }

        self.acquired = self.acquired.union(desired);

        // Anything taken during OnLoad stays available for the rest of the run.
        let from_on_load = self.on_load.intersect(desired);
        self.always = self.always.union(from_on_load);
        self.on_load = self.on_load.subtract(from_on_load);

        let from_on_load_solo = self.on_load_solo.intersect(desired);
        self.always_solo = self.always_solo.union(from_on_load_solo);
        self.on_load_solo = self.on_load_solo.subtract(from_on_load_solo);

        self.always_solo_remaining = self.always_solo_remaining.subtract(desired);
        self.on_load_solo_remaining = self.on_load_solo_remaining.subtract(desired);

        let granted = current.union(desired);
        debug!(%desired, %granted, "capabilities granted");
        Ok(granted)
    }

    /// Gives up `unwanted` from an environment holding `current` and returns
    /// its new set. Solo capabilities become claimable again; `acquired` is
    /// left as is.
    pub fn relinquish(&mut self, unwanted: CapabilitySet, current: CapabilitySet) -> CapabilitySet {
        let to_trash = current.intersect(unwanted);

        self.always_solo_remaining = self
            .always_solo_remaining
            .union(self.always_solo.intersect(to_trash));
        self.on_load_solo_remaining = self
            .on_load_solo_remaining
            .union(self.on_load_solo.intersect(to_trash));

        let kept = current.subtract(unwanted);
        if !to_trash.is_empty() {
            debug!(released = %to_trash, "capabilities relinquished");
        }
        kept
    }
}

/// `(always - prohibited) | current | always_solo_remaining`, plus
/// `on_load | on_load_solo_remaining` while the VM is in `OnLoad`.
pub fn compute_potential(
    phase: Phase,
    current: CapabilitySet,
    prohibited: CapabilitySet,
    always: CapabilitySet,
    always_solo_remaining: CapabilitySet,
    on_load: CapabilitySet,
    on_load_solo_remaining: CapabilitySet,
) -> CapabilitySet {
    let mut potential = always
        .subtract(prohibited)
        .union(current)
        .union(always_solo_remaining);
    if phase == Phase::OnLoad {
        potential = potential.union(on_load).union(on_load_solo_remaining);
    }
    potential
}

#[cfg(test)]
mod tests {
    use super::*;
    use Capability::*;

    #[test]
    fn ordinals_match_bitfield_positions() {
        for (i, cap) in Capability::ALL.iter().enumerate() {
            assert_eq!(cap.ordinal() as usize, i);
        }
        assert_eq!(Capability::ALL.len(), 45);
        assert_eq!(Capability::from_ordinal(20), Some(Suspend));
        assert_eq!(Capability::from_ordinal(45), None);
    }

    #[test]
    fn named_accessors_read_bits() {
        let set = CapabilitySet::of(&[TagObjects, SupportVirtualThreads]);
        assert!(set.can_tag_objects());
        assert!(set.can_support_virtual_threads());
        assert!(!set.can_suspend());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn abi_struct_conversion() {
        let set = CapabilitySet::of(&[GenerateMonitorEvents, GenerateSampledObjectAllocEvents]);
        let raw: jvmtiCapabilities = set.into();
        assert!(raw.get_bit(28));
        assert!(raw.get_bit(43));
        assert_eq!(CapabilitySet::from(raw), set);
    }

    #[test]
    fn set_algebra() {
        let a = CapabilitySet::of(&[TagObjects, Suspend]);
        let b = CapabilitySet::of(&[Suspend, PopFrame]);
        assert_eq!(a.intersect(b), CapabilitySet::of(&[Suspend]));
        assert_eq!(a.union(b).len(), 3);
        assert_eq!(a.subtract(b), CapabilitySet::of(&[TagObjects]));
        assert!(a.subtract(a).is_empty());
    }

    #[test]
    fn on_load_capabilities_only_potential_during_on_load() {
        let pools = CapabilityPools::new(&CapabilityTable::default());
        let none = CapabilitySet::empty();
        assert!(pools.potential(Phase::OnLoad, none, none).can_generate_method_entry_events());
        assert!(!pools.potential(Phase::Live, none, none).can_generate_method_entry_events());
        assert!(pools.potential(Phase::Live, none, none).can_suspend());
    }

    #[test]
    fn prohibited_masks_always_but_not_current() {
        let pools = CapabilityPools::new(&CapabilityTable::default());
        let prohibited = CapabilitySet::of(&[GetLineNumbers]);
        let p = pools.potential(Phase::Live, CapabilitySet::empty(), prohibited);
        assert!(!p.can_get_line_numbers());
        let p = pools.potential(Phase::Live, prohibited, prohibited);
        assert!(p.can_get_line_numbers());
    }

    #[test]
    fn grant_during_on_load_makes_capability_permanent() {
        let mut pools = CapabilityPools::new(&CapabilityTable::default());
        let desired = CapabilitySet::of(&[GenerateMethodEntryEvents]);
        let granted = pools
            .grant(Phase::OnLoad, desired, CapabilitySet::empty(), CapabilitySet::empty())
            .unwrap();
        assert_eq!(granted, desired);
        assert!(pools.always.can_generate_method_entry_events());
        assert!(!pools.on_load.can_generate_method_entry_events());
        assert!(pools.acquired.can_generate_method_entry_events());

        // A later environment can still get it after OnLoad.
        let again = pools
            .grant(Phase::Live, desired, CapabilitySet::empty(), CapabilitySet::empty())
            .unwrap();
        assert_eq!(again, desired);
    }

    #[test]
    fn solo_capability_is_exclusive_until_relinquished() {
        let mut pools = CapabilityPools::new(&CapabilityTable::default());
        let suspend = CapabilitySet::of(&[Suspend]);
        let none = CapabilitySet::empty();

        let first = pools.grant(Phase::Live, suspend, none, none).unwrap();
        assert!(!pools.always_solo_remaining.can_suspend());
        assert_eq!(pools.grant(Phase::Live, suspend, none, none), Err(Error::NotAvailable));

        let left = pools.relinquish(suspend, first);
        assert!(left.is_empty());
        assert!(pools.always_solo_remaining.can_suspend());
        assert!(pools.acquired.can_suspend());
        assert!(pools.grant(Phase::Live, suspend, none, none).is_ok());
    }

    #[test]
    fn failed_grant_changes_nothing() {
        let mut pools = CapabilityPools::new(&CapabilityTable::default());
        let before = pools.clone();
        let desired = CapabilitySet::of(&[GetLineNumbers, RedefineClasses]);
        let result = pools.grant(Phase::Live, desired, CapabilitySet::empty(), CapabilitySet::empty());
        assert_eq!(result, Err(Error::NotAvailable));
        assert_eq!(pools, before);
    }

    #[test]
    fn relinquish_ignores_capabilities_not_held() {
        let mut pools = CapabilityPools::new(&CapabilityTable::default());
        let before = pools.clone();
        let kept = pools.relinquish(CapabilitySet::of(&[Suspend]), CapabilitySet::of(&[GetLineNumbers]));
        assert_eq!(kept, CapabilitySet::of(&[GetLineNumbers]));
        assert_eq!(pools, before);
    }
}
