use std::ptr;
use std::sync::{Arc, Weak};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jvmti_host::jni::{jint, jthread, JNIEnv};
use jvmti_host::jvmti::{jvmtiEnv, jvmtiEventCallbacks};
use jvmti_host::{
    Capability, CapabilityPools, CapabilitySet, CapabilityTable, EnvironmentRegistry, EventKind,
    HostRuntime, JvmtiConfig, JvmtiHost, MonitorRegistry, Phase, Result, StackFrame,
};

/// A VM with no threads.
struct IdleRuntime;

impl HostRuntime for IdleRuntime {
    fn resolve_thread(&self, _thread: jthread) -> Result<()> {
        Ok(())
    }

    fn current_thread(&self) -> Option<jthread> {
        None
    }

    fn live_threads(&self) -> Vec<jthread> {
        Vec::new()
    }

    fn thread_state(&self, _thread: jthread) -> Result<jint> {
        Ok(0)
    }

    fn walk_stack(&self, _thread: jthread, _visit: &mut dyn FnMut(&StackFrame) -> bool) {}

    fn run_quiesced(&self, op: &mut dyn FnMut()) {
        op()
    }

    fn jni_env(&self) -> *mut JNIEnv {
        ptr::null_mut()
    }

    fn interrupt_thread(&self, _thread: jthread) -> Result<()> {
        Ok(())
    }
}

unsafe extern "system" fn on_gc_start(_env: *mut jvmtiEnv) {}

fn bench_grant_relinquish(c: &mut Criterion) {
    let table = CapabilityTable::default();
    let desired = CapabilitySet::of(&[
        Capability::GenerateMonitorEvents,
        Capability::GetLineNumbers,
        Capability::Suspend,
    ]);
    c.bench_function("capability_grant_relinquish", |b| {
        let mut pools = CapabilityPools::new(&table);
        let none = CapabilitySet::empty();
        b.iter(|| {
            let held = pools.grant(Phase::Live, black_box(desired), none, none).unwrap();
            pools.relinquish(held, held)
        })
    });
}

fn bench_environment_iteration(c: &mut Criterion) {
    let registry = EnvironmentRegistry::new(CapabilityTable::default());
    let _envs: Vec<_> = (0..16)
        .map(|_| registry.create(Weak::new(), ptr::null(), CapabilitySet::empty()).unwrap())
        .collect();
    c.bench_function("environment_iterate_16", |b| {
        b.iter(|| registry.iter().count())
    });
}

fn bench_event_dispatch(c: &mut Criterion) {
    let host = JvmtiHost::new(JvmtiConfig::new().phase(Phase::Live), Arc::new(IdleRuntime));
    let callbacks = jvmtiEventCallbacks {
        GarbageCollectionStart: Some(on_gc_start),
        ..Default::default()
    };
    let _envs: Vec<_> = (0..8)
        .map(|_| {
            let env = host.create_environment().unwrap();
            host.add_capabilities(&env, CapabilitySet::of(&[Capability::GenerateGarbageCollectionEvents]))
                .unwrap();
            host.set_event_callbacks(&env, Some(&callbacks)).unwrap();
            host.set_event_enabled(&env, EventKind::GarbageCollectionStart, true).unwrap();
            env
        })
        .collect();
    c.bench_function("post_gc_start_8_envs", |b| {
        b.iter(|| black_box(host.post_garbage_collection_start()))
    });
}

fn bench_raw_monitor_enter_exit(c: &mut Criterion) {
    let monitors = MonitorRegistry::new(4);
    let id = monitors.create("bench").unwrap();
    c.bench_function("raw_monitor_enter_exit", |b| {
        b.iter(|| {
            monitors.enter(black_box(id)).unwrap();
            monitors.exit(id).unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_grant_relinquish,
    bench_environment_iteration,
    bench_event_dispatch,
    bench_raw_monitor_enter_exit
);
criterion_main!(benches);
