//! Event enablement, callback tables and dispatch.

mod common;

use std::mem;
use std::ptr;

use common::{host_in, init_test_logging, recording_callbacks, thread, Recorder};
use jvmti_host::jvmti::{self, jvmtiEventCallbacks};
use jvmti_host::{Capability, CapabilitySet, Error, EventKind, Phase};

#[test]
fn enabled_event_reaches_bound_callback() {
    init_test_logging();
    let (host, _runtime) = host_in(Phase::Live);
    let env = host.create_environment().unwrap();
    let recorder = Recorder::attach(&host, &env);

    host.set_event_callbacks(&env, Some(&recording_callbacks())).unwrap();
    host.set_event_enabled(&env, EventKind::ThreadStart, true).unwrap();

    assert_eq!(host.post_thread_start(thread(7)), 1);
    assert_eq!(host.post_vm_death(), 0, "VMDeath was never enabled");
    assert_eq!(recorder.events(), vec![EventKind::ThreadStart]);
    assert_eq!(*recorder.threads.lock(), vec![7]);
}

#[test]
fn disabled_event_is_not_delivered() {
    init_test_logging();
    let (host, _runtime) = host_in(Phase::Live);
    let env = host.create_environment().unwrap();
    let recorder = Recorder::attach(&host, &env);
    host.set_event_callbacks(&env, Some(&recording_callbacks())).unwrap();

    host.set_event_enabled(&env, EventKind::ThreadStart, true).unwrap();
    host.set_event_enabled(&env, EventKind::ThreadStart, false).unwrap();
    assert!(!env.is_event_enabled(EventKind::ThreadStart));
    assert_eq!(host.post_thread_start(thread(1)), 0);
    assert!(recorder.events().is_empty());
}

#[test]
fn enabled_event_without_callback_is_skipped() {
    init_test_logging();
    let (host, _runtime) = host_in(Phase::Live);
    let env = host.create_environment().unwrap();
    let recorder = Recorder::attach(&host, &env);

    host.set_event_enabled(&env, EventKind::DataDumpRequest, true).unwrap();
    assert_eq!(host.post_data_dump_request(), 0);
    assert!(recorder.events().is_empty());
}

#[test]
fn smaller_callback_table_revokes_missing_slots() {
    init_test_logging();
    let (host, _runtime) = host_in(Phase::Live);
    let env = host.create_environment().unwrap();
    let recorder = Recorder::attach(&host, &env);
    host.add_capabilities(&env, CapabilitySet::of(&[Capability::GenerateGarbageCollectionEvents]))
        .unwrap();

    let callbacks = recording_callbacks();
    host.set_event_callbacks(&env, Some(&callbacks)).unwrap();
    host.set_event_enabled(&env, EventKind::ThreadStart, true).unwrap();
    host.set_event_enabled(&env, EventKind::GarbageCollectionStart, true).unwrap();

    // Only the slots up to and including ThreadStart.
    let size = (3 * mem::size_of::<usize>()) as jvmti_host::jni::jint;
    let status = unsafe {
        jvmti_host::functions::SetEventCallbacks(env.external(), &callbacks, size)
    };
    assert_eq!(status, jvmti::jvmtiError::NONE);

    assert!(env.callbacks().is_bound(EventKind::ThreadStart));
    assert!(!env.callbacks().is_bound(EventKind::GarbageCollectionStart));
    assert_eq!(host.post_garbage_collection_start(), 0);
    assert_eq!(host.post_thread_start(thread(3)), 1);
    assert_eq!(recorder.events(), vec![EventKind::ThreadStart]);

    host.set_event_callbacks(&env, None).unwrap();
    assert!(env.callbacks().bound().is_empty());
}

#[test]
fn every_live_environment_with_the_event_enabled_is_called() {
    init_test_logging();
    let (host, _runtime) = host_in(Phase::OnLoad);
    let a = host.create_environment().unwrap();
    let b = host.create_environment().unwrap();
    let c = host.create_environment().unwrap();
    let recorders: Vec<_> = [&a, &b, &c].iter().map(|env| Recorder::attach(&host, env)).collect();

    for env in [&a, &b, &c] {
        host.set_event_callbacks(env, Some(&recording_callbacks())).unwrap();
    }
    host.set_event_enabled(&a, EventKind::VmStart, true).unwrap();
    host.set_event_enabled(&c, EventKind::VmStart, true).unwrap();
    host.set_event_enabled(&c, EventKind::VmInit, true).unwrap();

    assert_eq!(host.post_vm_start(), 2);
    assert_eq!(host.current_phase(), Phase::Start);
    assert_eq!(host.post_vm_init(thread(1)), 1);
    assert_eq!(host.current_phase(), Phase::Live);

    assert_eq!(recorders[0].events(), vec![EventKind::VmStart]);
    assert!(recorders[1].events().is_empty());
    assert_eq!(recorders[2].events(), vec![EventKind::VmStart, EventKind::VmInit]);
}

#[test]
fn environment_disposed_by_a_callback_is_skipped_then_freed() {
    init_test_logging();
    let (host, _runtime) = host_in(Phase::Live);
    let a = host.create_environment().unwrap();
    let b = host.create_environment().unwrap();
    let rec_a = Recorder::attach(&host, &a);
    let rec_b = Recorder::attach(&host, &b);

    for env in [&a, &b] {
        host.set_event_callbacks(env, Some(&recording_callbacks())).unwrap();
        host.set_event_enabled(env, EventKind::ThreadStart, true).unwrap();
    }
    *rec_a.dispose_on_callback.lock() = Some(b.clone());

    assert_eq!(host.post_thread_start(thread(9)), 1);
    assert_eq!(rec_a.events(), vec![EventKind::ThreadStart]);
    assert!(rec_b.events().is_empty());

    assert!(!b.is_live());
    assert_eq!(host.environments().active_iterators(), 0);
    let linked: Vec<u32> = host.environments().linked().iter().map(|e| e.slot()).collect();
    assert_eq!(linked, vec![a.slot()]);
}

#[test]
fn vm_death_is_delivered_before_the_phase_changes() {
    init_test_logging();
    let (host, _runtime) = host_in(Phase::Live);
    let env = host.create_environment().unwrap();
    let recorder = Recorder::attach(&host, &env);
    host.set_event_callbacks(&env, Some(&recording_callbacks())).unwrap();
    host.set_event_enabled(&env, EventKind::VmDeath, true).unwrap();

    assert_eq!(host.post_vm_death(), 1);
    assert_eq!(recorder.events(), vec![EventKind::VmDeath]);
    assert_eq!(host.current_phase(), Phase::Dead);
    assert_eq!(host.create_environment().err(), Some(Error::WrongPhase));
}

#[test]
fn monitor_events_need_the_monitor_capability() {
    init_test_logging();
    let (host, _runtime) = host_in(Phase::Live);
    let env = host.create_environment().unwrap();
    let recorder = Recorder::attach(&host, &env);
    host.set_event_callbacks(&env, Some(&recording_callbacks())).unwrap();

    assert_eq!(
        host.set_event_enabled(&env, EventKind::MonitorWaited, true),
        Err(Error::MustPossessCapability)
    );
    // Disabling never needs the capability.
    host.set_event_enabled(&env, EventKind::MonitorWaited, false).unwrap();

    host.add_capabilities(&env, CapabilitySet::of(&[Capability::GenerateMonitorEvents]))
        .unwrap();
    host.set_event_enabled(&env, EventKind::MonitorWaited, true).unwrap();
    assert_eq!(host.post_monitor_waited(thread(2), ptr::null_mut(), true), 1);
    assert_eq!(recorder.events(), vec![EventKind::MonitorWaited]);
}

#[test]
fn notification_mode_argument_checks() {
    init_test_logging();
    let (host, _runtime) = host_in(Phase::Live);
    let env = host.create_environment().unwrap();
    let null = ptr::null_mut();

    assert_eq!(
        host.set_event_notification_mode(&env, jvmti::JVMTI_ENABLE, 49, null),
        Err(Error::InvalidEventType)
    );
    assert_eq!(
        host.set_event_notification_mode(&env, jvmti::JVMTI_ENABLE, 89, null),
        Err(Error::InvalidEventType)
    );
    assert_eq!(
        host.set_event_notification_mode(&env, jvmti::JVMTI_ENABLE, jvmti::JVMTI_EVENT_CLASS_LOAD, null),
        Err(Error::AccessDenied)
    );
    assert_eq!(
        host.set_event_notification_mode(&env, 2, jvmti::JVMTI_EVENT_THREAD_START, null),
        Err(Error::IllegalArgument)
    );
    assert_eq!(
        host.set_event_notification_mode(&env, jvmti::JVMTI_ENABLE, jvmti::JVMTI_EVENT_VM_INIT, thread(1)),
        Err(Error::IllegalArgument)
    );
    assert_eq!(
        host.set_event_notification_mode(&env, jvmti::JVMTI_ENABLE, jvmti::JVMTI_EVENT_THREAD_END, thread(1)),
        Err(Error::AccessDenied)
    );
    host.set_event_notification_mode(&env, jvmti::JVMTI_ENABLE, jvmti::JVMTI_EVENT_THREAD_END, null)
        .unwrap();
    assert!(env.is_event_enabled(EventKind::ThreadEnd));
}

#[test]
fn event_calls_reject_wrong_phase() {
    init_test_logging();
    let (host, _runtime) = host_in(Phase::Start);
    let env = host.create_environment().unwrap();
    assert_eq!(host.set_event_callbacks(&env, None), Err(Error::WrongPhase));
    assert_eq!(
        host.set_event_enabled(&env, EventKind::ThreadStart, true),
        Err(Error::WrongPhase)
    );
}

#[test]
fn disposal_clears_enablement_and_callbacks() {
    init_test_logging();
    let (host, _runtime) = host_in(Phase::Live);
    let env = host.create_environment().unwrap();
    let _other = host.create_environment().unwrap();
    host.set_event_callbacks(&env, Some(&recording_callbacks())).unwrap();
    host.set_event_enabled(&env, EventKind::ThreadStart, true).unwrap();

    host.dispose_environment(&env).unwrap();
    assert!(!env.is_event_enabled(EventKind::ThreadStart));
    assert!(env.callbacks().bound().is_empty());
    assert_eq!(host.post_thread_start(thread(1)), 0);
}

#[test]
fn callbacks_table_layout_matches_event_numbers() {
    let callbacks = jvmtiEventCallbacks {
        GarbageCollectionFinish: Some(common::on_gc_finish),
        ..Default::default()
    };
    assert!(callbacks.is_bound(jvmti::JVMTI_EVENT_GARBAGE_COLLECTION_FINISH));
    assert!(!callbacks.is_bound(jvmti::JVMTI_EVENT_GARBAGE_COLLECTION_START));
    assert!(!callbacks.is_bound(200));
}
