//! Stack traces through the host.

mod common;

use std::ptr;

use common::{host_in, host_with, init_test_logging, internal, thread, throwable_init, visible};
use jvmti_host::jvmti::{self, jvmtiFrameInfo};
use jvmti_host::{Error, JvmtiConfig, Phase, StackFrame};

/// Five visible frames, methods 1..=5, newest first.
fn five_frames() -> Vec<StackFrame> {
    (1..=5).map(|m| visible(m, m as i64 * 10)).collect()
}

fn methods(frames: &[jvmtiFrameInfo]) -> Vec<usize> {
    frames.iter().map(|f| f.method as usize).collect()
}

#[test]
fn full_trace_is_newest_first() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Live);
    runtime.add_thread(1, five_frames());
    let env = host.create_environment().unwrap();

    let frames = host.stack_trace(&env, thread(1), 0, 10).unwrap();
    assert_eq!(methods(&frames), vec![1, 2, 3, 4, 5]);
    assert_eq!(frames[2].location, 30);
    assert_eq!(runtime.quiesce_count(), 1);
    assert!(!runtime.walked_unquiesced());
}

#[test]
fn capacity_limits_the_trace() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Live);
    runtime.add_thread(1, five_frames());
    let env = host.create_environment().unwrap();

    assert_eq!(methods(&host.stack_trace(&env, thread(1), 0, 2).unwrap()), vec![1, 2]);
    assert!(host.stack_trace(&env, thread(1), 0, 0).unwrap().is_empty());
}

#[test]
fn positive_start_depth_skips_newest_frames() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Live);
    runtime.add_thread(1, five_frames());
    let env = host.create_environment().unwrap();

    assert_eq!(methods(&host.stack_trace(&env, thread(1), 3, 10).unwrap()), vec![4, 5]);
    assert_eq!(host.stack_trace(&env, thread(1), 5, 10), Err(Error::IllegalArgument));
}

#[test]
fn negative_start_depth_counts_from_the_oldest_frame() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Live);
    runtime.add_thread(1, five_frames());
    let env = host.create_environment().unwrap();

    assert_eq!(methods(&host.stack_trace(&env, thread(1), -5, 10).unwrap()), vec![1, 2, 3, 4, 5]);
    assert_eq!(methods(&host.stack_trace(&env, thread(1), -2, 10).unwrap()), vec![4, 5]);
    assert_eq!(methods(&host.stack_trace(&env, thread(1), -3, 1).unwrap()), vec![3]);
    assert_eq!(host.stack_trace(&env, thread(1), -6, 10), Err(Error::IllegalArgument));
}

#[test]
fn start_depth_magnitude_is_bounded() {
    init_test_logging();
    let (host, runtime) = host_with(JvmtiConfig::new().phase(Phase::Live).max_stack_depth(4));
    runtime.add_thread(1, five_frames());
    let env = host.create_environment().unwrap();

    assert_eq!(host.stack_trace(&env, thread(1), -5, 10), Err(Error::IllegalArgument));
    assert_eq!(host.stack_trace(&env, thread(1), 5, 10), Err(Error::IllegalArgument));
    assert_eq!(runtime.quiesce_count(), 0);
    assert_eq!(methods(&host.stack_trace(&env, thread(1), -4, 10).unwrap()), vec![2, 3, 4, 5]);
}

#[test]
fn internal_and_throwable_constructor_frames_are_hidden() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Live);
    runtime.add_thread(
        1,
        vec![
            internal(90),
            throwable_init(91),
            throwable_init(92),
            visible(1, 0),
            internal(93),
            throwable_init(94),
            visible(2, 0),
        ],
    );
    let env = host.create_environment().unwrap();

    let frames = host.stack_trace(&env, thread(1), 0, 10).unwrap();
    assert_eq!(methods(&frames), vec![1, 94, 2]);
    assert_eq!(host.frame_count(&env, thread(1)), Ok(3));
}

#[test]
fn thread_resolution_errors() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Live);
    runtime.add_dead_thread(2);
    let env = host.create_environment().unwrap();

    assert_eq!(host.stack_trace(&env, thread(99), 0, 4), Err(Error::InvalidThread));
    assert_eq!(host.stack_trace(&env, thread(2), 0, 4), Err(Error::ThreadNotAlive));
    assert_eq!(host.frame_count(&env, thread(2)), Err(Error::ThreadNotAlive));
    assert_eq!(host.thread_state(&env, thread(2)), Ok(jvmti::JVMTI_THREAD_STATE_TERMINATED));
    assert_eq!(host.thread_state(&env, thread(99)), Err(Error::InvalidThread));
}

#[test]
fn null_thread_means_the_current_thread() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Live);
    runtime.add_thread(4, five_frames());
    let env = host.create_environment().unwrap();

    assert_eq!(host.current_thread(&env), Err(Error::UnattachedThread));
    assert_eq!(host.frame_count(&env, ptr::null_mut()), Err(Error::UnattachedThread));

    runtime.set_current(Some(4));
    assert_eq!(host.current_thread(&env), Ok(thread(4)));
    assert_eq!(host.frame_count(&env, ptr::null_mut()), Ok(5));
    let state = host.thread_state(&env, ptr::null_mut()).unwrap();
    assert_ne!(state & jvmti::JVMTI_THREAD_STATE_ALIVE, 0);
}

#[test]
fn stack_calls_need_the_live_phase() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Start);
    runtime.add_thread(1, five_frames());
    runtime.set_current(Some(1));
    let env = host.create_environment().unwrap();

    assert_eq!(host.stack_trace(&env, thread(1), 0, 4), Err(Error::WrongPhase));
    assert_eq!(host.all_stack_traces(&env, 4).err(), Some(Error::WrongPhase));
    assert_eq!(host.frame_count(&env, thread(1)), Err(Error::WrongPhase));
    assert_eq!(host.current_thread(&env), Ok(thread(1)));
}

#[test]
fn all_stack_traces_cover_every_live_thread() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Live);
    runtime.add_thread(1, five_frames());
    runtime.add_dead_thread(2);
    runtime.add_thread(3, vec![visible(7, 1)]);
    let env = host.create_environment().unwrap();

    let block = host.all_stack_traces(&env, 3).unwrap();
    assert_eq!(block.len(), 2);
    assert_eq!(block.max_frames(), 3);
    assert_eq!(block.infos()[0].thread, thread(1));
    assert_eq!(methods(block.frames(0)), vec![1, 2, 3]);
    assert_eq!(block.infos()[1].thread, thread(3));
    assert_eq!(methods(block.frames(1)), vec![7]);
    assert_eq!(runtime.quiesce_count(), 1);
    assert!(!runtime.walked_unquiesced());
}

#[test]
fn thread_list_reports_dead_threads_with_empty_traces() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Live);
    runtime.add_thread(1, five_frames());
    runtime.add_dead_thread(2);
    let env = host.create_environment().unwrap();

    let block = host
        .thread_list_stack_traces(&env, &[thread(2), thread(1)], 10)
        .unwrap();
    assert_eq!(block.infos()[0].frame_count, 0);
    assert_eq!(block.infos()[0].state, jvmti::JVMTI_THREAD_STATE_TERMINATED);
    assert_eq!(methods(block.frames(1)), vec![1, 2, 3, 4, 5]);
}

#[test]
fn thread_list_with_an_unknown_thread_fails_whole_call() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Live);
    runtime.add_thread(1, five_frames());
    let env = host.create_environment().unwrap();

    let result = host.thread_list_stack_traces(&env, &[thread(1), thread(42)], 10);
    assert_eq!(result.err(), Some(Error::InvalidThread));
}

#[test]
fn negative_max_frame_count_is_illegal() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Live);
    runtime.add_thread(1, five_frames());
    let env = host.create_environment().unwrap();

    assert_eq!(host.stack_trace(&env, thread(1), 0, -1), Err(Error::IllegalArgument));
    assert_eq!(host.all_stack_traces(&env, -1).err(), Some(Error::IllegalArgument));
    assert_eq!(
        host.thread_list_stack_traces(&env, &[thread(1)], -1).err(),
        Some(Error::IllegalArgument)
    );
}

#[test]
fn empty_thread_list_yields_empty_block() {
    init_test_logging();
    let (host, _runtime) = host_in(Phase::Live);
    let env = host.create_environment().unwrap();
    let block = host.thread_list_stack_traces(&env, &[], 8).unwrap();
    assert!(block.is_empty());
    assert!(block.infos().is_empty());
}

#[test]
fn huge_max_frame_count_is_bounded_by_the_stack() {
    init_test_logging();
    let (host, runtime) = host_in(Phase::Live);
    runtime.add_thread(1, five_frames());
    let env = host.create_environment().unwrap();

    let frames = host.stack_trace(&env, thread(1), 0, i32::MAX).unwrap();
    assert_eq!(methods(&frames), vec![1, 2, 3, 4, 5]);
    assert_eq!(methods(&host.stack_trace(&env, thread(1), -2, i32::MAX).unwrap()), vec![4, 5]);
    assert_eq!(runtime.quiesce_count(), 2);
}
