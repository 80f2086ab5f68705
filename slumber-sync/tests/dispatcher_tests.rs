//! Command table timing and device filtering, on a paused clock.

mod support;

use std::time::Duration;

use rstest::rstest;
use slumber_sync::{Command, CommandDispatcher, CommandOutcome, POWER_OFF_DELAY};
use support::{collaborators, fleet, settle, Call, Recorder};
use tokio::time::advance;

#[rstest]
#[case(1, Some(Command::Initialize))]
#[case(2, Some(Command::DisableTrackers))]
#[case(3, Some(Command::DisableControllers))]
#[case(4, Some(Command::DisableAllDevices))]
#[case(0, None)]
#[case(5, None)]
#[case(-1, None)]
fn command_codes(#[case] code: i32, #[case] expected: Option<Command>) {
    assert_eq!(Command::from_code(code), expected);
}

#[tokio::test(start_paused = true, flavor = "current_thread")]
async fn trackers_power_off_immediately() {
    let recorder = Recorder::with_devices(fleet());
    let mut dispatcher = CommandDispatcher::new(collaborators(&recorder));

    assert_eq!(dispatcher.dispatch_command(2), CommandOutcome::PoweredOff);
    assert_eq!(recorder.calls(), vec![Call::PowerOff(vec![3, 4])]);
}

#[rstest]
#[case::controllers(3, vec![1, 2])]
#[case::all_devices(4, vec![0, 1, 2, 3, 4, 5])]
#[tokio::test(start_paused = true, flavor = "current_thread")]
async fn deferred_commands_wait_for_the_delay(#[case] code: i32, #[case] expected: Vec<u32>) {
    assert_eq!(POWER_OFF_DELAY, Duration::from_millis(2000));
    let recorder = Recorder::with_devices(fleet());
    let mut dispatcher = CommandDispatcher::new(collaborators(&recorder));

    assert_eq!(dispatcher.dispatch_command(code), CommandOutcome::Scheduled);
    settle().await;
    assert!(recorder.calls().is_empty(), "must not fire immediately");

    advance(Duration::from_millis(1999)).await;
    settle().await;
    assert!(recorder.calls().is_empty(), "must not fire before 2000ms");

    advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(recorder.calls(), vec![Call::PowerOff(expected)]);
}

#[tokio::test(start_paused = true, flavor = "current_thread")]
async fn dropping_dispatcher_cancels_pending_power_off() {
    let recorder = Recorder::with_devices(fleet());
    let mut dispatcher = CommandDispatcher::new(collaborators(&recorder));

    dispatcher.dispatch_command(4);
    settle().await;
    drop(dispatcher);

    advance(POWER_OFF_DELAY * 2).await;
    settle().await;
    assert!(recorder.calls().is_empty());
}

#[tokio::test(start_paused = true, flavor = "current_thread")]
async fn empty_class_does_not_call_power_off() {
    let recorder = Recorder::with_devices(vec![]);
    let mut dispatcher = CommandDispatcher::new(collaborators(&recorder));

    dispatcher.dispatch_command(2);
    assert!(recorder.calls().is_empty());
}

#[tokio::test]
async fn toggles_only_fire_on_difference() {
    let recorder = Recorder::with_devices(vec![]);
    let dispatcher = CommandDispatcher::new(collaborators(&recorder));

    assert!(!dispatcher.apply_toggle(slumber_core::SyncField::SleepMode, true, true));
    assert!(dispatcher.apply_toggle(slumber_core::SyncField::SleepMode, true, false));
    assert_eq!(
        recorder.calls(),
        vec![Call::DisableSleep(slumber_core::Provenance::OscControl)]
    );
}
