//! Sync engine behaviour: coalescing, resync, inbound routing, idempotence.

mod support;

use std::sync::Arc;
use std::time::Duration;

use slumber_core::{Automation, ControlMessage, OscValue, Provenance, SyncState};
use slumber_sync::{CommandDispatcher, EngineHandle, Routes, SyncEngine};
use support::{collaborators, fleet, Call, Recorder, RecordingSink};
use tokio::sync::broadcast;

const SLEEP_MODE: &str = "/avatar/parameters/Oyasumi/SleepMode";
const SLEEPING_ANIMATIONS: &str = "/avatar/parameters/Oyasumi/SleepingAnimations";
const STATUS_AUTOMATIONS: &str = "/avatar/parameters/Oyasumi/StatusAutomations";
const CMD: &str = "/avatar/parameters/Oyasumi/Cmd";

struct Harness {
    engine: SyncEngine<RecordingSink>,
    handle: EngineHandle,
    sink: RecordingSink,
    recorder: Arc<Recorder>,
}

/// Engine whose initial broadcast has already been flushed and discarded.
fn harness() -> Harness {
    let recorder = Recorder::with_devices(fleet());
    let sink = RecordingSink::default();
    let dispatcher = CommandDispatcher::new(collaborators(&recorder));
    let (mut engine, handle) = SyncEngine::new(Routes::new("Oyasumi"), sink.clone(), dispatcher);
    engine.turn();
    sink.take();
    Harness {
        engine,
        handle,
        sink,
        recorder,
    }
}

fn triple(sleep: bool, animations: bool, status: bool) -> Vec<ControlMessage> {
    vec![
        ControlMessage::bool(SLEEP_MODE, sleep),
        ControlMessage::bool(SLEEPING_ANIMATIONS, animations),
        ControlMessage::bool(STATUS_AUTOMATIONS, status),
    ]
}

#[test]
fn first_turn_broadcasts_initial_state() {
    let recorder = Recorder::with_devices(vec![]);
    let sink = RecordingSink::default();
    let (mut engine, _handle) = SyncEngine::new(
        Routes::new("Oyasumi"),
        sink.clone(),
        CommandDispatcher::new(collaborators(&recorder)),
    );

    engine.turn();
    assert_eq!(sink.take(), triple(false, false, false));
}

#[test]
fn burst_of_upstream_changes_coalesces_into_one_triple() {
    let mut h = harness();

    h.handle.set_sleep_mode(true).expect("send");
    h.handle.set_sleeping_animations(true).expect("send");
    h.handle.set_status_automations(true).expect("send");
    h.handle.set_sleeping_animations(false).expect("send");
    h.handle.set_sleeping_animations(true).expect("send");

    assert_eq!(h.engine.turn(), 5);
    assert_eq!(h.sink.take(), triple(true, true, true));
    assert_eq!(h.handle.stats().broadcasts, 2, "initial + one coalesced broadcast");
}

#[test]
fn upstream_value_equal_to_state_sends_nothing() {
    let mut h = harness();
    h.handle.set_sleep_mode(false).expect("send");
    h.engine.turn();
    assert!(h.sink.take().is_empty());
}

#[test]
fn resync_without_changes_resends_full_state() {
    let mut h = harness();
    h.handle.set_status_automations(true).expect("send");
    h.engine.turn();
    h.sink.take();

    h.handle.request_resync().expect("send");
    h.engine.turn();
    assert_eq!(h.sink.take(), triple(false, false, true));
}

#[test]
fn avatar_change_triggers_resync() {
    let mut h = harness();
    h.handle
        .deliver(ControlMessage::new(
            "/avatar/change",
            vec![OscValue::String("avtr_0000".to_string())],
        ))
        .expect("send");
    h.engine.turn();
    assert_eq!(h.sink.take(), triple(false, false, false));
}

#[test]
fn inbound_toggle_equal_to_state_is_a_no_op() {
    let mut h = harness();
    h.handle
        .deliver(ControlMessage::bool(SLEEP_MODE, false))
        .expect("send");
    h.handle
        .deliver(ControlMessage::bool(STATUS_AUTOMATIONS, false))
        .expect("send");
    h.engine.turn();

    assert!(h.recorder.calls().is_empty());
    assert!(h.sink.take().is_empty());
}

#[test]
fn inbound_sleep_mode_enables_once_without_echo() {
    let mut h = harness();
    h.handle
        .deliver(ControlMessage::bool(SLEEP_MODE, true))
        .expect("send");
    h.engine.turn();

    assert_eq!(h.recorder.calls(), vec![Call::EnableSleep(Provenance::OscControl)]);
    assert!(h.sink.take().is_empty(), "received value must not be echoed");
    assert!(h.engine.state().sleep_mode);

    // The sleep service reporting the new value back is not a change either.
    h.handle.set_sleep_mode(true).expect("send");
    h.handle
        .deliver(ControlMessage::bool(SLEEP_MODE, true))
        .expect("send");
    h.engine.turn();
    assert!(h.sink.take().is_empty());
    assert_eq!(h.recorder.calls().len(), 1);
}

#[test]
fn inbound_toggles_update_automations_with_provenance() {
    let mut h = harness();
    h.handle
        .deliver(ControlMessage::bool(SLEEPING_ANIMATIONS, true))
        .expect("send");
    h.handle
        .deliver(ControlMessage::bool(STATUS_AUTOMATIONS, true))
        .expect("send");
    h.engine.turn();

    assert_eq!(
        h.recorder.calls(),
        vec![
            Call::Automation(Automation::SleepingAnimations, true, Provenance::OscControl),
            Call::Automation(
                Automation::ChangeStatusBasedOnPlayerCount,
                true,
                Provenance::OscControl
            ),
        ]
    );
}

#[tokio::test]
async fn initialize_command_acks_then_resyncs() {
    let mut h = harness();
    h.handle.deliver(ControlMessage::int(CMD, 1)).expect("send");
    h.engine.turn();

    let mut expected = vec![ControlMessage::int(CMD, 0)];
    expected.extend(triple(false, false, false));
    assert_eq!(h.sink.take(), expected);
}

#[tokio::test]
async fn tracker_command_powers_off_trackers() {
    let mut h = harness();
    h.handle.deliver(ControlMessage::int(CMD, 2)).expect("send");
    h.engine.turn();

    assert_eq!(h.recorder.calls(), vec![Call::PowerOff(vec![3, 4])]);
    assert!(h.sink.take().is_empty());
}

#[test]
fn ignored_messages_are_counted_not_acted_on() {
    let mut h = harness();
    h.handle
        .deliver(ControlMessage::int(CMD, 99))
        .expect("send");
    h.handle
        .deliver(ControlMessage::bool("/avatar/parameters/Other/SleepMode", true))
        .expect("send");
    h.handle
        .deliver(ControlMessage::int(SLEEP_MODE, 1))
        .expect("send");
    h.handle
        .deliver(ControlMessage::new(CMD, vec![]))
        .expect("send");
    h.engine.turn();

    assert!(h.recorder.calls().is_empty());
    assert!(h.sink.take().is_empty());
    let stats = h.handle.stats();
    assert_eq!(stats.unknown_commands, 1);
    assert_eq!(stats.unmatched_addresses, 1);
    assert_eq!(stats.type_mismatches, 2);
}

#[tokio::test]
async fn run_loop_publishes_state_and_stops_on_shutdown() {
    let recorder = Recorder::with_devices(vec![]);
    let sink = RecordingSink::default();
    let (engine, handle) = SyncEngine::new(
        Routes::new("Oyasumi"),
        sink.clone(),
        CommandDispatcher::new(collaborators(&recorder)),
    );
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(engine.run(shutdown_rx));

    handle.set_sleep_mode(true).expect("send");
    let mut state = handle.subscribe();
    tokio::time::timeout(Duration::from_secs(2), state.wait_for(|s| s.sleep_mode))
        .await
        .expect("state published")
        .expect("engine alive");
    assert_eq!(
        handle.state(),
        SyncState {
            sleep_mode: true,
            ..SyncState::default()
        }
    );

    shutdown_tx.send(()).expect("shutdown");
    task.await.expect("join").expect("engine result");

    let sent = sink.take();
    assert_eq!(&sent[sent.len() - 3..], triple(true, false, false).as_slice());
    assert!(handle.set_sleep_mode(false).is_err(), "engine gone");
}
