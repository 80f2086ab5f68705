//! Parameter sync engine.
//!
//! All state mutation happens on the task running [`SyncEngine::run`]. Every
//! producer (automation configs, the sleep service, the OSC receive loop)
//! queues an [`EngineEvent`] through an [`EngineHandle`]. One loop turn
//! drains every event that is already queued and then broadcasts the state at
//! most once, so a burst of upstream changes never produces a partial or
//! repeated triple on the wire.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};

use slumber_core::{ControlMessage, OscValue, SyncField, SyncState};
use slumber_osc::OscSink;

use crate::dispatcher::{Command, CommandDispatcher, CommandOutcome};
use crate::error::SyncError;
use crate::routes::{Route, Routes};

/// Input to the engine loop.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Latest value of an upstream source.
    Upstream(SyncField, bool),
    /// Re-broadcast everything, changed or not.
    Resync,
    /// A decoded message from the game.
    Inbound(ControlMessage),
}

/// Counters for messages the engine accepted but did not act on.
#[derive(Debug, Default)]
pub struct EngineStats {
    broadcasts: AtomicU64,
    resyncs: AtomicU64,
    unmatched_addresses: AtomicU64,
    unknown_commands: AtomicU64,
    type_mismatches: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub broadcasts: u64,
    pub resyncs: u64,
    pub unmatched_addresses: u64,
    pub unknown_commands: u64,
    pub type_mismatches: u64,
}

impl EngineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            unmatched_addresses: self.unmatched_addresses.load(Ordering::Relaxed),
            unknown_commands: self.unknown_commands.load(Ordering::Relaxed),
            type_mismatches: self.type_mismatches.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cloneable producer side of the engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    events: mpsc::UnboundedSender<EngineEvent>,
    state: watch::Receiver<SyncState>,
    stats: Arc<EngineStats>,
}

impl EngineHandle {
    pub fn set(&self, field: SyncField, value: bool) -> Result<(), SyncError> {
        self.send(EngineEvent::Upstream(field, value))
    }

    pub fn set_sleep_mode(&self, value: bool) -> Result<(), SyncError> {
        self.set(SyncField::SleepMode, value)
    }

    pub fn set_sleeping_animations(&self, value: bool) -> Result<(), SyncError> {
        self.set(SyncField::SleepingAnimations, value)
    }

    pub fn set_status_automations(&self, value: bool) -> Result<(), SyncError> {
        self.set(SyncField::StatusAutomations, value)
    }

    pub fn request_resync(&self) -> Result<(), SyncError> {
        self.send(EngineEvent::Resync)
    }

    /// Hand an inbound message to the engine.
    pub fn deliver(&self, message: ControlMessage) -> Result<(), SyncError> {
        self.send(EngineEvent::Inbound(message))
    }

    /// State as of the end of the last completed turn.
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn send(&self, event: EngineEvent) -> Result<(), SyncError> {
        self.events
            .send(event)
            .map_err(|_| SyncError::ChannelClosed("sync engine events"))
    }
}

pub struct SyncEngine<S> {
    routes: Routes,
    sink: S,
    dispatcher: CommandDispatcher,
    state: SyncState,
    flush_pending: bool,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    published: watch::Sender<SyncState>,
    stats: Arc<EngineStats>,
}

impl<S: OscSink> SyncEngine<S> {
    /// Build an engine with all fields `false`.
    ///
    /// The first turn always broadcasts, so the game learns the initial
    /// state even if no upstream source changes it.
    pub fn new(routes: Routes, sink: S, dispatcher: CommandDispatcher) -> (Self, EngineHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (published, state_rx) = watch::channel(SyncState::default());
        let stats = Arc::new(EngineStats::default());

        let engine = Self {
            routes,
            sink,
            dispatcher,
            state: SyncState::default(),
            flush_pending: true,
            events: events_rx,
            published,
            stats: stats.clone(),
        };
        let handle = EngineHandle {
            events: events_tx,
            state: state_rx,
            stats,
        };
        (engine, handle)
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Run until shutdown is signalled or every handle is dropped.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), SyncError> {
        self.turn();
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                event = self.events.recv() => {
                    let Some(event) = event else { break };
                    self.handle(event);
                    self.turn();
                }
            }
        }
        tracing::debug!("sync engine stopped");
        Ok(())
    }

    /// Handle every queued event, then broadcast once if anything asked for it.
    ///
    /// Returns the number of events handled.
    pub fn turn(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle(event);
            handled += 1;
        }
        self.flush();
        self.published.send_replace(self.state);
        handled
    }

    fn handle(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Upstream(field, value) => {
                if self.state.set(field, value) {
                    self.flush_pending = true;
                }
            }
            EngineEvent::Resync => self.schedule_resync(),
            EngineEvent::Inbound(message) => self.handle_inbound(message),
        }
    }

    fn handle_inbound(&mut self, message: ControlMessage) {
        let Some(route) = self.routes.route(&message.address) else {
            EngineStats::bump(&self.stats.unmatched_addresses);
            tracing::trace!(address = %message.address, "ignoring unrouted address");
            return;
        };

        match route {
            Route::AvatarChange => self.schedule_resync(),
            Route::Command => {
                let Some(code) = self.expect_value(&message, OscValue::as_int) else {
                    return;
                };
                match self.dispatcher.dispatch_command(code) {
                    CommandOutcome::Resync => {
                        self.schedule_resync();
                        let ack = ControlMessage::int(self.routes.command_address(), Command::ACK);
                        self.send(&ack);
                    }
                    CommandOutcome::Ignored => EngineStats::bump(&self.stats.unknown_commands),
                    CommandOutcome::PoweredOff | CommandOutcome::Scheduled => {}
                }
            }
            Route::Toggle(field) => {
                let Some(requested) = self.expect_value(&message, OscValue::as_bool) else {
                    return;
                };
                let current = self.state.get(field);
                if self.dispatcher.apply_toggle(field, current, requested) {
                    // Recorded without a broadcast: the game already holds this value.
                    self.state.set(field, requested);
                }
            }
        }
    }

    fn expect_value<T>(
        &self,
        message: &ControlMessage,
        extract: impl Fn(&OscValue) -> Option<T>,
    ) -> Option<T> {
        let value = message.first().and_then(extract);
        if value.is_none() {
            EngineStats::bump(&self.stats.type_mismatches);
            tracing::warn!(
                address = %message.address,
                found = message.first().map(OscValue::type_name).unwrap_or("nothing"),
                "unexpected argument type",
            );
        }
        value
    }

    fn schedule_resync(&mut self) {
        EngineStats::bump(&self.stats.resyncs);
        self.flush_pending = true;
    }

    fn flush(&mut self) {
        if !std::mem::take(&mut self.flush_pending) {
            return;
        }
        EngineStats::bump(&self.stats.broadcasts);
        for field in SyncField::ALL {
            let message = ControlMessage::bool(self.routes.field_address(field), self.state.get(field));
            self.send(&message);
        }
        tracing::debug!(state = ?self.state, "broadcast sync state");
    }

    fn send(&self, message: &ControlMessage) {
        if let Err(err) = self.sink.send(message) {
            tracing::warn!(error = %err, address = %message.address, "failed to send control message");
        }
    }
}
