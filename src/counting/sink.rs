//! Outbound boundary for crossing events and alarm transitions.
//!
//! Sinks are notified synchronously from the frame loop and must return
//! promptly. Anything slow (file writes, telemetry, UI) either buffers
//! internally or hands the message to another thread, as [`ChannelSink`]
//! does. Sink methods cannot fail: counting never depends on delivery.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{info, warn};

use super::event::{AlarmChange, CrossingEvent};

/// Receives what the counter publishes.
pub trait EventSink {
    fn on_event(&mut self, event: &CrossingEvent);
    fn on_alarm_change(&mut self, change: &AlarmChange);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn on_event(&mut self, event: &CrossingEvent) {
        (**self).on_event(event)
    }

    fn on_alarm_change(&mut self, change: &AlarmChange) {
        (**self).on_alarm_change(change)
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn on_event(&mut self, event: &CrossingEvent) {
        (**self).on_event(event)
    }

    fn on_alarm_change(&mut self, change: &AlarmChange) {
        (**self).on_alarm_change(change)
    }
}

/// Fan-out to two sinks, in order.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn on_event(&mut self, event: &CrossingEvent) {
        self.0.on_event(event);
        self.1.on_event(event);
    }

    fn on_alarm_change(&mut self, change: &AlarmChange) {
        self.0.on_alarm_change(change);
        self.1.on_alarm_change(change);
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&mut self, _event: &CrossingEvent) {}
    fn on_alarm_change(&mut self, _change: &AlarmChange) {}
}

/// Keeps every message in memory, in arrival order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordingSink {
    pub events: Vec<CrossingEvent>,
    pub alarms: Vec<AlarmChange>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for RecordingSink {
    fn on_event(&mut self, event: &CrossingEvent) {
        self.events.push(event.clone());
    }

    fn on_alarm_change(&mut self, change: &AlarmChange) {
        self.alarms.push(change.clone());
    }
}

/// Emits every message as a `tracing` event at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn on_event(&mut self, event: &CrossingEvent) {
        info!(
            track = %event.track_id,
            class = %event.class,
            direction = %event.direction,
            frame = event.frame,
            "crossing"
        );
    }

    fn on_alarm_change(&mut self, change: &AlarmChange) {
        if change.raised {
            warn!(class = %change.class, inventory = change.inventory, frame = change.frame, "capacity exceeded");
        } else {
            info!(class = %change.class, inventory = change.inventory, frame = change.frame, "capacity back within limit");
        }
    }
}

/// A message forwarded by [`ChannelSink`].
#[derive(Clone, Debug, PartialEq)]
pub enum SinkMessage {
    Crossing(CrossingEvent),
    Alarm(AlarmChange),
}

/// Forwards messages to another thread over a bounded channel.
///
/// Uses `try_send`, so a full or disconnected channel drops the message
/// instead of stalling the frame loop.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: Sender<SinkMessage>,
    dropped: u64,
}

impl ChannelSink {
    /// Creates a sink and the receiving end of its channel.
    pub fn bounded(capacity: usize) -> (Self, Receiver<SinkMessage>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx, dropped: 0 }, rx)
    }

    /// Number of messages dropped because the channel was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn forward(&mut self, message: SinkMessage) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                warn!(dropped = self.dropped, "sink channel full, message dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
                warn!(dropped = self.dropped, "sink channel closed, message dropped");
            }
        }
    }
}

impl EventSink for ChannelSink {
    fn on_event(&mut self, event: &CrossingEvent) {
        self.forward(SinkMessage::Crossing(event.clone()));
    }

    fn on_alarm_change(&mut self, change: &AlarmChange) {
        self.forward(SinkMessage::Alarm(change.clone()));
    }
}
