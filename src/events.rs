//! # Events
//!
//! Notable state changes are handed to a [`NotificationSink`] as plain data.
//! The engine never talks to clients itself; a real-time transport in the
//! surrounding system subscribes to a sink and broadcasts the payloads.
//!
//! - **Setup**: `MatchCreated`, `SideJoined`, `SideLeft`, `ShipPlaced`, `FleetPlaced`, `BothReady`
//! - **Battle**: `ShotResolved`, `AiTargeted`, `MoveReverted`, `MoveReplayed`
//! - **End**: `MatchFinished`, `MatchCanceled`

use std::sync::Mutex;

use serde::Serialize;

use crate::common::ShotClass;
use crate::domain::{MatchId, MoveId, ShotReport};
use crate::placement::PlacementStrategy;

/// Payloads emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    MatchCreated {
        match_id: MatchId,
        host: String,
    },
    SideJoined {
        match_id: MatchId,
        side: String,
    },
    /// `side` left; the match is pending again unless the host left.
    SideLeft {
        match_id: MatchId,
        side: String,
    },
    ShipPlaced {
        match_id: MatchId,
        side: String,
        ship: String,
        positions: Vec<(usize, usize)>,
    },
    FleetPlaced {
        match_id: MatchId,
        side: String,
        strategy: PlacementStrategy,
    },
    BothReady {
        match_id: MatchId,
        first_turn: Option<String>,
    },
    ShotResolved {
        match_id: MatchId,
        report: ShotReport,
        next_turn: Option<String>,
    },
    /// An AI picked a target; `score` is the strategic score when it used one.
    AiTargeted {
        match_id: MatchId,
        ai: String,
        x: usize,
        y: usize,
        score: Option<f64>,
    },
    MoveReverted {
        match_id: MatchId,
        move_id: MoveId,
        attacker: String,
        x: usize,
        y: usize,
    },
    MoveReplayed {
        match_id: MatchId,
        move_id: MoveId,
        attacker: String,
        x: usize,
        y: usize,
        result: ShotClass,
    },
    MatchFinished {
        match_id: MatchId,
        winner: String,
        loser: String,
    },
    MatchCanceled {
        match_id: MatchId,
    },
}

/// Receiver for engine events. Emission must not block or fail the caller.
pub trait NotificationSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn emit(&self, _event: Event) {}
}

/// Keeps events in memory until taken.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Event> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl NotificationSink for RecordingSink {
    fn emit(&self, event: Event) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Fans events out to any number of async subscribers.
#[cfg(feature = "std")]
pub struct BroadcastSink {
    tx: tokio::sync::broadcast::Sender<Event>,
}

#[cfg(feature = "std")]
impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(feature = "std")]
impl NotificationSink for BroadcastSink {
    fn emit(&self, event: Event) {
        // no subscribers is not an error
        if self.tx.send(event).is_err() {
            log::trace!("event dropped, nobody is listening");
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(Event::MatchCanceled { match_id: 4 }).unwrap();
        assert_eq!(json, serde_json::json!({"event": "match_canceled", "match_id": 4}));
    }

    #[test]
    fn broadcast_reaches_subscribers() {
        let sink = BroadcastSink::new(8);
        sink.emit(Event::MatchCanceled { match_id: 1 });
        let mut rx = sink.subscribe();
        sink.emit(Event::MatchCanceled { match_id: 2 });
        assert_eq!(rx.try_recv().unwrap(), Event::MatchCanceled { match_id: 2 });
    }

    #[test]
    fn recording_sink_drains() {
        let sink = RecordingSink::new();
        sink.emit(Event::MatchCanceled { match_id: 3 });
        assert_eq!(sink.take().len(), 1);
        assert!(sink.take().is_empty());
    }
}
