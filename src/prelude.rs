//! Commonly used types and utilities for ease of import.

pub use crate::{
    build_ai, AiKind, AiTurn, Cell, Engine, EngineConfig, EngineError, Grid, LedgerOutcome, MatchStatus,
    Orientation, Participant, PlacementStrategy, ShotClass, ShotReport, TargetingAi,
};

pub use crate::events::{Event, NotificationSink, NullSink, RecordingSink};
pub use crate::store::{MatchStore, MemoryStore, PlayerRecords};

#[cfg(feature = "std")]
pub use crate::events::BroadcastSink;
#[cfg(feature = "std")]
pub use crate::init_logging;
