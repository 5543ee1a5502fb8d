//! Multi-class line-crossing counting.
//!
//! This module turns a stream of tracked observations (an identity, a class
//! and a position per frame) into duplicate-free IN/OUT crossing events,
//! per-class inventory and capacity alarms. Detection, tracking and video
//! decoding happen elsewhere; the counter only sees their output.
//!
//! # Pipeline
//!
//! For each frame, in order:
//!
//! 1. The [`LineConfig`] is resolved against the frame size into a
//!    [`CountingLine`], which gives every position a signed side value.
//! 2. The [`CrossingEvaluator`] compares each observation's side with the
//!    last one recorded in the [`TrackStore`] and emits at most one
//!    [`CrossingEvent`].
//! 3. The [`ClassInventory`] folds events into per-class totals and
//!    reports [`AlarmChange`]s when capacity is crossed.
//! 4. Events and alarm changes are published to an [`EventSink`].
//! 5. Tracks not seen within the timeout are evicted.
//!
//! [`LineCounter`] runs this loop and owns all state. It is single-threaded
//! and synchronous; only the sink may hand work to other threads.

mod counter;
mod evaluator;
mod event;
mod geometry;
mod inventory;
mod label;
mod sink;
mod tracks;
mod warning;

pub use counter::{Frame, FrameOutcome, LineCounter, RunStats};
pub use evaluator::{CrossingEvaluator, Evaluation};
pub use event::{AlarmChange, CrossingEvent, Direction, Observation};
pub use geometry::{CountingLine, FrameSize, LineConfig, Orientation, Point};
pub use inventory::{Capacity, ClassInventory, ClassSnapshot, InventoryEntry, InventorySnapshot};
pub use label::{ClassLabel, TrackId};
pub use sink::{ChannelSink, EventSink, LogSink, NullSink, RecordingSink, SinkMessage};
pub use tracks::{TrackState, TrackStore, Upsert};
pub use warning::ObservationWarning;
