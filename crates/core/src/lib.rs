// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! eddy-core: Shared data model for the eddy sync engine.
//!
//! This crate defines the types that cross the boundary between the app and
//! the sync engine: queued write operations with typed payloads, the change
//! events delivered by live channels, and the clock abstraction used for
//! timestamps and retry scheduling.

pub mod clock;
pub mod error;
pub mod event;
pub mod op;
pub mod records;

pub use clock::{now_utc, ClockSource, SystemClock};
pub use error::{Error, Result};
pub use event::{ChangeEvent, ChangeKind, EventFilter};
pub use op::{IdSource, OpId, OpKind, OpPayload, QueuedOp};
pub use records::{MessageRecord, PartyRecord, ProfileRecord, VouchRecord};
