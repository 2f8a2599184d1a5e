// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Server-driven change events and channel filters.
//!
//! Live channels deliver [`ChangeEvent`]s to domain callbacks. The engine
//! does not distinguish "echo of my own just-synced write" from "someone
//! else's change" - callers handle both with idempotent upserts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The kind of change a channel event reports, or matches in a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// Filter-only wildcard matching every kind.
    All,
}

impl ChangeKind {
    /// Returns true if a filter of this kind accepts an event of `kind`.
    pub fn matches(&self, kind: ChangeKind) -> bool {
        *self == ChangeKind::All || *self == kind
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
            ChangeKind::All => "all",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ChangeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "insert" => Ok(ChangeKind::Insert),
            "update" => Ok(ChangeKind::Update),
            "delete" => Ok(ChangeKind::Delete),
            "all" | "*" => Ok(ChangeKind::All),
            other => Err(Error::InvalidChangeKind(other.to_string())),
        }
    }
}

/// A change pushed from the backend through a live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// What happened to the record.
    pub kind: ChangeKind,
    /// The collection the record belongs to.
    pub collection: String,
    /// The record as the backend sees it after the change (id only, for deletes).
    pub record: serde_json::Value,
}

/// What a subscription listens for: change kind, collection, and an
/// optional row predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Which change kinds to receive.
    pub event: ChangeKind,
    /// Backend schema the collection lives in.
    pub schema: String,
    /// Collection (table) to watch.
    pub collection: String,
    /// Optional row-level predicate, e.g. `party_id=eq.abc123`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
}

impl EventFilter {
    /// Filter receiving every change kind on a collection.
    pub fn all(schema: impl Into<String>, collection: impl Into<String>) -> Self {
        EventFilter {
            event: ChangeKind::All,
            schema: schema.into(),
            collection: collection.into(),
            predicate: None,
        }
    }

    /// Narrows the filter to a row-level predicate.
    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Returns true if this filter accepts the given event.
    ///
    /// Predicate evaluation is the channel implementation's job; this checks
    /// kind and collection only.
    pub fn accepts(&self, event: &ChangeEvent) -> bool {
        self.event.matches(event.kind) && self.collection == event.collection
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
