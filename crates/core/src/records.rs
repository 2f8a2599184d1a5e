// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Record schemas for the collections the app writes through the queue.
//!
//! Every record carries its own `id`; update and delete dispatch is keyed on
//! it. The engine never merges or edits record contents - records travel
//! through the queue exactly as the caller built them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A party (event) record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyRecord {
    pub id: String,
    pub name: String,
    pub host_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

/// A chat message within a party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub party_id: String,
    pub author_id: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// A vouch from one member for another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VouchRecord {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A member profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}
