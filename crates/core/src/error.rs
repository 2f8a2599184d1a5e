// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Error types for eddy-core.

use thiserror::Error;

/// All possible errors that can occur in eddy-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid op kind: '{0}'\n  hint: valid kinds are: create, update, delete")]
    InvalidOpKind(String),

    #[error("invalid change kind: '{0}'\n  hint: valid kinds are: insert, update, delete, all")]
    InvalidChangeKind(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for eddy-core operations.
pub type Result<T> = std::result::Result<T, Error>;
