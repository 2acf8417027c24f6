// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod guardian;
pub mod snapshot;
pub mod token;

pub use guardian::{CharacterRoster, CharacterSummary, Guardian, Rotator, Rotators};
pub use snapshot::{AccountSnapshot, SnapshotStatus, VAULT_MAX_CAPACITY};
pub use token::OAuthToken;
