// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Read-only queries over the editor's scene tree.
//!
//! Snapshots and searches copy what they need out of one tree query, then work on
//! that copy; nothing here holds host state between calls.

pub mod context;
pub mod glob;
pub mod search;

pub use context::{ContextSnapshotBuilder, SnapshotLimits, SnapshotOptions, SnapshotRequest};
pub use glob::Glob;
pub use search::{NodeSearchEngine, SearchError, SearchQuery, SearchRequest};
