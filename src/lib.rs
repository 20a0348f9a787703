// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Scenebridge: an MCP server exposing a live editor scene graph to agents.
//!
//! Remote calls arrive over stdio, streamable HTTP or an SSE session transport,
//! are validated against a fixed tool catalog, and run against an [`host::EditorHost`].
//! The query layer keeps scene snapshots and node searches within size budgets, and
//! the sandbox runs agent-supplied scripts under a validation pass and a timeout.

pub mod config;
pub mod error;
pub mod host;
pub mod mcp;
pub mod model;
pub mod query;
pub mod sandbox;
pub mod tools;
