// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Model Context Protocol (MCP) server surface.
//!
//! Every transport runs the rmcp [`SceneBridgeMcp`] handler over the same
//! [`ToolRegistry`](crate::tools::ToolRegistry). The SSE session transport feeds
//! it through a [`SessionTransport`] per session.

pub mod http;
mod server;
pub mod session;

pub use http::{app, routes, HttpError, HttpState, DEFAULT_SSE_KEEP_ALIVE};
pub use server::{SceneBridgeMcp, INSTRUCTIONS, SERVER_NAME};
pub use session::{SessionHook, SessionManager, SessionStream, SessionTransport};
