// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! Ids, the host-facing scene records, and the summaries the query tools return.

pub mod ids;
pub mod scene;
pub mod summary;

pub use ids::{Id, IdError, NodeId, SessionId};
pub use scene::{
    ComponentInfo, NodeDetails, PrefabInfo, SceneInfo, ScriptOutcome, ScriptRequest, ScriptRun,
    TreeNode,
};
pub use summary::{
    ContextSnapshot, EditorMode, EnvironmentInfo, HierarchySummary, SceneNodeSummary, SearchMatch,
    SearchPage, SelectedNode,
};
