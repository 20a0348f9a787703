// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Point-in-time result types returned by the query tools.
//!
//! These are plain copies of host data; nothing here holds a live reference into
//! the editor.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EditorMode {
    Scene {
        uuid: String,
        name: String,
    },
    Prefab {
        uuid: String,
        name: String,
        #[serde(rename = "assetPath", skip_serializing_if = "Option::is_none")]
        asset_path: Option<String>,
    },
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectedNode {
    pub uuid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    /// Set when the details lookup for this node failed and only the id is known.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unresolved: bool,
}

impl SelectedNode {
    pub fn unresolved(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: "Unknown".to_owned(),
            active: None,
            components: Vec::new(),
            unresolved: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneNodeSummary {
    pub uuid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub child_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SceneNodeSummary>>,
}

impl SceneNodeSummary {
    /// Number of summaries in this entry, counting nested children.
    pub fn summarized_len(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map(|children| children.iter().map(SceneNodeSummary::summarized_len).sum())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HierarchySummary {
    pub nodes: Vec<SceneNodeSummary>,
    pub summarized_nodes: usize,
    pub visited_nodes: usize,
    pub truncated: bool,
    pub max_depth: usize,
    pub max_nodes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_uuid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub mode: EditorMode,
    pub compact: bool,
    pub selection: Vec<SelectedNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<HierarchySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_logs: Option<Vec<String>>,
    pub environment: EnvironmentInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub uuid: String,
    pub name: String,
    pub path: String,
    pub components: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub results: Vec<SearchMatch>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}
