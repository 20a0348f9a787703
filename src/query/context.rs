// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Bounded snapshots of editor state.
//!
//! A snapshot never fails as a whole. Each sub-step that cannot reach the host
//! degrades its own field and, where the gap matters to the caller, adds a warning.

use serde::Deserialize;

use crate::host::EditorHost;
use crate::model::{
    ContextSnapshot, EditorMode, EnvironmentInfo, HierarchySummary, IdError, NodeId,
    SceneNodeSummary, SelectedNode, TreeNode,
};

pub const MAX_SELECTION: usize = 10;

pub const DEFAULT_MAX_DEPTH: usize = 2;
pub const DEFAULT_MAX_NODES: usize = 100;
pub const DEFAULT_MAX_LOG_LINES: usize = 20;

const DEPTH_RANGE: (usize, usize) = (1, 10);
const NODES_RANGE: (usize, usize) = (10, 500);
const COMPACT_NODES_RANGE: (usize, usize) = (10, 5_000);
const LOG_LINES_RANGE: (usize, usize) = (5, 100);

/// Resolved traversal ceilings. The builder trusts these as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotLimits {
    pub max_depth: usize,
    pub max_nodes: usize,
    pub max_log_lines: usize,
}

impl Default for SnapshotLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
            max_log_lines: DEFAULT_MAX_LOG_LINES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotOptions {
    pub include_hierarchy: bool,
    pub include_recent_logs: bool,
    pub compact: bool,
    pub limits: SnapshotLimits,
    pub parent_uuid: Option<NodeId>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            include_hierarchy: true,
            include_recent_logs: true,
            compact: false,
            limits: SnapshotLimits::default(),
            parent_uuid: None,
        }
    }
}

/// Snapshot arguments as a client sends them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequest {
    pub include_hierarchy: Option<bool>,
    pub include_recent_logs: Option<bool>,
    pub summary_only: Option<bool>,
    pub max_depth: Option<i64>,
    pub max_nodes: Option<i64>,
    pub max_log_lines: Option<i64>,
    pub parent_uuid: Option<String>,
}

impl SnapshotRequest {
    /// Applies defaults and clamps every ceiling into its allowed range.
    pub fn resolve(self) -> Result<SnapshotOptions, IdError> {
        let compact = self.summary_only.unwrap_or(false);
        let nodes_range = if compact { COMPACT_NODES_RANGE } else { NODES_RANGE };
        let parent_uuid = match self.parent_uuid.filter(|uuid| !uuid.is_empty()) {
            Some(uuid) => Some(NodeId::new(uuid)?),
            None => None,
        };
        Ok(SnapshotOptions {
            include_hierarchy: self.include_hierarchy.unwrap_or(true),
            include_recent_logs: self.include_recent_logs.unwrap_or(true),
            compact,
            limits: SnapshotLimits {
                max_depth: clamp(self.max_depth, DEFAULT_MAX_DEPTH, DEPTH_RANGE),
                max_nodes: clamp(self.max_nodes, DEFAULT_MAX_NODES, nodes_range),
                max_log_lines: clamp(self.max_log_lines, DEFAULT_MAX_LOG_LINES, LOG_LINES_RANGE),
            },
            parent_uuid,
        })
    }
}

fn clamp(value: Option<i64>, default: usize, (min, max): (usize, usize)) -> usize {
    match value {
        Some(value) if value < 0 => min,
        Some(value) => usize::try_from(value).unwrap_or(max).clamp(min, max),
        None => default.clamp(min, max),
    }
}

/// Shared counters for one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Traversal {
    pub visited: usize,
    pub budget: usize,
    pub truncated: bool,
}

impl Traversal {
    pub fn new(budget: usize) -> Self {
        Self { visited: 0, budget, truncated: false }
    }

    /// Counts one more visited node, or marks the traversal truncated and refuses
    /// once the budget is spent.
    fn admit(&mut self) -> bool {
        if self.visited >= self.budget {
            self.truncated = true;
            return false;
        }
        self.visited += 1;
        true
    }
}

struct Visited<'a> {
    node: &'a TreeNode,
    children: Vec<usize>,
}

/// Breadth-first, level by level, over `start` and its descendants down to
/// `max_depth` levels, admitting at most `max_nodes` nodes.
///
/// Compact summaries nest every admitted descendant. Normal summaries cover the
/// first level only, each with its name as path and its direct child count; deeper
/// levels are still visited so the budget and `truncated` reflect the real size.
pub fn summarize_levels(
    start: &[TreeNode],
    max_depth: usize,
    max_nodes: usize,
    compact: bool,
) -> (Vec<SceneNodeSummary>, Traversal) {
    let mut traversal = Traversal::new(max_nodes);
    let mut visited: Vec<Visited<'_>> = Vec::new();
    let mut roots = Vec::new();
    let mut level: Vec<(&TreeNode, Option<usize>)> =
        start.iter().map(|node| (node, None)).collect();

    let mut depth = 1;
    'levels: while !level.is_empty() && depth <= max_depth {
        let mut next = Vec::new();
        for (node, parent) in level {
            if !traversal.admit() {
                break 'levels;
            }
            let index = visited.len();
            visited.push(Visited { node, children: Vec::new() });
            match parent {
                Some(parent) => visited[parent].children.push(index),
                None => roots.push(index),
            }
            next.extend(node.children.iter().map(|child| (child, Some(index))));
        }
        level = next;
        depth += 1;
    }

    let summaries = roots
        .into_iter()
        .map(|index| {
            if compact {
                nest(&visited, index)
            } else {
                let node = visited[index].node;
                SceneNodeSummary {
                    uuid: node.uuid.to_string(),
                    name: node.name.clone(),
                    path: Some(node.name.clone()),
                    child_count: node.children.len(),
                    components: None,
                    children: None,
                }
            }
        })
        .collect();
    (summaries, traversal)
}

fn nest(visited: &[Visited<'_>], index: usize) -> SceneNodeSummary {
    let entry = &visited[index];
    let children = (!entry.children.is_empty())
        .then(|| entry.children.iter().map(|child| nest(visited, *child)).collect());
    SceneNodeSummary {
        uuid: entry.node.uuid.to_string(),
        name: entry.node.name.clone(),
        path: None,
        child_count: entry.node.children.len(),
        components: None,
        children,
    }
}

pub struct ContextSnapshotBuilder<'a, H> {
    host: &'a H,
}

impl<'a, H: EditorHost> ContextSnapshotBuilder<'a, H> {
    pub fn new(host: &'a H) -> Self {
        Self { host }
    }

    pub async fn build(&self, options: &SnapshotOptions) -> ContextSnapshot {
        let mut warnings = Vec::new();

        let mode = self.mode(&mut warnings).await;
        let selection = match options.parent_uuid {
            Some(_) => Vec::new(),
            None => self.selection(&mut warnings).await,
        };
        let hierarchy = if options.include_hierarchy {
            self.hierarchy(options, &mut warnings).await
        } else {
            None
        };
        let recent_logs = if options.include_recent_logs && !options.compact {
            match self.host.recent_logs(options.limits.max_log_lines).await {
                Ok(logs) => Some(logs),
                Err(err) => {
                    tracing::debug!(%err, "recent logs unavailable");
                    None
                }
            }
        } else {
            None
        };
        let environment = EnvironmentInfo {
            editor_version: self.host.editor_version().await.ok(),
            project_path: self.host.project_path().await.ok(),
        };

        ContextSnapshot {
            mode,
            compact: options.compact,
            selection,
            hierarchy,
            recent_logs,
            environment,
            warnings,
        }
    }

    async fn mode(&self, warnings: &mut Vec<String>) -> EditorMode {
        let scene_err = match self.host.current_scene().await {
            Ok(scene) => {
                return EditorMode::Scene { uuid: scene.uuid.into_string(), name: scene.name };
            }
            Err(err) => err,
        };
        match self.host.current_prefab().await {
            Ok(prefab) => EditorMode::Prefab {
                uuid: prefab.uuid.into_string(),
                name: prefab.name,
                asset_path: prefab.asset_path,
            },
            Err(prefab_err) => {
                tracing::warn!(%scene_err, %prefab_err, "editor mode unknown");
                warnings.push("editor mode unknown: neither a scene nor a prefab is open".to_owned());
                EditorMode::Unknown
            }
        }
    }

    async fn selection(&self, warnings: &mut Vec<String>) -> Vec<SelectedNode> {
        let uuids = match self.host.selection().await {
            Ok(uuids) => uuids,
            Err(err) => {
                tracing::warn!(%err, "selection unavailable");
                warnings.push(format!("selection unavailable: {err}"));
                return Vec::new();
            }
        };
        if uuids.len() > MAX_SELECTION {
            warnings.push(format!(
                "selection has {} nodes; only the first {MAX_SELECTION} are described",
                uuids.len()
            ));
        }

        let mut selection = Vec::with_capacity(uuids.len().min(MAX_SELECTION));
        for uuid in uuids.iter().take(MAX_SELECTION) {
            match self.host.node_details(uuid).await {
                Ok(details) => selection.push(SelectedNode {
                    components: details.component_types(),
                    uuid: details.uuid.into_string(),
                    name: details.name,
                    active: Some(details.active),
                    unresolved: false,
                }),
                Err(err) => {
                    tracing::warn!(%uuid, %err, "selected node unresolved");
                    warnings.push(format!("selected node {uuid} unresolved: {err}"));
                    selection.push(SelectedNode::unresolved(uuid.as_str()));
                }
            }
        }
        selection
    }

    async fn hierarchy(
        &self,
        options: &SnapshotOptions,
        warnings: &mut Vec<String>,
    ) -> Option<HierarchySummary> {
        let tree = match self.host.node_tree().await {
            Ok(tree) => tree,
            Err(err) => {
                tracing::warn!(%err, "hierarchy unavailable");
                warnings.push(format!("hierarchy unavailable: {err}"));
                return None;
            }
        };

        let limits = options.limits;
        let start = match &options.parent_uuid {
            Some(uuid) => match tree.find(uuid) {
                Some(node) => node.children.as_slice(),
                None => {
                    warnings.push(format!("subtree root {uuid} not found"));
                    &[]
                }
            },
            None => tree.children.as_slice(),
        };
        let (nodes, traversal) =
            summarize_levels(start, limits.max_depth, limits.max_nodes, options.compact);
        if traversal.truncated {
            tracing::debug!(budget = limits.max_nodes, "hierarchy traversal truncated");
        }

        Some(HierarchySummary {
            summarized_nodes: nodes.iter().map(SceneNodeSummary::summarized_len).sum(),
            nodes,
            visited_nodes: traversal.visited,
            truncated: traversal.truncated,
            max_depth: limits.max_depth,
            max_nodes: limits.max_nodes,
            root_uuid: options.parent_uuid.as_ref().map(ToString::to_string),
        })
    }
}
