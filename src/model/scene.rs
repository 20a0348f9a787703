// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::NodeId;

fn default_active() -> bool {
    true
}

/// One node of the hierarchy as the host reports it from a tree query.
///
/// Tree entries are cheap: they carry identity, name and children only. Component
/// data lives in [`NodeDetails`] and costs one host call per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub uuid: NodeId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(uuid: NodeId, name: impl Into<String>) -> Self {
        Self { uuid, name: name.into(), active: true, children: Vec::new() }
    }

    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = children;
        self
    }

    /// Depth-first lookup of `uuid` anywhere below (and including) this node.
    pub fn find(&self, uuid: &NodeId) -> Option<&TreeNode> {
        if &self.uuid == uuid {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(uuid))
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(TreeNode::subtree_len).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneInfo {
    pub uuid: NodeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefabInfo {
    pub uuid: NodeId,
    pub name: String,
    #[serde(default)]
    pub asset_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_active")]
    pub enabled: bool,
}

impl ComponentInfo {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), enabled: true }
    }
}

/// Full per-node record returned by a details query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDetails {
    pub uuid: NodeId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub parent_uuid: Option<NodeId>,
    #[serde(default)]
    pub components: Vec<ComponentInfo>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl NodeDetails {
    pub fn component_types(&self) -> Vec<String> {
        self.components.iter().map(|component| component.type_name.clone()).collect()
    }
}

/// Source text plus execution options forwarded to the host's script runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRequest {
    pub source: String,
    pub globals: Vec<String>,
    pub return_result: bool,
    pub capture_console: bool,
}

/// What the host reports back from a script run that reached the script engine.
///
/// A script that throws is still a completed host call: its message goes into
/// `outcome` and whatever it logged before failing is kept in `logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRun {
    pub outcome: ScriptOutcome,
    #[serde(default)]
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptOutcome {
    Returned(Value),
    Threw(String),
}

#[cfg(test)]
mod tests {
    use super::{NodeDetails, ScriptOutcome, ScriptRun, TreeNode};
    use crate::model::NodeId;

    fn nid(value: &str) -> NodeId {
        NodeId::new(value).expect("node id")
    }

    #[test]
    fn tree_accepts_host_ids_with_whitespace() {
        let tree: TreeNode = serde_json::from_value(serde_json::json!({
            "uuid": "root",
            "name": "Scene",
            "children": [{ "uuid": "odd id\n", "name": "Odd" }, { "uuid": "b", "name": "B" }],
        }))
        .expect("tree");
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].uuid.as_str(), "odd id\n");
        serde_json::from_value::<TreeNode>(serde_json::json!({ "uuid": "", "name": "X" })).unwrap_err();
    }

    #[test]
    fn find_locates_nested_nodes() {
        let tree = TreeNode::new(nid("root"), "Scene").with_children(vec![TreeNode::new(
            nid("a"),
            "A",
        )
        .with_children(vec![TreeNode::new(nid("b"), "B")])]);

        assert_eq!(tree.find(&nid("b")).map(|node| node.name.as_str()), Some("B"));
        assert!(tree.find(&nid("missing")).is_none());
        assert_eq!(tree.subtree_len(), 3);
    }

    #[test]
    fn tree_node_defaults_active_and_children() {
        let node: TreeNode =
            serde_json::from_str(r#"{"uuid":"n1","name":"Canvas"}"#).expect("tree node");
        assert!(node.active);
        assert!(node.children.is_empty());
    }

    #[test]
    fn node_details_reads_component_type_key() {
        let details: NodeDetails = serde_json::from_str(
            r#"{"uuid":"n1","name":"Boss","components":[{"type":"cc.Sprite"},{"type":"EnemyAI","enabled":false}]}"#,
        )
        .expect("details");
        assert_eq!(details.component_types(), vec!["cc.Sprite", "EnemyAI"]);
        assert!(!details.components[1].enabled);
    }

    #[test]
    fn script_run_decodes_thrown_outcome() {
        let run: ScriptRun =
            serde_json::from_str(r#"{"outcome":{"threw":"boom"},"logs":["a"]}"#).expect("run");
        assert_eq!(run.outcome, ScriptOutcome::Threw("boom".into()));
        assert_eq!(run.logs, vec!["a"]);
    }
}
