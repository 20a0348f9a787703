// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The editor host collaborator.
//!
//! Everything this server knows about the scene comes through [`EditorHost`]. Each
//! method is one round trip into the editor; any of them may fail on its own, and
//! callers decide per case whether to degrade or to surface the failure.

mod bridge;
mod memory;

use std::future::Future;

use serde_json::Value;
use thiserror::Error;

use crate::model::{NodeDetails, NodeId, PrefabInfo, SceneInfo, ScriptRequest, ScriptRun, TreeNode};

pub use bridge::{BridgeConfig, BridgeHost};
pub use memory::{demo_host, HostOp, MemoryHost, MemoryScene};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("editor host is unavailable: {0}")]
    Unavailable(String),
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("editor host rejected the call: {0}")]
    Rejected(String),
    #[error("malformed editor host reply: {0}")]
    Protocol(String),
    #[error("editor host call timed out after {0} ms")]
    TimedOut(u64),
}

pub trait EditorHost: Send + Sync + 'static {
    fn current_scene(&self) -> impl Future<Output = Result<SceneInfo, HostError>> + Send;

    fn current_prefab(&self) -> impl Future<Output = Result<PrefabInfo, HostError>> + Send;

    fn selection(&self) -> impl Future<Output = Result<Vec<NodeId>, HostError>> + Send;

    /// The scene root with the whole hierarchy nested below it.
    fn node_tree(&self) -> impl Future<Output = Result<TreeNode, HostError>> + Send;

    fn node_details(
        &self,
        uuid: &NodeId,
    ) -> impl Future<Output = Result<NodeDetails, HostError>> + Send;

    fn recent_logs(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<String>, HostError>> + Send;

    fn editor_version(&self) -> impl Future<Output = Result<String, HostError>> + Send;

    fn project_path(&self) -> impl Future<Output = Result<String, HostError>> + Send;

    fn run_script(
        &self,
        request: ScriptRequest,
    ) -> impl Future<Output = Result<ScriptRun, HostError>> + Send;

    fn create_node(
        &self,
        name: &str,
        parent: Option<&NodeId>,
    ) -> impl Future<Output = Result<NodeId, HostError>> + Send;

    fn delete_node(&self, uuid: &NodeId) -> impl Future<Output = Result<(), HostError>> + Send;

    fn set_property(
        &self,
        uuid: &NodeId,
        path: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    fn select_nodes(&self, uuids: &[NodeId]) -> impl Future<Output = Result<(), HostError>> + Send;
}
