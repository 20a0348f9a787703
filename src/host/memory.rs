// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::{Map, Value};

use super::{EditorHost, HostError};
use crate::model::{
    ComponentInfo, NodeDetails, NodeId, PrefabInfo, SceneInfo, ScriptOutcome, ScriptRequest,
    ScriptRun, TreeNode,
};

const LOG_BUFFER_LIMIT: usize = 1_000;

#[derive(Debug, Clone)]
struct NodeRecord {
    name: String,
    active: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    components: Vec<ComponentInfo>,
    properties: Map<String, Value>,
}

impl NodeRecord {
    fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            active: true,
            parent,
            children: Vec::new(),
            components: Vec::new(),
            properties: Map::new(),
        }
    }
}

/// An editable scene held entirely in memory.
///
/// Children keep insertion order, which is also the order tree queries report.
#[derive(Debug, Clone)]
pub struct MemoryScene {
    scene: SceneInfo,
    prefab: Option<PrefabInfo>,
    nodes: HashMap<NodeId, NodeRecord>,
    selection: Vec<NodeId>,
    logs: Vec<String>,
    editor_version: String,
    project_path: String,
    next_id: u64,
}

impl MemoryScene {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let root = NodeId::new_unchecked("scene-root");
        let mut nodes = HashMap::new();
        nodes.insert(root.clone(), NodeRecord::new(name.clone(), None));
        Self {
            scene: SceneInfo { uuid: root, name },
            prefab: None,
            nodes,
            selection: Vec::new(),
            logs: Vec::new(),
            editor_version: "3.8.2".to_owned(),
            project_path: "/projects/demo".to_owned(),
            next_id: 1,
        }
    }

    pub fn root(&self) -> &NodeId {
        &self.scene.uuid
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds `name` under `parent` with a generated uuid.
    pub fn add_node(
        &mut self,
        parent: &NodeId,
        name: &str,
        components: &[&str],
    ) -> Result<NodeId, HostError> {
        let uuid = loop {
            let candidate = NodeId::new(format!("node-{}", self.next_id))
                .map_err(|err| HostError::Rejected(err.to_string()))?;
            self.next_id += 1;
            if !self.nodes.contains_key(&candidate) {
                break candidate;
            }
        };
        self.add_node_with_id(parent, uuid.clone(), name, components)?;
        Ok(uuid)
    }

    pub fn add_node_with_id(
        &mut self,
        parent: &NodeId,
        uuid: NodeId,
        name: &str,
        components: &[&str],
    ) -> Result<(), HostError> {
        if self.nodes.contains_key(&uuid) {
            return Err(HostError::Rejected(format!("node {uuid} already exists")));
        }
        let parent_record = self
            .nodes
            .get_mut(parent)
            .ok_or_else(|| HostError::NotFound(parent.to_string()))?;
        parent_record.children.push(uuid.clone());

        let mut record = NodeRecord::new(name, Some(parent.clone()));
        record.components = components.iter().map(|ty| ComponentInfo::new(*ty)).collect();
        self.nodes.insert(uuid, record);
        Ok(())
    }

    pub fn remove_node(&mut self, uuid: &NodeId) -> Result<(), HostError> {
        if uuid == &self.scene.uuid {
            return Err(HostError::Rejected("the scene root cannot be deleted".to_owned()));
        }
        let record =
            self.nodes.remove(uuid).ok_or_else(|| HostError::NotFound(uuid.to_string()))?;
        if let Some(parent) = record.parent.as_ref().and_then(|parent| self.nodes.get_mut(parent))
        {
            parent.children.retain(|child| child != uuid);
        }

        let mut pending = record.children;
        while let Some(child) = pending.pop() {
            if let Some(removed) = self.nodes.remove(&child) {
                pending.extend(removed.children);
            }
        }
        self.selection.retain(|selected| self.nodes.contains_key(selected));
        Ok(())
    }

    pub fn set_selection(&mut self, uuids: Vec<NodeId>) {
        self.selection = uuids;
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
        if self.logs.len() > LOG_BUFFER_LIMIT {
            let overflow = self.logs.len() - LOG_BUFFER_LIMIT;
            self.logs.drain(..overflow);
        }
    }

    /// Switches the editor into prefab editing; scene queries fail until closed.
    pub fn open_prefab(&mut self, prefab: PrefabInfo) {
        self.prefab = Some(prefab);
    }

    pub fn close_prefab(&mut self) {
        self.prefab = None;
    }

    fn tree_from(&self, uuid: &NodeId) -> Option<TreeNode> {
        let record = self.nodes.get(uuid)?;
        let children = record.children.iter().filter_map(|child| self.tree_from(child)).collect();
        Some(TreeNode {
            uuid: uuid.clone(),
            name: record.name.clone(),
            active: record.active,
            children,
        })
    }

    fn details(&self, uuid: &NodeId) -> Option<NodeDetails> {
        let record = self.nodes.get(uuid)?;
        Some(NodeDetails {
            uuid: uuid.clone(),
            name: record.name.clone(),
            active: record.active,
            parent_uuid: record.parent.clone(),
            components: record.components.clone(),
            properties: record.properties.clone(),
        })
    }
}

/// Host operations, used to inject failures into [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    CurrentScene,
    CurrentPrefab,
    Selection,
    NodeTree,
    NodeDetails,
    RecentLogs,
    EditorVersion,
    ProjectPath,
    RunScript,
    CreateNode,
    DeleteNode,
    SetProperty,
    SelectNodes,
}

#[derive(Debug, Default)]
struct Failures {
    ops: HashSet<HostOp>,
    details: HashSet<NodeId>,
}

#[derive(Debug, Default, Clone)]
struct ScriptResponder {
    run: Option<ScriptRun>,
    delay: Duration,
}

/// In-process [`EditorHost`] backed by a [`MemoryScene`].
///
/// Serves `--demo` mode and the test suite. Every call bumps a counter so tests can
/// assert how many round trips an operation made.
#[derive(Debug)]
pub struct MemoryHost {
    scene: Mutex<MemoryScene>,
    failures: Mutex<Failures>,
    script: Mutex<ScriptResponder>,
    calls: AtomicUsize,
}

impl MemoryHost {
    pub fn new(scene: MemoryScene) -> Self {
        Self {
            scene: Mutex::new(scene),
            failures: Mutex::new(Failures::default()),
            script: Mutex::new(ScriptResponder::default()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Makes every later call of `op` fail with [`HostError::Unavailable`].
    pub fn fail(&self, op: HostOp) {
        lock(&self.failures).ops.insert(op);
    }

    pub fn fail_details_for(&self, uuid: NodeId) {
        lock(&self.failures).details.insert(uuid);
    }

    /// Answers script runs with `run` after sleeping for `delay`.
    pub fn respond_to_scripts(&self, run: ScriptRun, delay: Duration) {
        *lock(&self.script) = ScriptResponder { run: Some(run), delay };
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn with_scene<R>(&self, f: impl FnOnce(&MemoryScene) -> R) -> R {
        f(&lock(&self.scene))
    }

    pub fn with_scene_mut<R>(&self, f: impl FnOnce(&mut MemoryScene) -> R) -> R {
        f(&mut lock(&self.scene))
    }

    fn enter(&self, op: HostOp) -> Result<(), HostError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if lock(&self.failures).ops.contains(&op) {
            return Err(HostError::Unavailable(format!("{op:?} failed (injected)")));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EditorHost for MemoryHost {
    async fn current_scene(&self) -> Result<SceneInfo, HostError> {
        self.enter(HostOp::CurrentScene)?;
        let scene = lock(&self.scene);
        match scene.prefab {
            Some(_) => Err(HostError::Rejected("editor is in prefab mode".to_owned())),
            None => Ok(scene.scene.clone()),
        }
    }

    async fn current_prefab(&self) -> Result<PrefabInfo, HostError> {
        self.enter(HostOp::CurrentPrefab)?;
        lock(&self.scene)
            .prefab
            .clone()
            .ok_or_else(|| HostError::Rejected("no prefab is open".to_owned()))
    }

    async fn selection(&self) -> Result<Vec<NodeId>, HostError> {
        self.enter(HostOp::Selection)?;
        Ok(lock(&self.scene).selection.clone())
    }

    async fn node_tree(&self) -> Result<TreeNode, HostError> {
        self.enter(HostOp::NodeTree)?;
        let scene = lock(&self.scene);
        scene
            .tree_from(scene.root())
            .ok_or_else(|| HostError::NotFound(scene.root().to_string()))
    }

    async fn node_details(&self, uuid: &NodeId) -> Result<NodeDetails, HostError> {
        self.enter(HostOp::NodeDetails)?;
        if lock(&self.failures).details.contains(uuid) {
            return Err(HostError::Unavailable(format!("details for {uuid} failed (injected)")));
        }
        lock(&self.scene).details(uuid).ok_or_else(|| HostError::NotFound(uuid.to_string()))
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<String>, HostError> {
        self.enter(HostOp::RecentLogs)?;
        let scene = lock(&self.scene);
        let start = scene.logs.len().saturating_sub(limit);
        Ok(scene.logs[start..].to_vec())
    }

    async fn editor_version(&self) -> Result<String, HostError> {
        self.enter(HostOp::EditorVersion)?;
        Ok(lock(&self.scene).editor_version.clone())
    }

    async fn project_path(&self) -> Result<String, HostError> {
        self.enter(HostOp::ProjectPath)?;
        Ok(lock(&self.scene).project_path.clone())
    }

    async fn run_script(&self, request: ScriptRequest) -> Result<ScriptRun, HostError> {
        self.enter(HostOp::RunScript)?;
        let responder = lock(&self.script).clone();
        if !responder.delay.is_zero() {
            tokio::time::sleep(responder.delay).await;
        }
        let mut run = responder.run.unwrap_or_else(|| ScriptRun {
            outcome: ScriptOutcome::Threw(
                "script execution requires a connected editor".to_owned(),
            ),
            logs: Vec::new(),
        });
        if !request.capture_console {
            run.logs.clear();
        }
        Ok(run)
    }

    async fn create_node(&self, name: &str, parent: Option<&NodeId>) -> Result<NodeId, HostError> {
        self.enter(HostOp::CreateNode)?;
        let mut scene = lock(&self.scene);
        let parent = parent.cloned().unwrap_or_else(|| scene.root().clone());
        scene.add_node(&parent, name, &[])
    }

    async fn delete_node(&self, uuid: &NodeId) -> Result<(), HostError> {
        self.enter(HostOp::DeleteNode)?;
        lock(&self.scene).remove_node(uuid)
    }

    async fn set_property(&self, uuid: &NodeId, path: &str, value: Value) -> Result<(), HostError> {
        self.enter(HostOp::SetProperty)?;
        let mut scene = lock(&self.scene);
        let record =
            scene.nodes.get_mut(uuid).ok_or_else(|| HostError::NotFound(uuid.to_string()))?;
        match path {
            "name" => {
                record.name = value
                    .as_str()
                    .ok_or_else(|| HostError::Rejected("name must be a string".to_owned()))?
                    .to_owned();
            }
            "active" => {
                record.active = value
                    .as_bool()
                    .ok_or_else(|| HostError::Rejected("active must be a boolean".to_owned()))?;
            }
            _ => {
                record.properties.insert(path.to_owned(), value);
            }
        }
        Ok(())
    }

    async fn select_nodes(&self, uuids: &[NodeId]) -> Result<(), HostError> {
        self.enter(HostOp::SelectNodes)?;
        let mut scene = lock(&self.scene);
        if let Some(missing) = uuids.iter().find(|uuid| !scene.nodes.contains_key(*uuid)) {
            return Err(HostError::NotFound(missing.to_string()));
        }
        scene.set_selection(uuids.to_vec());
        Ok(())
    }
}

/// A small game scene used by `--demo` mode.
pub fn demo_host() -> Result<MemoryHost, HostError> {
    demo_scene().map(MemoryHost::new)
}

fn demo_scene() -> Result<MemoryScene, HostError> {
    let mut scene = MemoryScene::new("Main");
    let root = scene.root().clone();

    let canvas = scene.add_node(&root, "Canvas", &["cc.Canvas", "cc.UITransform"])?;
    scene.add_node(&canvas, "Camera", &["cc.Camera"])?;
    let hud = scene.add_node(&canvas, "HUD", &["cc.UITransform", "cc.Widget"])?;
    scene.add_node(&hud, "ScoreLabel", &["cc.UITransform", "cc.Label"])?;
    scene.add_node(&hud, "PauseButton", &["cc.UITransform", "cc.Sprite", "cc.Button"])?;

    let enemies = scene.add_node(&root, "Enemies", &[])?;
    for name in ["Enemy1", "Enemy2", "EnemyBoss"] {
        scene.add_node(&enemies, name, &["cc.Sprite", "EnemyAI", "cc.RigidBody2D"])?;
    }

    let player =
        scene.add_node(&root, "Player", &["cc.Sprite", "PlayerController", "cc.RigidBody2D"])?;
    scene.add_node(&root, "Main Light", &["cc.DirectionalLight"])?;

    scene.set_selection(vec![player]);
    scene.push_log("[scene] Main loaded");
    scene.push_log("[PlayerController] spawn at (0, 0)");
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nid(value: &str) -> NodeId {
        NodeId::new(value).expect("node id")
    }

    #[tokio::test]
    async fn tree_reports_children_in_insertion_order() {
        let mut scene = MemoryScene::new("Main");
        let root = scene.root().clone();
        scene.add_node_with_id(&root, nid("b"), "B", &[]).expect("add b");
        scene.add_node_with_id(&root, nid("a"), "A", &[]).expect("add a");
        let host = MemoryHost::new(scene);

        let tree = host.node_tree().await.expect("tree");
        let names = tree.children.iter().map(|child| child.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(host.calls(), 1);
    }

    #[tokio::test]
    async fn delete_removes_whole_subtree_and_selection() {
        let mut scene = MemoryScene::new("Main");
        let root = scene.root().clone();
        let parent = scene.add_node(&root, "Parent", &[]).expect("parent");
        let child = scene.add_node(&parent, "Child", &[]).expect("child");
        scene.set_selection(vec![child.clone()]);
        let host = MemoryHost::new(scene);

        host.delete_node(&parent).await.expect("delete");

        assert_eq!(host.node_details(&child).await, Err(HostError::NotFound(child.to_string())));
        assert!(host.selection().await.expect("selection").is_empty());
        assert_eq!(host.with_scene(MemoryScene::len), 1);
    }

    #[tokio::test]
    async fn scene_root_cannot_be_deleted() {
        let host = MemoryHost::new(MemoryScene::new("Main"));
        let root = host.with_scene(|scene| scene.root().clone());
        let err = host.delete_node(&root).await.unwrap_err();
        assert!(matches!(err, HostError::Rejected(_)));
    }

    #[tokio::test]
    async fn prefab_mode_switches_which_mode_query_succeeds() {
        let mut scene = MemoryScene::new("Main");
        scene.open_prefab(PrefabInfo {
            uuid: nid("prefab-1"),
            name: "Enemy".into(),
            asset_path: Some("db://assets/Enemy.prefab".into()),
        });
        let host = MemoryHost::new(scene);

        host.current_scene().await.unwrap_err();
        assert_eq!(host.current_prefab().await.expect("prefab").name, "Enemy");
    }

    #[tokio::test]
    async fn injected_failures_apply_per_operation_and_per_node() {
        let host = demo_host().expect("demo host");
        host.fail(HostOp::RecentLogs);
        let player = host.selection().await.expect("selection").remove(0);
        host.fail_details_for(player.clone());

        host.recent_logs(5).await.unwrap_err();
        host.node_details(&player).await.unwrap_err();
        host.editor_version().await.expect("other operations keep working");
    }

    #[tokio::test]
    async fn set_property_updates_name_and_free_properties() {
        let host = demo_host().expect("demo host");
        let player = host.selection().await.expect("selection").remove(0);

        host.set_property(&player, "name", serde_json::json!("Hero")).await.expect("rename");
        host.set_property(&player, "position.x", serde_json::json!(12)).await.expect("set x");
        host.set_property(&player, "active", serde_json::json!("yes")).await.unwrap_err();

        let details = host.node_details(&player).await.expect("details");
        assert_eq!(details.name, "Hero");
        assert_eq!(details.properties.get("position.x"), Some(&serde_json::json!(12)));
    }

    #[tokio::test]
    async fn recent_logs_returns_the_tail() {
        let mut scene = MemoryScene::new("Main");
        for index in 0..10 {
            scene.push_log(format!("line {index}"));
        }
        let host = MemoryHost::new(scene);
        assert_eq!(host.recent_logs(2).await.expect("logs"), vec!["line 8", "line 9"]);
    }
}
