// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! TCP bridge to the editor-side plugin.
//!
//! Wire format is one JSON object per line. Requests carry a numeric `id` that the
//! plugin echoes in its reply, so any number of calls can be in flight on the one
//! connection and replies may arrive in any order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;

use super::{EditorHost, HostError};
use crate::model::{NodeDetails, NodeId, PrefabInfo, SceneInfo, ScriptRequest, ScriptRun, TreeNode};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub addr: String,
    pub call_timeout: Duration,
}

impl BridgeConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), call_timeout: DEFAULT_CALL_TIMEOUT }
    }
}

type Reply = Result<Value, HostError>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

struct BridgeInner {
    writer: tokio::sync::Mutex<Writer>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    next_id: AtomicU64,
    connected: AtomicBool,
    call_timeout: Duration,
}

impl BridgeInner {
    fn pending(&self) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<Reply>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fail_all_pending(&self, reason: &str) {
        for (_, waiter) in self.pending().drain() {
            let _ = waiter.send(Err(HostError::Unavailable(reason.to_owned())));
        }
    }
}

/// Drops the pending entry when the caller stops waiting, so an abandoned call
/// does not pin its slot until a reply that may never come.
struct PendingSlot<'a> {
    inner: &'a BridgeInner,
    id: u64,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.inner.pending().remove(&self.id);
    }
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    id: u64,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<BridgeErrorBody>,
}

#[derive(Debug, Deserialize)]
struct BridgeErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

impl BridgeErrorBody {
    fn into_host_error(self) -> HostError {
        match self.code.as_deref() {
            Some("not_found") => HostError::NotFound(self.message),
            Some("unavailable") => HostError::Unavailable(self.message),
            _ => HostError::Rejected(self.message),
        }
    }
}

/// [`EditorHost`] that forwards every call to the editor plugin.
#[derive(Clone)]
pub struct BridgeHost {
    inner: Arc<BridgeInner>,
}

impl BridgeHost {
    pub async fn connect(config: BridgeConfig) -> Result<Self, HostError> {
        let stream = tokio::net::TcpStream::connect(&config.addr).await.map_err(|err| {
            HostError::Unavailable(format!("cannot reach editor bridge at {}: {err}", config.addr))
        })?;
        tracing::info!(addr = %config.addr, "connected to editor bridge");
        Ok(Self::from_stream(stream, config.call_timeout))
    }

    /// Runs the bridge over an already-open duplex stream. Must be called from
    /// inside a tokio runtime; the reply reader is spawned onto it.
    pub fn from_stream<S>(stream: S, call_timeout: Duration) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let inner = Arc::new(BridgeInner {
            writer: tokio::sync::Mutex::new(Box::new(write_half)),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(true),
            call_timeout,
        });
        tokio::spawn(read_replies(BufReader::new(read_half), inner.clone()));
        Self { inner }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, HostError> {
        if !self.is_connected() {
            return Err(HostError::Unavailable("editor bridge is disconnected".to_owned()));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.inner.pending().insert(id, tx);
        let _slot = PendingSlot { inner: &self.inner, id };

        let mut line = serde_json::to_string(&json!({ "id": id, "method": method, "params": params }))
            .map_err(|err| HostError::Protocol(err.to_string()))?;
        line.push('\n');
        {
            let mut writer = self.inner.writer.lock().await;
            writer.write_all(line.as_bytes()).await.map_err(|err| {
                HostError::Unavailable(format!("failed to write to editor bridge: {err}"))
            })?;
            writer.flush().await.map_err(|err| {
                HostError::Unavailable(format!("failed to flush editor bridge: {err}"))
            })?;
        }
        tracing::debug!(id, method, "bridge call sent");

        match tokio::time::timeout(self.inner.call_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(HostError::Unavailable("editor bridge connection closed".to_owned())),
            Err(_) => Err(HostError::TimedOut(self.inner.call_timeout.as_millis() as u64)),
        }
    }

    async fn call_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, HostError> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value)
            .map_err(|err| HostError::Protocol(format!("{method}: {err}")))
    }
}

async fn read_replies<R>(reader: BufReader<R>, inner: Arc<BridgeInner>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let reply = match serde_json::from_str::<BridgeReply>(&line) {
                    Ok(reply) => reply,
                    Err(err) => {
                        tracing::warn!(%err, "ignoring malformed bridge reply");
                        continue;
                    }
                };
                let Some(waiter) = inner.pending().remove(&reply.id) else {
                    tracing::debug!(id = reply.id, "discarding reply for abandoned bridge call");
                    continue;
                };
                let outcome = match (reply.error, reply.result) {
                    (Some(error), _) => Err(error.into_host_error()),
                    (None, result) => Ok(result.unwrap_or(Value::Null)),
                };
                let _ = waiter.send(outcome);
            }
            Ok(None) => {
                tracing::warn!("editor bridge closed the connection");
                break;
            }
            Err(err) => {
                tracing::warn!(%err, "editor bridge read failed");
                break;
            }
        }
    }
    inner.connected.store(false, Ordering::Release);
    inner.fail_all_pending("editor bridge connection lost");
}

#[derive(Deserialize)]
struct CreatedNode {
    uuid: NodeId,
}

impl EditorHost for BridgeHost {
    async fn current_scene(&self) -> Result<SceneInfo, HostError> {
        self.call_as("scene.current", Value::Null).await
    }

    async fn current_prefab(&self) -> Result<PrefabInfo, HostError> {
        self.call_as("prefab.current", Value::Null).await
    }

    async fn selection(&self) -> Result<Vec<NodeId>, HostError> {
        self.call_as("selection.get", Value::Null).await
    }

    async fn node_tree(&self) -> Result<TreeNode, HostError> {
        self.call_as("node.tree", Value::Null).await
    }

    async fn node_details(&self, uuid: &NodeId) -> Result<NodeDetails, HostError> {
        self.call_as("node.details", json!({ "uuid": uuid })).await
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<String>, HostError> {
        self.call_as("logs.recent", json!({ "limit": limit })).await
    }

    async fn editor_version(&self) -> Result<String, HostError> {
        self.call_as("editor.version", Value::Null).await
    }

    async fn project_path(&self) -> Result<String, HostError> {
        self.call_as("project.path", Value::Null).await
    }

    async fn run_script(&self, request: ScriptRequest) -> Result<ScriptRun, HostError> {
        let params =
            serde_json::to_value(&request).map_err(|err| HostError::Protocol(err.to_string()))?;
        self.call_as("script.run", params).await
    }

    async fn create_node(&self, name: &str, parent: Option<&NodeId>) -> Result<NodeId, HostError> {
        let created: CreatedNode =
            self.call_as("node.create", json!({ "name": name, "parentUuid": parent })).await?;
        Ok(created.uuid)
    }

    async fn delete_node(&self, uuid: &NodeId) -> Result<(), HostError> {
        self.call("node.delete", json!({ "uuid": uuid })).await.map(drop)
    }

    async fn set_property(&self, uuid: &NodeId, path: &str, value: Value) -> Result<(), HostError> {
        self.call("node.set_property", json!({ "uuid": uuid, "path": path, "value": value }))
            .await
            .map(drop)
    }

    async fn select_nodes(&self, uuids: &[NodeId]) -> Result<(), HostError> {
        self.call("selection.set", json!({ "uuids": uuids })).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    struct FakePlugin {
        lines: tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl FakePlugin {
        async fn next_request(&mut self) -> Value {
            let line = self.lines.next_line().await.expect("read").expect("request line");
            serde_json::from_str(&line).expect("request json")
        }

        async fn reply(&mut self, reply: Value) {
            let mut line = reply.to_string();
            line.push('\n');
            self.writer.write_all(line.as_bytes()).await.expect("write reply");
        }
    }

    fn bridge_pair(call_timeout: Duration) -> (BridgeHost, FakePlugin) {
        let (client, server) = tokio::io::duplex(16 * 1024);
        let host = BridgeHost::from_stream(client, call_timeout);
        let (read_half, writer) = tokio::io::split(server);
        (host, FakePlugin { lines: BufReader::new(read_half).lines(), writer })
    }

    #[tokio::test]
    async fn replies_are_correlated_by_id_in_any_order() {
        let (host, mut plugin) = bridge_pair(Duration::from_secs(5));

        let plugin_task = tokio::spawn(async move {
            let first = plugin.next_request().await;
            let second = plugin.next_request().await;
            for request in [second, first] {
                let result = match request["method"].as_str() {
                    Some("editor.version") => json!("3.8.2"),
                    Some("project.path") => json!("/p"),
                    other => panic!("unexpected method {other:?}"),
                };
                plugin.reply(json!({ "id": request["id"], "result": result })).await;
            }
            plugin
        });

        let (version, path) = tokio::join!(host.editor_version(), host.project_path());
        assert_eq!(version.expect("version"), "3.8.2");
        assert_eq!(path.expect("path"), "/p");
        plugin_task.await.expect("plugin task");
    }

    #[tokio::test]
    async fn error_replies_map_to_host_errors() {
        let (host, mut plugin) = bridge_pair(Duration::from_secs(5));
        let plugin_task = tokio::spawn(async move {
            let request = plugin.next_request().await;
            assert_eq!(request["method"], "node.details");
            assert_eq!(request["params"]["uuid"], "n-9");
            plugin
                .reply(json!({
                    "id": request["id"],
                    "error": { "message": "n-9", "code": "not_found" }
                }))
                .await;
            plugin
        });

        let err = host.node_details(&NodeId::new("n-9").expect("id")).await.unwrap_err();
        assert_eq!(err, HostError::NotFound("n-9".into()));
        plugin_task.await.expect("plugin task");
    }

    #[tokio::test]
    async fn malformed_result_is_a_protocol_error() {
        let (host, mut plugin) = bridge_pair(Duration::from_secs(5));
        let plugin_task = tokio::spawn(async move {
            let request = plugin.next_request().await;
            plugin.reply(json!({ "id": request["id"], "result": { "nope": true } })).await;
            plugin
        });

        let err = host.current_scene().await.unwrap_err();
        assert!(matches!(err, HostError::Protocol(_)));
        plugin_task.await.expect("plugin task");
    }

    #[tokio::test]
    async fn calls_time_out_when_the_plugin_never_answers() {
        let (host, _plugin) = bridge_pair(Duration::from_millis(20));
        let err = host.editor_version().await.unwrap_err();
        assert_eq!(err, HostError::TimedOut(20));
        assert!(host.inner.pending().is_empty());
    }

    #[tokio::test]
    async fn dropped_connection_fails_pending_and_later_calls() {
        let (host, plugin) = bridge_pair(Duration::from_secs(5));
        let pending = {
            let host = host.clone();
            tokio::spawn(async move { host.editor_version().await })
        };
        tokio::task::yield_now().await;
        drop(plugin);

        let err = pending.await.expect("join").unwrap_err();
        assert!(matches!(err, HostError::Unavailable(_)));
        assert!(!host.is_connected());
        assert!(matches!(host.project_path().await.unwrap_err(), HostError::Unavailable(_)));
    }
}
