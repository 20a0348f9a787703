// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Live sessions for the SSE transport.
//!
//! Opening a session hands back its two halves: a [`SessionTransport`] that an
//! rmcp service runs on, and the [`SessionStream`] of replies the SSE response
//! forwards. Posts carrying the session's id are delivered to the transport. A
//! session closes when either half is dropped, when a delivery or a reply fails,
//! or on [`SessionManager::close_all`], and the close hook fires once per session
//! however many of those happen.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use rmcp::transport::Transport;
use rmcp::RoleServer;
use tokio::sync::mpsc;
use tokio_stream::Stream;

use crate::error::SessionError;
use crate::model::SessionId;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

pub type SessionHook = Arc<dyn Fn(&SessionId) + Send + Sync>;

type Inbound = mpsc::Sender<ClientJsonRpcMessage>;

pub struct SessionManager {
    sessions: Mutex<HashMap<SessionId, Inbound>>,
    on_initialized: Option<SessionHook>,
    on_closed: Option<SessionHook>,
    channel_capacity: usize,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.len())
            .field("channel_capacity", &self.channel_capacity)
            .finish_non_exhaustive()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            on_initialized: None,
            on_closed: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn on_session_initialized(mut self, hook: impl Fn(&SessionId) + Send + Sync + 'static) -> Self {
        self.on_initialized = Some(Arc::new(hook));
        self
    }

    pub fn on_session_closed(mut self, hook: impl Fn(&SessionId) + Send + Sync + 'static) -> Self {
        self.on_closed = Some(Arc::new(hook));
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Inbound>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new session and returns the transport its posts arrive on
    /// together with the stream its replies leave through.
    pub fn open(self: &Arc<Self>) -> (SessionTransport, SessionStream) {
        let (inbound_tx, inbound_rx) = mpsc::channel(self.channel_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.channel_capacity);
        let id = {
            let mut sessions = self.sessions();
            let mut id = SessionId::generate();
            while sessions.contains_key(&id) {
                id = SessionId::generate();
            }
            sessions.insert(id.clone(), inbound_tx);
            id
        };
        tracing::info!(session = %id, "session opened");
        if let Some(hook) = &self.on_initialized {
            hook(&id);
        }
        let transport = SessionTransport {
            id: id.clone(),
            inbound: inbound_rx,
            outbound: outbound_tx,
            manager: Arc::downgrade(self),
        };
        let stream = SessionStream { id, rx: outbound_rx, manager: Arc::downgrade(self) };
        (transport, stream)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    pub fn active_ids(&self) -> Vec<SessionId> {
        let mut ids = self.sessions().keys().cloned().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    /// Hands a posted message to the session's transport. A session whose
    /// transport is gone is closed on the spot.
    pub async fn deliver(&self, id: &SessionId, message: ClientJsonRpcMessage) -> Result<(), SessionError> {
        let sender = self
            .sessions()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        if sender.send(message).await.is_err() {
            tracing::warn!(session = %id, "session transport is gone; closing");
            self.close(id);
            return Err(SessionError::Closed(id.clone()));
        }
        Ok(())
    }

    /// Removes the session. Returns `false` if it was not open.
    pub fn close(&self, id: &SessionId) -> bool {
        let removed = self.sessions().remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "session closed");
            if let Some(hook) = &self.on_closed {
                hook(id);
            }
        }
        removed
    }

    /// Closes every open session. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let drained = self.sessions().drain().map(|(id, _)| id).collect::<Vec<_>>();
        for id in &drained {
            tracing::info!(session = %id, "session closed at shutdown");
            if let Some(hook) = &self.on_closed {
                hook(id);
            }
        }
        drained.len()
    }
}

fn close_weak(manager: &Weak<SessionManager>, id: &SessionId) {
    if let Some(manager) = manager.upgrade() {
        manager.close(id);
    }
}

/// The rmcp side of a session. Receiving ends once the session is closed, which
/// stops the service running on it.
pub struct SessionTransport {
    id: SessionId,
    inbound: mpsc::Receiver<ClientJsonRpcMessage>,
    outbound: mpsc::Sender<ServerJsonRpcMessage>,
    manager: Weak<SessionManager>,
}

impl SessionTransport {
    pub fn id(&self) -> &SessionId {
        &self.id
    }
}

impl fmt::Debug for SessionTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTransport").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Transport<RoleServer> for SessionTransport {
    type Error = SessionError;

    fn send(
        &mut self,
        item: ServerJsonRpcMessage,
    ) -> impl Future<Output = Result<(), SessionError>> + Send + 'static {
        let outbound = self.outbound.clone();
        let manager = self.manager.clone();
        let id = self.id.clone();
        async move {
            if outbound.send(item).await.is_err() {
                tracing::warn!(session = %id, "sse stream is gone; closing");
                close_weak(&manager, &id);
                return Err(SessionError::Closed(id));
            }
            Ok(())
        }
    }

    async fn receive(&mut self) -> Option<ClientJsonRpcMessage> {
        self.inbound.recv().await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.inbound.close();
        Ok(())
    }
}

impl Drop for SessionTransport {
    fn drop(&mut self) {
        close_weak(&self.manager, &self.id);
    }
}

/// Replies for one session, in the order the service sends them. Dropping the
/// stream closes the session.
pub struct SessionStream {
    id: SessionId,
    rx: mpsc::Receiver<ServerJsonRpcMessage>,
    manager: Weak<SessionManager>,
}

impl SessionStream {
    pub fn id(&self) -> &SessionId {
        &self.id
    }
}

impl fmt::Debug for SessionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStream").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Stream for SessionStream {
    type Item = ServerJsonRpcMessage;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ServerJsonRpcMessage>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        close_weak(&self.manager, &self.id);
    }
}
