// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Resolved server settings.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::host::BridgeConfig;
use crate::mcp::DEFAULT_SSE_KEEP_ALIVE;
use crate::sandbox::DEFAULT_TIMEOUT_MS;

pub const DEFAULT_HTTP_PORT: u16 = 27436;
pub const DEFAULT_LOG_FILTER: &str = "scenebridge=info";
pub const DEFAULT_BRIDGE_CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub const BRIDGE_ENV: &str = "SCENEBRIDGE_BRIDGE";
pub const HTTP_PORT_ENV: &str = "SCENEBRIDGE_HTTP_PORT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSource {
    Demo,
    Bridge(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub transport: Transport,
    pub host: HostSource,
    pub http_port: u16,
    pub bind: IpAddr,
    pub log_filter: Option<String>,
    pub script_timeout_ms: u64,
    pub bridge_call_timeout: Duration,
    pub sse_keep_alive: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Http,
            host: HostSource::Demo,
            http_port: DEFAULT_HTTP_PORT,
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            log_filter: None,
            script_timeout_ms: DEFAULT_TIMEOUT_MS,
            bridge_call_timeout: DEFAULT_BRIDGE_CALL_TIMEOUT,
            sse_keep_alive: DEFAULT_SSE_KEEP_ALIVE,
        }
    }
}

impl ServerConfig {
    /// Fills the bridge address and HTTP port from `env` when no flag chose them.
    /// `host_flag_set` covers both `--demo` and `--bridge`. An unparsable port is
    /// left out and handed back so the caller can report it once logging is up.
    #[must_use]
    pub fn apply_env(
        &mut self,
        host_flag_set: bool,
        port_flag_set: bool,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        if !host_flag_set {
            if let Some(addr) = env(BRIDGE_ENV).filter(|addr| !addr.is_empty()) {
                self.host = HostSource::Bridge(addr);
            }
        }
        if port_flag_set {
            return None;
        }
        let raw = env(HTTP_PORT_ENV)?;
        match raw.parse() {
            Ok(port) => {
                self.http_port = port;
                None
            }
            Err(_) => Some(raw),
        }
    }

    pub fn bridge_config(&self) -> Option<BridgeConfig> {
        match &self.host {
            HostSource::Bridge(addr) => {
                let mut config = BridgeConfig::new(addr.clone());
                config.call_timeout = self.bridge_call_timeout;
                Some(config)
            }
            HostSource::Demo => None,
        }
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}
