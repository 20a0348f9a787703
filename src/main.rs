// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Scenebridge CLI entrypoint.
//!
//! By default this serves MCP over HTTP at `http://127.0.0.1:<port>/` with the
//! streamable transport at `/mcp`, the SSE session transport at `/sse` and
//! `/messages`, a stateless `/rpc` endpoint and `/health`.
//!
//! Use `--stdio` to serve MCP over stdin/stdout instead (intended for tool integrations).

use std::error::Error;
use std::net::IpAddr;
use std::sync::Arc;

use rmcp::transport::StreamableHttpServerConfig;
use scenebridge::config::{HostSource, ServerConfig, Transport, DEFAULT_HTTP_PORT, HTTP_PORT_ENV};
use scenebridge::host::{demo_host, BridgeHost, EditorHost};
use scenebridge::mcp::{app, HttpState, SceneBridgeMcp, SessionManager};
use scenebridge::tools::{register_scene_tools, ToolRegistry};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--demo | --bridge <host:port>] [--http-port <port>] [--bind <ip>] [--log <filter>]\n  {program} [--demo | --bridge <host:port>] --stdio [--log <filter>]\n\nHTTP mode (default) serves MCP at `http://<bind>:<port>/mcp` plus `/sse`, `/messages`, `/rpc` and `/health`.\n--http-port selects the port (0 = ephemeral; default {DEFAULT_HTTP_PORT}); --bind defaults to 127.0.0.1.\n\n--bridge connects to the editor plugin over TCP; --demo serves a built-in in-memory scene (the default).\nSCENEBRIDGE_BRIDGE and SCENEBRIDGE_HTTP_PORT fill --bridge and --http-port when they are absent.\n\n--log takes a tracing filter (default scenebridge=info, or RUST_LOG). Logs go to stderr."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    stdio: bool,
    demo: bool,
    bridge: Option<String>,
    http_port: Option<u16>,
    bind: Option<IpAddr>,
    log: Option<String>,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--stdio" => {
                if options.stdio {
                    return Err(());
                }
                options.stdio = true;
            }
            "--demo" => {
                if options.demo {
                    return Err(());
                }
                options.demo = true;
            }
            "--bridge" => {
                if options.bridge.is_some() {
                    return Err(());
                }
                let addr = args.next().filter(|addr| !addr.starts_with('-')).ok_or(())?;
                options.bridge = Some(addr);
            }
            "--http-port" => {
                if options.http_port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let port: u16 = raw.parse().map_err(|_| ())?;
                options.http_port = Some(port);
            }
            "--bind" => {
                if options.bind.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                options.bind = Some(raw.parse().map_err(|_| ())?);
            }
            "--log" => {
                if options.log.is_some() {
                    return Err(());
                }
                options.log = Some(args.next().ok_or(())?);
            }
            _ => return Err(()),
        }
    }

    if options.demo && options.bridge.is_some() {
        return Err(());
    }

    if options.stdio && options.http_port.is_some() {
        return Err(());
    }

    Ok(options)
}

/// Resolves flags and environment. The second value is an unparsable
/// `SCENEBRIDGE_HTTP_PORT`, to be logged once tracing is initialised.
fn server_config(
    options: CliOptions,
    env: impl Fn(&str) -> Option<String>,
) -> (ServerConfig, Option<String>) {
    let host_flag_set = options.demo || options.bridge.is_some();
    let port_flag_set = options.http_port.is_some();
    let defaults = ServerConfig::default();
    let mut config = ServerConfig {
        transport: if options.stdio { Transport::Stdio } else { Transport::Http },
        host: options.bridge.map_or(HostSource::Demo, HostSource::Bridge),
        http_port: options.http_port.unwrap_or(defaults.http_port),
        bind: options.bind.unwrap_or(defaults.bind),
        log_filter: options.log,
        ..defaults
    };
    let rejected_port = config.apply_env(host_flag_set, port_flag_set, env);
    (config, rejected_port)
}

fn init_tracing(config: &ServerConfig) -> Result<(), Box<dyn Error>> {
    let filter = match &config.log_filter {
        Some(filter) => EnvFilter::try_new(filter)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()?;
    Ok(())
}

async fn serve<H: EditorHost>(host: Arc<H>, config: ServerConfig) -> Result<(), Box<dyn Error>> {
    let mut registry = ToolRegistry::new();
    register_scene_tools(&mut registry, host, config.script_timeout_ms);
    let registry = Arc::new(registry);
    tracing::info!(tools = registry.len(), "tool catalog registered");

    let mcp = SceneBridgeMcp::new(registry);
    if config.transport == Transport::Stdio {
        mcp.serve_stdio().await?;
        return Ok(());
    }

    let sessions = Arc::new(
        SessionManager::new()
            .on_session_initialized(|id| tracing::debug!(session = %id, "sse client attached"))
            .on_session_closed(|id| tracing::debug!(session = %id, "sse client detached")),
    );
    let state = HttpState::new(mcp, sessions.clone())
        .with_keep_alive(config.sse_keep_alive);

    let http_config =
        StreamableHttpServerConfig { stateful_mode: true, ..StreamableHttpServerConfig::default() };
    let shutdown_token = http_config.cancellation_token.clone();
    let server_shutdown = shutdown_token.clone();
    let router = app(state, http_config);

    let listener = tokio::net::TcpListener::bind((config.bind, config.http_port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "serving MCP over HTTP");

    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "cannot listen for ctrl-c");
            return;
        }
        tracing::info!("shutting down");
        // Ending the SSE streams first lets graceful shutdown drain their connections.
        let closed = sessions.close_all();
        tracing::info!(closed, "closed sse sessions");
        shutdown_token.cancel();
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            server_shutdown.cancelled().await;
        })
        .await?;
    Ok(())
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn Error>> {
    match config.bridge_config() {
        Some(bridge) => {
            tracing::info!(addr = %bridge.addr, "connecting to editor bridge");
            let host = BridgeHost::connect(bridge).await?;
            serve(Arc::new(host), config).await
        }
        None => {
            tracing::info!("serving the built-in demo scene");
            serve(Arc::new(demo_host()?), config).await
        }
    }
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "scenebridge".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };
        let (config, rejected_port) = server_config(options, |key| std::env::var(key).ok());
        init_tracing(&config)?;
        if let Some(value) = rejected_port {
            tracing::warn!(%value, "ignoring invalid {HTTP_PORT_ENV}");
        }

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(run(config))
    })();

    if let Err(err) = result {
        eprintln!("scenebridge: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_options, server_config, CliOptions};
    use scenebridge::config::{HostSource, Transport, BRIDGE_ENV, DEFAULT_HTTP_PORT, HTTP_PORT_ENV};

    fn args(raw: &[&str]) -> impl Iterator<Item = String> {
        raw.iter().map(|arg| (*arg).to_owned()).collect::<Vec<_>>().into_iter()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parses_empty_args() {
        let options = parse_options(std::iter::empty()).expect("parse options");
        assert_eq!(options, CliOptions::default());
    }

    #[test]
    fn parses_stdio_flag() {
        let options = parse_options(args(&["--stdio"])).expect("parse options");
        assert!(options.stdio);
        assert!(!options.demo);
        assert_eq!(options.http_port, None);
    }

    #[test]
    fn parses_bridge_and_port() {
        let options = parse_options(args(&["--bridge", "127.0.0.1:7000", "--http-port", "0"]))
            .expect("parse options");
        assert_eq!(options.bridge.as_deref(), Some("127.0.0.1:7000"));
        assert_eq!(options.http_port, Some(0));
    }

    #[test]
    fn parses_bind_and_log() {
        let options =
            parse_options(args(&["--bind", "0.0.0.0", "--log", "scenebridge=debug"])).expect("parse options");
        assert_eq!(options.bind.map(|ip| ip.to_string()).as_deref(), Some("0.0.0.0"));
        assert_eq!(options.log.as_deref(), Some("scenebridge=debug"));
    }

    #[test]
    fn rejects_http_port_with_stdio() {
        parse_options(args(&["--stdio", "--http-port", "0"])).unwrap_err();
    }

    #[test]
    fn rejects_demo_with_bridge() {
        parse_options(args(&["--demo", "--bridge", "127.0.0.1:7000"])).unwrap_err();
    }

    #[test]
    fn rejects_bad_values() {
        parse_options(args(&["--http-port", "70000"])).unwrap_err();
        parse_options(args(&["--bind", "localhost"])).unwrap_err();
        parse_options(args(&["--bridge", "--stdio"])).unwrap_err();
        parse_options(args(&["--log"])).unwrap_err();
    }

    #[test]
    fn rejects_unknown_and_positional_args() {
        parse_options(args(&["--nope"])).unwrap_err();
        parse_options(args(&["scene.fire"])).unwrap_err();
    }

    #[test]
    fn rejects_duplicate_flags() {
        parse_options(args(&["--demo", "--demo"])).unwrap_err();
        parse_options(args(&["--stdio", "--stdio"])).unwrap_err();
        parse_options(args(&["--http-port", "1", "--http-port", "2"])).unwrap_err();
    }

    #[test]
    fn resolves_transport_and_host() {
        let (config, _) = server_config(parse_options(args(&["--stdio"])).unwrap(), no_env);
        assert_eq!(config.transport, Transport::Stdio);
        assert_eq!(config.host, HostSource::Demo);

        let (config, _) =
            server_config(parse_options(args(&["--bridge", "editor:7000"])).unwrap(), no_env);
        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.host, HostSource::Bridge("editor:7000".to_owned()));
    }

    #[test]
    fn explicit_demo_ignores_bridge_env() {
        let env = |key: &str| (key == BRIDGE_ENV).then(|| "editor:7000".to_owned());
        let (config, _) = server_config(parse_options(args(&["--demo"])).unwrap(), env);
        assert_eq!(config.host, HostSource::Demo);

        let (config, _) = server_config(CliOptions::default(), env);
        assert_eq!(config.host, HostSource::Bridge("editor:7000".to_owned()));
    }

    #[test]
    fn invalid_port_env_is_handed_back_for_logging() {
        let env = |key: &str| (key == HTTP_PORT_ENV).then(|| "eighty".to_owned());
        let (config, rejected) = server_config(CliOptions::default(), env);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(rejected.as_deref(), Some("eighty"));

        let (_, rejected) = server_config(parse_options(args(&["--http-port", "9000"])).unwrap(), env);
        assert_eq!(rejected, None);
    }
}
