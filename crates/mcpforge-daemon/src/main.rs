// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! The MCP HTTP/SSE listener binary: loads config, wires the tool
//! dispatcher over the in-memory authoring-engine adapter, starts the
//! session pruner and trace-flush background tasks, and serves
//! `mcpforge-router`'s app (mirrors `abp-daemon/src/main.rs`'s bootstrap
//! shape).

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use mcpforge_dispatcher::{Dispatcher, Services};
use mcpforge_registry::ToolRegistry;
use mcpforge_router::{AppState, TraceFlushHandle};
use mcpforge_services::{MockEngine, MockExporter, MockFormats, ServiceContext};
use mcpforge_session::{SessionPruner, SessionStore};
use mcpforge_trace::{TraceLogFlushScheduler, TraceLogStore, TraceRecorder, TraceWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mcpforge-daemon", version, about = "MCP tool-dispatch gateway for a model-authoring engine")]
struct Args {
    /// Path to a TOML config file. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured bind address (`host:port` split onto
    /// `bind_addr`/`port`).
    #[arg(long)]
    bind: Option<String>,

    /// Directory used for the trace log file and other local state.
    #[arg(long, default_value = ".mcpforge")]
    workspace_dir: PathBuf,

    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = mcpforge_config::load_config(args.config.as_deref()).context("load config")?;
    if let Some(bind) = &args.bind {
        if let Some((host, port)) = bind.rsplit_once(':') {
            config.bind_addr = host.to_string();
            config.port = port.parse().context("parse --bind port")?;
        }
    }

    let filter = if args.debug || config.log_level.as_deref() == Some("debug") {
        EnvFilter::new("mcpforge=debug")
    } else {
        EnvFilter::new(format!("mcpforge={}", config.log_level.as_deref().unwrap_or("info")))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    for warning in mcpforge_config::validate_config(&config).context("validate config")? {
        tracing::warn!(?warning, "config warning");
    }

    tokio::fs::create_dir_all(&args.workspace_dir)
        .await
        .with_context(|| format!("create workspace dir {}", args.workspace_dir.display()))?;

    let engine = Arc::new(MockEngine::new());
    let ctx = Arc::new(ServiceContext::new(engine.clone(), engine, config.limits));
    let services = Arc::new(Services::new(ctx, Arc::new(MockFormats), Arc::new(MockExporter)));
    let registry = Arc::new(ToolRegistry::build());

    let trace_store = TraceLogStore::new(config.trace.max_entries as usize, config.trace.max_bytes.map(|b| b as usize));
    let recorder = Arc::new(TraceRecorder::start(trace_store, env!("CARGO_PKG_VERSION"), None));
    let trace_path = args.workspace_dir.join("trace.ndjson");
    let scheduler = Arc::new(TraceLogFlushScheduler::new(
        FileTraceWriter { path: trace_path.clone() },
        config.trace.flush_every,
        Duration::from_secs(config.trace.flush_interval_secs),
    ));

    let dispatcher = Arc::new(Dispatcher::new(registry, services, Some(recorder.clone())));

    let sessions = Arc::new(SessionStore::new(config.session.ttl_secs as i64));
    let pruner = SessionPruner::new(sessions.clone(), config.session.prune_interval_secs);
    tokio::spawn(async move { pruner.run_interval().await });

    {
        let scheduler = scheduler.clone();
        let recorder = recorder.clone();
        tokio::spawn(async move { scheduler.run_interval(recorder.store()).await });
    }

    let flush_handle: Arc<dyn TraceFlushHandle> = Arc::new(SchedulerFlushHandle { scheduler, recorder });
    let state = AppState::new(dispatcher, sessions).with_trace_flush(flush_handle);
    let app = mcpforge_router::build_app(mcpforge_router::DEFAULT_MCP_PATH, state);

    let bind = format!("{}:{}", config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&bind).await.with_context(|| format!("bind {bind}"))?;
    info!(bind = %bind, trace_log = %trace_path.display(), "mcpforge-daemon listening");

    axum::serve(listener, app).await.context("serve")
}

/// Appends the store's currently retained records to `path` as NDJSON,
/// overwriting the prior snapshot (the store is itself a bounded ring
/// buffer, so each flush is a faithful point-in-time export).
struct FileTraceWriter {
    path: PathBuf,
}

#[async_trait]
impl TraceWriter for FileTraceWriter {
    async fn flush(&self, store: &TraceLogStore) -> Result<(), (String, String)> {
        let mut out = String::new();
        for record in store.entries() {
            let line = serde_json::to_string(record).map_err(|e| ("serialize_error".to_string(), e.to_string()))?;
            out.push_str(&line);
            out.push('\n');
        }
        tokio::fs::write(&self.path, out).await.map_err(|e| ("io_error".to_string(), e.to_string()))
    }
}

/// Bridges the trace crate's writer/scheduler pair to the router's
/// transport-agnostic shutdown hook.
struct SchedulerFlushHandle {
    scheduler: Arc<TraceLogFlushScheduler<FileTraceWriter>>,
    recorder: Arc<TraceRecorder>,
}

#[async_trait]
impl TraceFlushHandle for SchedulerFlushHandle {
    async fn flush(&self) {
        let store = self.recorder.store().lock().expect("trace store lock poisoned");
        self.scheduler.flush_now(&store, true).await;
    }
}
