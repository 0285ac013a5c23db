// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Operator CLI: run the gateway locally, inspect the tool registry, and
//! tail a trace log — the `mcpforge` counterpart to `abp-cli`'s split from
//! `abp-daemon`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use mcpforge_dispatcher::{Dispatcher, Services};
use mcpforge_registry::ToolRegistry;
use mcpforge_router::{AppState, TraceFlushHandle};
use mcpforge_services::{MockEngine, MockExporter, MockFormats, ServiceContext};
use mcpforge_session::{SessionPruner, SessionStore};
use mcpforge_trace::{TraceLogFlushScheduler, TraceLogStore, TraceRecorder, TraceWriter};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mcpforge", version, about = "mcpforge operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP gateway in the foreground, same wiring as the
    /// `mcpforge-daemon` binary.
    Serve {
        /// Path to a TOML config file. Defaults are used if omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured `host:port` bind address.
        #[arg(long)]
        bind: Option<String>,

        /// Directory used for the trace log file and other local state.
        #[arg(long, default_value = ".mcpforge")]
        workspace_dir: PathBuf,
    },

    /// Tool registry inspection.
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },

    /// Trace log inspection.
    Trace {
        #[command(subcommand)]
        action: TraceAction,
    },
}

#[derive(Subcommand, Debug)]
enum RegistryAction {
    /// Print the registry's content hash.
    Hash,
    /// List every registered tool's name and title.
    List,
}

#[derive(Subcommand, Debug)]
enum TraceAction {
    /// Print the last N records of an NDJSON trace log file.
    Tail {
        /// Path to the trace log file.
        file: PathBuf,

        /// Number of trailing records to print.
        #[arg(long, default_value_t = 20)]
        lines: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug { EnvFilter::new("mcpforge=debug") } else { EnvFilter::new("mcpforge=info") };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Serve { config, bind, workspace_dir } => cmd_serve(config, bind, workspace_dir).await,
        Commands::Registry { action } => cmd_registry(action),
        Commands::Trace { action } => cmd_trace(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_registry(action: RegistryAction) -> Result<()> {
    let registry = ToolRegistry::build();
    match action {
        RegistryAction::Hash => println!("{}", registry.hash()),
        RegistryAction::List => {
            for tool in registry.all() {
                println!("{}\t{}", tool.definition.name, tool.definition.title);
            }
        }
    }
    Ok(())
}

fn cmd_trace(action: TraceAction) -> Result<()> {
    let TraceAction::Tail { file, lines } = action;
    let reader = BufReader::new(std::fs::File::open(&file).with_context(|| format!("open {}", file.display()))?);
    let all: Vec<String> = reader.lines().collect::<std::io::Result<_>>().with_context(|| format!("read {}", file.display()))?;
    let start = all.len().saturating_sub(lines);
    for line in &all[start..] {
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            Err(_) => println!("{line}"),
        }
    }
    Ok(())
}

async fn cmd_serve(config_path: Option<PathBuf>, bind_override: Option<String>, workspace_dir: PathBuf) -> Result<()> {
    let mut config = mcpforge_config::load_config(config_path.as_deref()).context("load config")?;
    if let Some(bind) = &bind_override {
        if let Some((host, port)) = bind.rsplit_once(':') {
            config.bind_addr = host.to_string();
            config.port = port.parse().context("parse --bind port")?;
        }
    }
    for warning in mcpforge_config::validate_config(&config).context("validate config")? {
        tracing::warn!(?warning, "config warning");
    }

    tokio::fs::create_dir_all(&workspace_dir).await.with_context(|| format!("create workspace dir {}", workspace_dir.display()))?;

    let engine = Arc::new(MockEngine::new());
    let ctx = Arc::new(ServiceContext::new(engine.clone(), engine, config.limits));
    let services = Arc::new(Services::new(ctx, Arc::new(MockFormats), Arc::new(MockExporter)));
    let registry = Arc::new(ToolRegistry::build());

    let trace_store = TraceLogStore::new(config.trace.max_entries as usize, config.trace.max_bytes.map(|b| b as usize));
    let recorder = Arc::new(TraceRecorder::start(trace_store, env!("CARGO_PKG_VERSION"), None));
    let trace_path = workspace_dir.join("trace.ndjson");
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
    info!(bind = %bind, trace_log = %trace_path.display(), "mcpforge serve listening");

    axum::serve(listener, app).await.context("serve")
}

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
