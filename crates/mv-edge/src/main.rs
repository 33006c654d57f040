use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use mv_domain::config::{Config, ConfigSeverity};
use mv_edge::cli::{Cli, Command, ConfigCommand};
use mv_edge::state::AppState;
use mv_llm::{LlmGate, MockLlmClient};
use mv_sessions::{HeartbeatMonitor, SessionManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _config_path) = mv_edge::cli::load_config()?;
            run_server(Arc::new(config)).await
        }
        Some(Command::Doctor) => {
            let (config, config_path) = mv_edge::cli::load_config()?;
            let passed = mv_edge::cli::doctor::run(&config, &config_path)?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = mv_edge::cli::load_config()?;
            let valid = mv_edge::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = mv_edge::cli::load_config()?;
            mv_edge::cli::config::show(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("marketvoice {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,mv_edge=debug")))
        .json()
        .init();
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("MarketVoice starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let store = Arc::new(mv_store::Store::open(&config.store.state_path).context("opening state store")?);
    tracing::info!(path = %config.store.state_path.display(), "store ready");

    let cache = Arc::new(mv_cache::KvCache::new());

    let tools = Arc::new(mv_tools::registry::build_default(config.tools.clone(), cache, store.clone()));
    tracing::info!("tool registry ready (simulated backends)");

    let llm_client: Arc<dyn mv_llm::LlmClient> = Arc::new(MockLlmClient::new(&config.llm.model));
    let llm_gate = Arc::new(LlmGate::new(
        llm_client,
        Duration::from_secs(config.deadlines.llm_timeout_secs),
        config.llm.queue_depth_warning,
    ));
    tracing::info!(model = %config.llm.model, "LLM gate ready (simulated endpoint)");

    let post_run = Arc::new(mv_logger::PostRunWriter::new(&config.logging.transcript_root));
    let memory = Arc::new(mv_memory::MemoryManager::new(
        store.clone(),
        llm_gate.clone(),
        post_run,
        &config.deadlines,
        &config.memory,
    ));
    tracing::info!("memory manager ready");

    let agent = Arc::new(mv_agent::AgentGraph::new(llm_gate, tools, memory.clone(), config.deadlines.clone()));
    tracing::info!("agent graph ready");

    let transcripts = Arc::new(mv_logger::TranscriptWriter::new(&config.logging.transcript_root));
    let sessions = Arc::new(SessionManager::new(
        store.clone(),
        agent,
        memory,
        transcripts,
        config.sessions.clone(),
    ));
    tracing::info!(
        idle_limit_secs = config.sessions.idle_limit_secs,
        "session manager ready"
    );

    let heartbeat = Arc::new(HeartbeatMonitor::new(sessions.clone()));
    let heartbeat_cancel = mv_domain::cancel::CancelToken::new();
    {
        let heartbeat = heartbeat.clone();
        let cancel = heartbeat_cancel.clone();
        tokio::spawn(async move { heartbeat.run(cancel).await });
    }
    tracing::info!("heartbeat monitor started");

    let cors_layer = build_cors_layer(&config.server.cors);
    let state = AppState { config: config.clone(), sessions: sessions.clone(), heartbeat };
    let app = mv_edge::router(state).layer(cors_layer);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, "MarketVoice listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("axum server error")?;

    heartbeat_cancel.cancel();
    sessions.close_all("shutdown").await;
    tracing::info!("MarketVoice stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}

/// Build a [`CorsLayer`] from the configured allowed origins. Origins may
/// carry a trailing `*` wildcard for the port segment
/// (`http://localhost:*`); a literal `"*"` allows all origins.
fn build_cors_layer(cors: &mv_domain::config::CorsConfig) -> CorsLayer {
    use axum::http::header;

    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();
    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            wildcard_prefixes.push(origin.trim_end_matches('*').to_owned());
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
