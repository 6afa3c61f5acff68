use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use futures_util::future;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use openai_gemini::config::{load_config_or_default, AppConfig, ServerConfig};
use openai_gemini::observability::init_tracing;
use openai_gemini::routing::dispatch::dispatch_request;
use openai_gemini::state::AppState;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const CONFIG_PATH_ENV: &str = "OPENAI_GEMINI_CONFIG";
const LISTEN_BACKLOG: i32 = 1024;

fn main() {
    let config_path = resolve_config_path();
    let config = load_config_or_default(&config_path).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration from {config_path}: {e}");
        eprintln!("See 'config.example.yaml' for the accepted fields.");
        std::process::exit(1);
    });

    init_tracing(&config.features.log_level);
    let runtime = build_runtime(&config.server).unwrap_or_else(|e| {
        eprintln!("Failed to initialize Tokio runtime: {e}");
        std::process::exit(1);
    });

    if let Err(err) = runtime.block_on(serve(config)) {
        eprintln!("Server error: {err}");
        std::process::exit(1);
    }
}

/// First CLI argument, then `$OPENAI_GEMINI_CONFIG`, then `config.yaml`.
fn resolve_config_path() -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

fn build_runtime(server: &ServerConfig) -> io::Result<tokio::runtime::Runtime> {
    let mut builder = match server.runtime_worker_threads {
        Some(1) => tokio::runtime::Builder::new_current_thread(),
        threads => {
            let mut builder = tokio::runtime::Builder::new_multi_thread();
            if let Some(threads) = threads {
                builder.worker_threads(threads);
            }
            builder
        }
    };
    builder.enable_all().build()
}

async fn serve(config: AppConfig) -> io::Result<()> {
    let state = Arc::new(AppState::from_config(config));
    let server = &state.config.server;
    let addr = resolve_listen_addr(&server.host, server.port).await?;
    let listeners = bind_listeners(addr, server.tcp_reuse_port_listener_count)?;

    tracing::info!(
        %addr,
        listeners = listeners.len(),
        upstream = %state.config.upstream.base_url,
        default_model = %state.config.upstream.default_model,
        "openai-gemini listening"
    );

    let conn_builder = AutoBuilder::new(TokioExecutor::new());
    let accept_loops = listeners.into_iter().map(|listener| {
        let conn_builder = conn_builder.clone();
        let state = Arc::clone(&state);
        tokio::spawn(accept_loop(listener, conn_builder, state))
    });
    let accept_loops = future::join_all(accept_loops);

    tokio::select! {
        _ = accept_loops => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("shutdown signal received");
        }
    }
    Ok(())
}

async fn accept_loop(
    listener: TcpListener,
    conn_builder: AutoBuilder<TokioExecutor>,
    state: Arc<AppState>,
) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
                continue;
            }
        };
        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!(%remote_addr, error = %err, "failed to set TCP_NODELAY");
        }

        let conn_builder = conn_builder.clone();
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let service = service_fn(move |request: Request<Incoming>| {
                dispatch_request(Arc::clone(&state), request.map(Body::new))
            });
            if let Err(err) = conn_builder
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(%remote_addr, "connection closed with error: {err:#}");
            }
        });
    }
}

async fn resolve_listen_addr(host: &str, port: u16) -> io::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no socket address for {host}:{port}"),
            )
        })
}

/// One listener normally; `count` `SO_REUSEPORT` listeners on the same
/// address when configured on a Unix platform.
fn bind_listeners(addr: SocketAddr, count: Option<usize>) -> io::Result<Vec<TcpListener>> {
    let mut count = count.unwrap_or(1).max(1);
    if count > 1 && !cfg!(unix) {
        tracing::warn!("SO_REUSEPORT is unavailable on this platform; using a single listener");
        count = 1;
    }
    (0..count).map(|_| bind_listener(addr, count > 1)).collect()
}

fn bind_listener(addr: SocketAddr, reuse_port: bool) -> io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    if reuse_port {
        enable_reuse_port(&socket)?;
    }
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;
    TcpListener::from_std(socket.into())
}

#[cfg(unix)]
fn enable_reuse_port(socket: &Socket) -> io::Result<()> {
    socket.set_reuse_port(true)
}

#[cfg(not(unix))]
fn enable_reuse_port(_socket: &Socket) -> io::Result<()> {
    Ok(())
}
