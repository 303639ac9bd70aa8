//! tinyrpc Server Binary
//!
//! Serves the demo `user-service` over TCP.

use std::sync::Arc;

use clap::Parser;
use tinyrpc::demo::{UserServiceImpl, UserServiceServer};
use tinyrpc::{Codec, Server, ServerConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// tinyrpc Server
#[derive(Parser, Debug)]
#[command(name = "tinyrpc-server")]
#[command(about = "Demo RPC server exposing user-service")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8081")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Message returned by GetById
    #[arg(long, default_value = "hello, world")]
    message: String,

    /// Make GetById fail with this error text
    #[arg(long)]
    fail_with: Option<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tinyrpc=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("tinyrpc Server v{}", tinyrpc::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = ServerConfig::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .build();

    let handler = Arc::new(UserServiceImpl::new(args.message));
    if let Some(err) = args.fail_with {
        handler.set_reply("", Some(err));
    }

    let mut server = Server::new(config);
    if let Err(e) = server.register_serializer(Codec::BINCODE) {
        tracing::error!("Failed to register serializer: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = server.register_service(UserServiceServer(handler)) {
        tracing::error!("Failed to register service: {}", e);
        std::process::exit(1);
    }

    // Log one-way outcomes nobody else will see
    let outcomes = server.one_way_outcomes();
    std::thread::spawn(move || {
        for outcome in outcomes {
            tracing::info!(
                "one-way {}.{} finished (error: {:?})",
                outcome.service,
                outcome.method,
                outcome.error
            );
        }
    });

    if let Err(e) = server.serve() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
