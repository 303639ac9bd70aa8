//! tinyrpc CLI Client
//!
//! Calls the demo `user-service` on a running server.

use std::time::Duration;

use clap::Parser;
use tinyrpc::demo::{GetByIdReq, UserServiceClient};
use tinyrpc::{CallOptions, Client, ClientConfig, Codec, RpcError};
use tracing_subscriber::{fmt, EnvFilter};

/// tinyrpc CLI
#[derive(Parser, Debug)]
#[command(name = "tinyrpc-cli")]
#[command(about = "Call user-service.GetById on a tinyrpc server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8081")]
    server: String,

    /// Payload encoding: json or bincode
    #[arg(long, default_value = "json")]
    serializer: String,

    /// Fire and forget; do not wait for the result
    #[arg(long)]
    one_way: bool,

    /// Per-call timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// The user id to look up
    id: i64,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let Some(codec) = Codec::from_name(&args.serializer) else {
        eprintln!("unknown serializer {:?} (expected json or bincode)", args.serializer);
        std::process::exit(2);
    };

    let config = ClientConfig::builder().server_addr(&args.server).build();
    let client = match Client::connect_with(config, codec) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("connect failed: {}", e);
            std::process::exit(1);
        }
    };

    let users: UserServiceClient = match client.init_service() {
        Ok(users) => users,
        Err(e) => {
            eprintln!("bind failed: {}", e);
            std::process::exit(1);
        }
    };

    let mut opts = if args.one_way {
        CallOptions::one_way()
    } else {
        CallOptions::new()
    };
    if let Some(ms) = args.timeout_ms {
        opts = opts.with_timeout(Duration::from_millis(ms));
    }

    let reply = users.get_by_id(&opts, &GetByIdReq { id: args.id });
    match reply.error {
        None => println!("{}", reply.value.msg),
        Some(RpcError::OneWay) => println!("sent (one-way)"),
        Some(e) => {
            if !reply.value.msg.is_empty() {
                println!("{}", reply.value.msg);
            }
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
