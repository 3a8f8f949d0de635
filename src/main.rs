//! Master server entry point.

use std::process;

use tabletdb::config::ServerConfig;
use tabletdb::coordinator::ServerKind;
use tabletdb::master::Master;
use tabletdb::observability::Logger;
use tabletdb::rpc::{RpcServer, ServerTransports};

#[tokio::main]
async fn main() {
    let mut config = ServerConfig::default();

    // Optional positional overrides: log megabytes, index megabytes.
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() == 2 {
        if let Err(e) = config.size_log_and_hash_table(&args[0], &args[1]) {
            exit_with_error(&e.to_string());
        }
    } else if !args.is_empty() {
        exit_with_error("usage: tabletdb [<log megabytes> <index megabytes>]");
    }

    let master = Master::new(&config);
    let mut transports = ServerTransports::disconnected();

    match transports
        .coordinator
        .enlist_server(ServerKind::Master, &config.local_locator)
    {
        Ok(server_id) => {
            let id = server_id.to_string();
            Logger::info("enlist_server", &[("server_id", &id)]);
        }
        Err(e) => {
            let message = format!("running without a coordinator: {}", e);
            Logger::warn("enlist_server", &[("message", &message)]);
        }
    }

    let server = RpcServer::new(&config, master, transports);
    if let Err(e) = server.start().await {
        exit_with_error(&e.to_string());
    }
}

fn exit_with_error(message: &str) -> ! {
    let error_json = serde_json::json!({
        "status": "error",
        "message": message,
    });
    eprintln!("{}", error_json);
    process::exit(1);
}
