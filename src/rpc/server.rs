//! The RPC server binding the master to the network.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::master::Master;
use crate::observability::Logger;

use super::routes::{routes, AppState, ServerTransports};

/// RPC server for one master.
pub struct RpcServer {
    listen_addr: String,
    router: Router,
}

impl RpcServer {
    /// Wire a master and its cluster transports into a router.
    pub fn new(config: &ServerConfig, master: Master, transports: ServerTransports) -> Self {
        let state = Arc::new(AppState {
            master: Mutex::new(master),
            transports: Mutex::new(transports),
        });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Self {
            listen_addr: config.listen_addr.clone(),
            router: routes(state).layer(cors),
        }
    }

    /// The router, for in-process testing.
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process exits.
    pub async fn start(self) -> io::Result<()> {
        let addr: SocketAddr = self.listen_addr.parse().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid listen address \"{}\": {}", self.listen_addr, e),
            )
        })?;

        Logger::info("rpc_server", &[("listen_addr", &self.listen_addr)]);
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await
    }
}
