//! RPC surface: wire types, routes, and the server.

pub mod errors;
pub mod routes;
pub mod server;
pub mod types;

pub use errors::RpcError;
pub use routes::{AppState, ServerTransports};
pub use server::RpcServer;
