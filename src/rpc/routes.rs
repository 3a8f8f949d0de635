//! Route handlers for the RPC surface.
//!
//! One POST route per operation. Handlers serialize access to the master
//! through a mutex: each one runs to completion before the next touches
//! the index or the log, which is the concurrency model the store is
//! built around.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::backup::{BackupClient, BackupError, BackupResult};
use crate::coordinator::{CoordinatorClient, CoordinatorError, CoordinatorResult, ServerKind};
use crate::master::{Master, RecoveryTransports};
use crate::table::TabletDescriptor;

use super::errors::RpcError;
use super::types::{
    CreateRequest, CreateResponse, PingResponse, ReadRequest, ReadResponse, RecoverRequest,
    RecoverResponse, RemoveRequest, RemoveResponse, SetTabletsRequest, SetTabletsResponse,
    WriteRequest, WriteResponse,
};

/// Shared server state.
pub struct AppState {
    pub master: Mutex<Master>,
    pub transports: Mutex<ServerTransports>,
}

/// The consumed-protocol clients the server dispatches recovery through.
pub struct ServerTransports {
    pub backups: Box<dyn BackupClient + Send>,
    pub coordinator: Box<dyn CoordinatorClient + Send>,
}

impl ServerTransports {
    /// Bundle concrete protocol clients.
    pub fn new(
        backups: Box<dyn BackupClient + Send>,
        coordinator: Box<dyn CoordinatorClient + Send>,
    ) -> Self {
        Self {
            backups,
            coordinator,
        }
    }

    /// Transports for a server running outside any cluster: every call
    /// fails with a transport error. Client-facing operations work
    /// normally; only `recover` needs the cluster.
    pub fn disconnected() -> Self {
        Self {
            backups: Box::new(Disconnected),
            coordinator: Box::new(Disconnected),
        }
    }
}

struct Disconnected;

impl BackupClient for Disconnected {
    fn start_reading_data(
        &mut self,
        _locator: &str,
        _master_id: u64,
        _tablets: &[TabletDescriptor],
    ) -> BackupResult<()> {
        Err(BackupError::Transport(
            "no backup transport configured".to_string(),
        ))
    }

    fn get_recovery_data(
        &mut self,
        _locator: &str,
        _master_id: u64,
        _segment_id: u64,
        _partition_id: u64,
        _tablets: &[TabletDescriptor],
    ) -> BackupResult<Vec<u8>> {
        Err(BackupError::Transport(
            "no backup transport configured".to_string(),
        ))
    }
}

impl CoordinatorClient for Disconnected {
    fn enlist_server(&mut self, _kind: ServerKind, _locator: &str) -> CoordinatorResult<u64> {
        Err(CoordinatorError::Transport(
            "no coordinator transport configured".to_string(),
        ))
    }

    fn tablets_recovered(
        &mut self,
        _master_id: u64,
        _tablets: &[TabletDescriptor],
    ) -> CoordinatorResult<()> {
        Err(CoordinatorError::Transport(
            "no coordinator transport configured".to_string(),
        ))
    }
}

/// Build the router for all master operations.
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ping", post(ping))
        .route("/create", post(create))
        .route("/read", post(read))
        .route("/write", post(write))
        .route("/remove", post(remove))
        .route("/set_tablets", post(set_tablets))
        .route("/recover", post(recover))
        .with_state(state)
}

async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    state.master.lock().expect("master lock poisoned").ping();
    Json(PingResponse::ok())
}

async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRequest>,
) -> Result<Json<CreateResponse>, RpcError> {
    let mut master = state.master.lock().expect("master lock poisoned");
    let (object_id, version) = master.create(request.table_id, &request.data)?;
    Ok(Json(CreateResponse { object_id, version }))
}

async fn read(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReadRequest>,
) -> Result<Json<ReadResponse>, RpcError> {
    let master = state.master.lock().expect("master lock poisoned");
    let (value, version) = master.read(
        request.table_id,
        request.object_id,
        request.reject_rules.as_ref(),
    )?;
    Ok(Json(ReadResponse {
        data: value.to_vec(),
        version,
    }))
}

async fn write(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WriteRequest>,
) -> Result<Json<WriteResponse>, RpcError> {
    let mut master = state.master.lock().expect("master lock poisoned");
    let version = master.write(
        request.table_id,
        request.object_id,
        &request.data,
        request.reject_rules.as_ref(),
    )?;
    Ok(Json(WriteResponse { version }))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RemoveRequest>,
) -> Result<Json<RemoveResponse>, RpcError> {
    let mut master = state.master.lock().expect("master lock poisoned");
    let version = master.remove(
        request.table_id,
        request.object_id,
        request.reject_rules.as_ref(),
    )?;
    Ok(Json(RemoveResponse { version }))
}

async fn set_tablets(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetTabletsRequest>,
) -> Result<Json<SetTabletsResponse>, RpcError> {
    let mut master = state.master.lock().expect("master lock poisoned");
    master.set_tablets(&request.tablets);
    Ok(Json(SetTabletsResponse {
        tablets: request.tablets.len(),
    }))
}

async fn recover(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecoverRequest>,
) -> Result<Json<RecoverResponse>, RpcError> {
    let mut master = state.master.lock().expect("master lock poisoned");
    let mut transports = state.transports.lock().expect("transports lock poisoned");
    let transports = &mut *transports;
    master.recover(
        request.master_id,
        request.partition_id,
        &request.tablets,
        &request.backups,
        &mut RecoveryTransports {
            backups: transports.backups.as_mut(),
            coordinator: transports.coordinator.as_mut(),
        },
    )?;
    Ok(Json(RecoverResponse {
        tablets: request.tablets.len(),
    }))
}
