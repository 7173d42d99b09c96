//! REST API handlers for vault operations
//!
//! Every mutating handler holds the vault write lock for the whole
//! operation, so calls touching the same transaction are serialized.

use crate::api::websocket::{WsBroadcaster, WsEvent};
use crate::multisig::{parse_amount, AuditRecord, MultisigVault, TransactionSnapshot, VaultError};
use crate::storage::Storage;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub vault: Arc<RwLock<MultisigVault>>,
    pub storage: Arc<Storage>,
    pub ws_broadcaster: Arc<WsBroadcaster>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct VaultInfo {
    pub address: String,
    pub description: String,
    pub owners: Vec<String>,
    pub quorum: usize,
    pub balance: u64,
    pub transaction_count: usize,
    pub pending_count: usize,
    pub total_paid_out: u64,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: u64,
}

#[derive(Debug, Serialize)]
pub struct ProposeResponse {
    pub index: u64,
    pub transaction: TransactionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct DepositRequest {
    pub from: String,
    pub amount: i64,
}

#[derive(Deserialize)]
pub struct ProposeRequest {
    pub caller: String,
    pub to: String,
    pub amount: i64,
    /// Hex-encoded payload
    pub data: Option<String>,
}

/// Body of confirm, revoke and execute calls
#[derive(Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Deserialize, Default)]
pub struct ListQuery {
    pub pending: Option<bool>,
}

#[derive(Deserialize, Default)]
pub struct EventsQuery {
    pub count: Option<usize>,
}

// ============================================================================
// Helpers
// ============================================================================

/// HTTP status for a vault rejection
pub fn status_for(err: &VaultError) -> StatusCode {
    match err {
        VaultError::InvalidConfig(_) | VaultError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        VaultError::Unauthorized(_) => StatusCode::FORBIDDEN,
        VaultError::NotFound(_) => StatusCode::NOT_FOUND,
        VaultError::AlreadyConfirmed { .. }
        | VaultError::NotConfirmed { .. }
        | VaultError::AlreadyExecuted(_) => StatusCode::CONFLICT,
        VaultError::QuorumNotMet { .. } | VaultError::InsufficientFunds { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        VaultError::CorruptState(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn vault_error(err: VaultError) -> (StatusCode, Json<ApiError>) {
    (
        status_for(&err),
        Json(ApiError {
            error: err.to_string(),
        }),
    )
}

fn bad_request(message: String) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError { error: message }))
}

/// Persist the vault and push its latest event to WebSocket clients
///
/// If the save fails the vault is put back to `before`, so nothing is
/// acknowledged that a restart would lose.
fn commit(
    state: &ApiState,
    vault: &mut MultisigVault,
    before: MultisigVault,
) -> Result<(), (StatusCode, Json<ApiError>)> {
    if let Err(e) = state.storage.save(vault) {
        log::error!("Failed to save vault, rolling back: {}", e);
        *vault = before;
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError {
                error: format!("Failed to persist vault: {}", e),
            }),
        ));
    }

    if let Some(record) = vault.audit().last() {
        log::debug!(
            "Broadcasting event {} to {} subscribers",
            record.sequence,
            state.ws_broadcaster.subscriber_count()
        );
        state.ws_broadcaster.broadcast(WsEvent::VaultEvent {
            record: record.clone(),
        });
    }
    Ok(())
}

fn vault_info(vault: &MultisigVault) -> VaultInfo {
    VaultInfo {
        address: vault.registry().address(),
        description: vault.registry().description(),
        owners: vault.owners().to_vec(),
        quorum: vault.quorum(),
        balance: vault.balance(),
        transaction_count: vault.transaction_count(),
        pending_count: vault.pending_transactions().len(),
        total_paid_out: vault.custody().total_paid_out(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/vault - Owner set, quorum and balance summary
pub async fn get_vault_info(State(state): State<ApiState>) -> Json<VaultInfo> {
    let vault = state.vault.read().await;
    Json(vault_info(&vault))
}

/// GET /api/balance - Current custody balance
pub async fn get_balance(State(state): State<ApiState>) -> Json<BalanceResponse> {
    let vault = state.vault.read().await;
    Json(BalanceResponse {
        balance: vault.balance(),
    })
}

/// POST /api/deposit - Deposit funds (any caller)
pub async fn deposit(
    State(state): State<ApiState>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<BalanceResponse> {
    let amount = parse_amount(req.amount).map_err(vault_error)?;

    let mut vault = state.vault.write().await;
    let before = vault.clone();
    let balance = vault.deposit(&req.from, amount).map_err(vault_error)?;
    commit(&state, &mut vault, before)?;

    Ok(Json(BalanceResponse { balance }))
}

/// GET /api/transactions - List transactions
pub async fn list_transactions(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<TransactionSnapshot>> {
    let vault = state.vault.read().await;
    if query.pending.unwrap_or(false) {
        Json(vault.pending_transactions())
    } else {
        Json(vault.transactions())
    }
}

/// POST /api/transactions - Propose a transfer
pub async fn propose_transaction(
    State(state): State<ApiState>,
    Json(req): Json<ProposeRequest>,
) -> ApiResult<ProposeResponse> {
    let amount = parse_amount(req.amount).map_err(vault_error)?;
    let payload = match req.data.as_deref() {
        Some(data) => hex::decode(data.trim_start_matches("0x"))
            .map_err(|e| bad_request(format!("Invalid payload hex: {}", e)))?,
        None => Vec::new(),
    };

    let mut vault = state.vault.write().await;
    let before = vault.clone();
    let index = vault
        .propose(&req.caller, &req.to, amount, payload)
        .map_err(vault_error)?;
    commit(&state, &mut vault, before)?;

    let transaction = vault.get(index).map_err(vault_error)?;
    Ok(Json(ProposeResponse { index, transaction }))
}

/// GET /api/transactions/{index} - Transaction snapshot
pub async fn get_transaction(
    State(state): State<ApiState>,
    Path(index): Path<u64>,
) -> ApiResult<TransactionSnapshot> {
    let vault = state.vault.read().await;
    log::debug!("Fetching transaction {}", index);
    vault.get(index).map(Json).map_err(vault_error)
}

/// POST /api/transactions/{index}/confirm - Confirm a transaction
pub async fn confirm_transaction(
    State(state): State<ApiState>,
    Path(index): Path<u64>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<TransactionSnapshot> {
    let mut vault = state.vault.write().await;
    let before = vault.clone();
    vault.confirm(&req.caller, index).map_err(vault_error)?;
    commit(&state, &mut vault, before)?;

    vault.get(index).map(Json).map_err(vault_error)
}

/// POST /api/transactions/{index}/revoke - Revoke a confirmation
pub async fn revoke_confirmation(
    State(state): State<ApiState>,
    Path(index): Path<u64>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<TransactionSnapshot> {
    let mut vault = state.vault.write().await;
    let before = vault.clone();
    vault.revoke(&req.caller, index).map_err(vault_error)?;
    commit(&state, &mut vault, before)?;

    vault.get(index).map(Json).map_err(vault_error)
}

/// POST /api/transactions/{index}/execute - Execute a transaction
pub async fn execute_transaction(
    State(state): State<ApiState>,
    Path(index): Path<u64>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<TransactionSnapshot> {
    let mut vault = state.vault.write().await;
    let before = vault.clone();
    vault.execute(&req.caller, index).map_err(vault_error)?;
    commit(&state, &mut vault, before)?;

    vault.get(index).map(Json).map_err(vault_error)
}

/// GET /api/events - Audit log
pub async fn get_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<AuditRecord>> {
    let vault = state.vault.read().await;
    let records = match query.count {
        Some(count) => vault.audit().tail(count),
        None => vault.events(),
    };
    Json(records.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageConfig;

    fn test_state(dir: &tempfile::TempDir, quorum: usize) -> ApiState {
        let storage = Storage::new(StorageConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        let vault = MultisigVault::new(vec!["A".into(), "B".into(), "C".into()], quorum).unwrap();

        ApiState {
            vault: Arc::new(RwLock::new(vault)),
            storage: Arc::new(storage),
            ws_broadcaster: Arc::new(WsBroadcaster::new()),
        }
    }

    fn caller(name: &str) -> Json<CallerRequest> {
        Json(CallerRequest {
            caller: name.to_string(),
        })
    }

    async fn propose(state: &ApiState, who: &str, amount: i64) -> ApiResult<ProposeResponse> {
        propose_transaction(
            State(state.clone()),
            Json(ProposeRequest {
                caller: who.to_string(),
                to: "D".to_string(),
                amount,
                data: None,
            }),
        )
        .await
    }

    #[tokio::test]
    async fn test_full_flow() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, 2);

        let Json(created) = propose(&state, "A", 500).await.unwrap();
        assert_eq!(created.index, 1);
        assert_eq!(created.transaction.confirmation_count, 0);

        let _ = confirm_transaction(State(state.clone()), Path(1), caller("A"))
            .await
            .unwrap();
        let Json(tx) = confirm_transaction(State(state.clone()), Path(1), caller("B"))
            .await
            .unwrap();
        assert_eq!(tx.confirmation_count, 2);

        let err = execute_transaction(State(state.clone()), Path(1), caller("A"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);

        let Json(funded) = deposit(
            State(state.clone()),
            Json(DepositRequest {
                from: "anyone".to_string(),
                amount: 500,
            }),
        )
        .await
        .unwrap();
        assert_eq!(funded.balance, 500);

        let Json(tx) = execute_transaction(State(state.clone()), Path(1), caller("C"))
            .await
            .unwrap();
        assert!(tx.executed);

        let Json(balance) = get_balance(State(state.clone())).await;
        assert_eq!(balance.balance, 0);

        // State was persisted along the way
        let saved = state.storage.load().unwrap();
        assert!(saved.get(1).unwrap().executed);
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, 1);

        let err = propose(&state, "mallory", 1).await.unwrap_err();
        assert_eq!(err.0, StatusCode::FORBIDDEN);

        let err = propose(&state, "A", -1).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err = get_transaction(State(state.clone()), Path(7)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&VaultError::CorruptState("bad payouts".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let _ = propose(&state, "A", 0).await.unwrap();
        let _ = confirm_transaction(State(state.clone()), Path(1), caller("A"))
            .await
            .unwrap();
        let err = confirm_transaction(State(state.clone()), Path(1), caller("A"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let err = revoke_confirmation(State(state.clone()), Path(1), caller("B"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_invalid_payload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, 1);

        let err = propose_transaction(
            State(state.clone()),
            Json(ProposeRequest {
                caller: "A".to_string(),
                to: "D".to_string(),
                amount: 1,
                data: Some("0xnothex".to_string()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(state.vault.read().await.transaction_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_execute_pays_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, 1);
        {
            let mut vault = state.vault.write().await;
            vault.deposit("funder", 1000).unwrap();
            vault.propose("A", "D", 600, vec![]).unwrap();
            vault.confirm("A", 1).unwrap();
        }

        let mut handles = Vec::new();
        for i in 0..16 {
            let state = state.clone();
            let who = ["A", "B", "C"][i % 3];
            handles.push(tokio::spawn(async move {
                execute_transaction(State(state), Path(1), caller(who)).await
            }));
        }

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err((status, _)) => {
                    assert_eq!(status, StatusCode::CONFLICT);
                    conflicts += 1;
                }
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 15);

        let vault = state.vault.read().await;
        assert_eq!(vault.balance(), 400);
        assert_eq!(vault.custody().paid_out_to("D"), 600);
    }

    #[tokio::test]
    async fn test_events_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, 1);
        let mut rx = state.ws_broadcaster.subscribe();

        let _ = propose(&state, "A", 0).await.unwrap();
        let _ = propose(&state, "B", 0).await.unwrap();
        let _ = confirm_transaction(State(state.clone()), Path(1), caller("A"))
            .await
            .unwrap();
        let _ = execute_transaction(State(state.clone()), Path(1), caller("A"))
            .await
            .unwrap();

        let Json(pending) = list_transactions(
            State(state.clone()),
            Query(ListQuery {
                pending: Some(true),
            }),
        )
        .await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].index, 2);

        let Json(events) =
            get_events(State(state.clone()), Query(EventsQuery { count: Some(2) })).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event.name(), "Execute");

        // First broadcast is the first proposal
        match rx.recv().await.unwrap() {
            WsEvent::VaultEvent { record } => assert_eq!(record.event.name(), "Submit"),
            other => panic!("unexpected event: {:?}", other),
        }

        let Json(info) = get_vault_info(State(state.clone())).await;
        assert_eq!(info.description, "1-of-3");
        assert_eq!(info.transaction_count, 2);
        assert_eq!(info.pending_count, 1);
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, 1);
        {
            let mut vault = state.vault.write().await;
            vault.deposit("funder", 100).unwrap();
            vault.propose("A", "D", 100, vec![]).unwrap();
            vault.confirm("A", 1).unwrap();
            state.storage.save(&vault).unwrap();
        }

        // A directory where the temp file goes makes every save fail
        let blocker = dir.path().join("vault.json.tmp");
        std::fs::create_dir(&blocker).unwrap();

        let err = execute_transaction(State(state.clone()), Path(1), caller("A"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
        {
            let vault = state.vault.read().await;
            assert!(!vault.get(1).unwrap().executed);
            assert_eq!(vault.balance(), 100);
            assert_eq!(vault.events().len(), 3);
        }
        let saved = state.storage.load().unwrap();
        assert!(!saved.get(1).unwrap().executed);

        std::fs::remove_dir(&blocker).unwrap();
        let Json(tx) = execute_transaction(State(state.clone()), Path(1), caller("B"))
            .await
            .unwrap();
        assert!(tx.executed);
        assert!(state.storage.load().unwrap().get(1).unwrap().executed);
    }
}
