//! REST API module
//!
//! Provides HTTP access to the vault. Caller identity is passed explicitly
//! in request bodies and checked against the owner registry.
//!
//! # Endpoints
//!
//! ## Vault
//! - `GET /api/vault` - Owners, quorum, address and balance
//! - `GET /api/balance` - Current balance
//! - `POST /api/deposit` - Deposit funds (any caller)
//! - `GET /api/events` - Audit log
//!
//! ## Transactions
//! - `GET /api/transactions` - List transactions (`?pending=true` for pending only)
//! - `POST /api/transactions` - Propose a transfer
//! - `GET /api/transactions/:index` - Get a transaction
//! - `POST /api/transactions/:index/confirm` - Confirm
//! - `POST /api/transactions/:index/revoke` - Revoke a confirmation
//! - `POST /api/transactions/:index/execute` - Execute
//!
//! ## WebSocket
//! - `GET /ws` - Real-time vault events

pub mod handlers;
pub mod routes;
pub mod websocket;

pub use handlers::ApiState;
pub use routes::create_router;
pub use websocket::WsBroadcaster;
