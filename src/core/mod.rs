//! Core business logic module
//!
//! This module contains the ledger components:
//! - `traits` - Storage backend abstraction and the RAII atomic scope
//! - `memory_backend` - In-memory storage backend
//! - `account_store` - Account creation and versioned balance mutation
//! - `transfer_engine` - Atomic transfers, batches and conflict retries
//! - `query_layer` - Read-only views over committed state
//! - `ledger` - Facade wiring the components to one backend
//! - `replay` - Label-based command replay
//! - `batch_processor` - Concurrent replay partitioned by account

pub mod account_store;
pub mod batch_processor;
pub mod config;
pub mod ledger;
pub mod memory_backend;
pub mod query_layer;
pub mod replay;
pub mod traits;
pub mod transfer_engine;

pub use account_store::AccountStore;
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use config::LedgerConfig;
pub use ledger::Ledger;
pub use memory_backend::InMemoryBackend;
pub use query_layer::QueryLayer;
pub use replay::ReplayEngine;
pub use traits::{AtomicScope, ScopeHandle, StorageBackend, StorageError};
pub use transfer_engine::TransferEngine;
