//! Port contracts for the task board.
//!
//! Ports define infrastructure-agnostic interfaces used by board services.

pub mod remote;

pub use remote::{
    LaneSubscription, RemoteStore, RemoteStoreError, RemoteStoreResult, WriteOp, WriteOutcome,
};
