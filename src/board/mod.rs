//! Kanban board state reconciliation.
//!
//! The board keeps three swim-lanes (`todo`, `inProgress`, `done`) in sync
//! with a remote document store that is the source of truth. Local lane
//! state is updated optimistically when a task is dragged between lanes and
//! then reconciled against the full snapshots the store pushes back. The
//! module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
