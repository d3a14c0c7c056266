//! Swimlane: a kanban task board synchronised with a remote document store.
//!
//! The store holds one collection per lane (`todo`, `inProgress`, `done`)
//! and pushes a full snapshot of a lane whenever it changes. This crate keeps
//! local, observable lane state consistent with those snapshots while tasks
//! are dragged between lanes, without the moved task flickering back to its
//! old lane before the store confirms the move.
//!
//! # Architecture
//!
//! Swimlane follows hexagonal architecture principles:
//!
//! - **Domain**: Lanes, tasks, lane state and the pending move ledger
//! - **Ports**: The remote store contract
//! - **Adapters**: An in-memory store
//! - **Services**: Reconciler, move and edit coordinators, board facade
//!
//! # Modules
//!
//! - [`board`]: Board state, store port and synchronisation services
//! - [`config`]: Board tunables

pub mod board;
pub mod config;
