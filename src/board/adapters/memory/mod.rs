//! In-memory adapters for board ports.

mod store;

pub use store::InMemoryRemoteStore;
