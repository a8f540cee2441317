/// Wallet Metadata Mock Server Library
///
/// In-memory stand-in for the wallet metadata API the readiness oracle
/// queries. Usable as a standalone binary or spawned in-process by tests.

pub mod handlers;
pub mod server;
pub mod store;
pub mod types;

pub use server::{create_router, run_server, spawn_local};
pub use store::MemoryStore;
pub use types::*;
