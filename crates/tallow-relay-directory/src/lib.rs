//! The relay directory: data model, registry, REST server, REST client,
//! and circuit-path selection.

mod client;
mod err;
mod model;
mod path;
mod registry;
mod server;

pub use client::{DirectoryClient, HeartbeatConfig};
pub use err::{DirectoryClientError, DirectoryError};
pub use model::{
    initial_trust_score, DirectoryStats, HeartbeatRequest, ListFilter, RegisterRequest, RelayEntry,
    RelayHealth, RelayMode, RelaySummary,
};
pub use path::{select_relays_for_circuit, PathError};
pub use registry::{DirectoryConfig, DirectoryRegistry, GcOutcome};
pub use server::build_router;
