//! REST API for the clinic desk.
//!
//! Routes are nested under `/api/` behind CORS and an access log. The
//! router is composable: `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer, ServerSession};
pub use types::ApiContext;
