//! # gateway-api
//!
//! HTTP API layer for payment-gateways-rs.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/providers` | Registered providers |
//! | POST | `/api/v1/{provider}/sessions` | Initialize checkout session |
//! | GET | `/checkout/{provider}/{reference}` | Signed checkout link |
//! | GET | `/callback/{provider}/{reference}` | Verify payment, run notification |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
