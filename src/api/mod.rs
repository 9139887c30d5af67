//! HTTP API module for the mortgage calculation engine.
//!
//! This module provides a single REST endpoint, `POST /calculate`, which
//! validates a raw loan request and returns the calculated breakdown.

mod handlers;
mod response;
mod state;

pub use handlers::create_router;
pub use response::{ApiError, CalculationResponse};
pub use state::AppState;
