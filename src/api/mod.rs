//! API Module
//!
//! HTTP handlers and routing for the reminder REST API.
//!
//! # Endpoints
//! - `POST /reminders` - Create a reminder
//! - `GET /reminders` - List the in-memory working set
//! - `DELETE /reminders/:id` - Cancel a reminder
//! - `GET /stats` - Scheduler statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
