//! API Module
//!
//! HTTP handlers and routing for the cache REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `GET /exists/:key` - Check whether a key is present
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint
//! - `/users/:id` - Cache, fetch and invalidate users

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
