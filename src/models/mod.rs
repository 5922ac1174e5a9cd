//! Data Transfer Objects for the cache API
//!
//! Request and response types serialized with serde.

pub mod requests;
pub mod responses;

pub use requests::SetRequest;
pub use responses::{
    DeleteResponse, ErrorResponse, ExistsResponse, GetResponse, HealthResponse, SetResponse,
    StatsResponse,
};
