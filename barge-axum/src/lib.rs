//! # barge-axum: HTTP surface for Barge transfers
//!
//! Exposes the upload session lifecycle and range reads over axum:
//!
//! - `POST /uploads?file_name=&total_size=` — start a session
//! - `PUT /uploads/{session_id}/parts/{part_number}` — upload one part body
//! - `POST /uploads/{session_id}/finish` — assemble the object
//! - `DELETE /uploads/{session_id}` — abort the session
//! - `GET /uploads/{session_id}` — bookkeeping snapshot
//! - `GET /objects/{object_name}` — partial-content read, `Range` required
//!
//! Errors carry a stable machine-readable kind in the JSON body; part bodies
//! and range responses are streamed, not buffered.

mod error;
mod rest;

pub use error::ApiError;
pub use rest::{router, TransferState};

// Re-export so downstream services depend on one crate for the HTTP surface
pub use axum;
