//! Shared types for resumable chunked uploads.
//!
//! This crate holds the serde-facing surface of the session core: the
//! request payloads a caller submits, the snapshot returned after every
//! operation, and the closed enums for hash function and session status.
//! No logic lives here beyond field-level helpers.

mod messages;
mod types;

pub use messages::{AppendChunkRequest, StartUploadRequest};
pub use types::{HashFunction, SessionSnapshot, SessionStatus, human_size};
